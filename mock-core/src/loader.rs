//! Rule loader
//!
//! Decodes a rule sequence from JSON or YAML. The whole document is decoded
//! and validated before anything is handed back, so a bad rule never leaves
//! earlier rules half-applied.

use crate::error::MockError;
use mock_common::Rule;
use std::path::Path;
use tracing::debug;

/// Encodings accepted for rule documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFormat {
    Json,
    Yaml,
}

impl RuleFormat {
    /// Format from a `Content-Type` value; parameters such as `charset` are ignored
    pub fn from_content_type(content_type: &str) -> Result<Self, MockError> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match mime.as_str() {
            "application/json" => Ok(RuleFormat::Json),
            "text/yaml" | "application/yaml" | "application/x-yaml" | "text/x-yaml" => {
                Ok(RuleFormat::Yaml)
            }
            _ => Err(MockError::loader("Wrong content type")),
        }
    }

    /// Format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, MockError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("json") => Ok(RuleFormat::Json),
            Some("yaml") | Some("yml") => Ok(RuleFormat::Yaml),
            _ => Err(MockError::loader(format!(
                "Unsupported rules file extension: {}",
                path.display()
            ))),
        }
    }
}

/// Decode and validate a rule document, keeping document order
pub fn load_rules(input: &str, format: RuleFormat) -> Result<Vec<Rule>, MockError> {
    let rules: Vec<Rule> = match format {
        RuleFormat::Json => serde_json::from_str(input)
            .map_err(|e| MockError::loader(format!("Invalid JSON rules: {}", e)))?,
        RuleFormat::Yaml => serde_yaml::from_str(input)
            .map_err(|e| MockError::loader(format!("Invalid YAML rules: {}", e)))?,
    };

    for (index, rule) in rules.iter().enumerate() {
        validate(index, rule)?;
    }

    debug!(count = rules.len(), ?format, "Rules decoded");
    Ok(rules)
}

/// Read a rules file, picking the format from its extension
pub async fn load_rules_file(path: impl AsRef<Path>) -> Result<Vec<Rule>, MockError> {
    let path = path.as_ref();
    let format = RuleFormat::from_path(path)?;
    let input = tokio::fs::read_to_string(path).await?;
    load_rules(&input, format)
}

fn validate(index: usize, rule: &Rule) -> Result<(), MockError> {
    match rule {
        Rule::Inbound(inbound) if inbound.request.method.is_empty() => Err(MockError::loader(
            format!("Rule {}: an inout rule needs a method", index),
        )),
        Rule::Outbound(outbound) if outbound.repeat_count == 0 => Err(MockError::loader(
            format!("Rule {}: repeat must be at least 1", index),
        )),
        _ => Ok(()),
    }
}
