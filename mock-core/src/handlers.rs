//! Inbound matcher
//!
//! One [`InboundHandler`] serves one route key. Its rules are tried in
//! insertion order and the first structural match answers.

use mock_common::{Headers, InboundRule, ResponseSpec};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Status of the fixed no-match answer
pub const NO_MATCH_STATUS: u16 = 400;

/// Body of the fixed no-match answer
pub const NO_MATCH_BODY: &str = "Request not matching expectations.";

/// The answer given when no rule matches
pub fn no_match_response() -> ResponseSpec {
    ResponseSpec::new(NO_MATCH_STATUS, NO_MATCH_BODY)
}

/// A live request as handed over by the transport
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedRequest {
    pub path: String,
    pub query: Option<String>,
    /// Keyed by lowercase header name
    headers: BTreeMap<String, String>,
    pub body: String,
}

impl ObservedRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Add a header; repeated names are joined with `, `
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        self.headers
            .entry(name.to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Header names are compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// `path`, or `path?query` when the request carried a query string
    pub fn effective_path(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }
}

/// Every header the rule names must be present with an identical value.
/// Headers only present on the request are ignored.
fn headers_match(expected: &Headers, observed: &ObservedRequest) -> bool {
    expected
        .iter()
        .all(|(name, value)| observed.header(name) == Some(value.as_str()))
}

/// Structural match of one rule against one request
pub fn rule_matches(rule: &InboundRule, observed: &ObservedRequest) -> bool {
    headers_match(&rule.request.headers, observed)
        && observed.body == rule.request.body_str()
        && observed.effective_path() == rule.request.path
}

/// Rule set bound to one route key
///
/// Readers take a snapshot of the rule list and match without holding the
/// lock; writers replace the list (copy-on-write).
#[derive(Debug)]
pub struct InboundHandler {
    route_key: String,
    rules: RwLock<Arc<Vec<InboundRule>>>,
}

impl InboundHandler {
    pub fn new(route_key: impl Into<String>) -> Self {
        Self {
            route_key: route_key.into(),
            rules: RwLock::new(Arc::new(Vec::new())),
        }
    }

    pub fn route_key(&self) -> &str {
        &self.route_key
    }

    /// Append a rule; duplicates are kept and tried in order
    pub fn add_rule(&self, rule: InboundRule) {
        let mut rules = self.rules.write();
        Arc::make_mut(&mut rules).push(rule);
    }

    /// Remove every rule structurally equal to `rule`
    pub fn remove_rule(&self, rule: &InboundRule) -> bool {
        let mut rules = self.rules.write();
        let before = rules.len();
        Arc::make_mut(&mut rules).retain(|existing| existing != rule);
        rules.len() != before
    }

    pub fn rules(&self) -> Arc<Vec<InboundRule>> {
        Arc::clone(&self.rules.read())
    }

    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Response of the first matching rule, in insertion order
    pub fn find_match(&self, observed: &ObservedRequest) -> Option<ResponseSpec> {
        self.rules()
            .iter()
            .find(|rule| rule_matches(rule, observed))
            .map(|rule| rule.response.clone())
    }

    /// Like [`find_match`](Self::find_match), falling back to the no-match answer
    pub fn respond(&self, observed: &ObservedRequest) -> ResponseSpec {
        self.find_match(observed).unwrap_or_else(no_match_response)
    }
}
