//! Rule model
//!
//! Rules are plain values. Equality is structural so a freshly built rule
//! can be used to remove its registered twin from a handler.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Header mapping. Ordered so that rules hash and compare deterministically.
pub type Headers = BTreeMap<String, String>;

/// Request signature: what is observed inbound or what is fired outbound
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestSignature {
    pub method: String,
    /// Path, optionally followed by `?query`. Outbound rules carry a full
    /// target here (`http://10.0.0.2/api`, or a bare address).
    pub path: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: Headers,
    /// Shared so that very large payloads are never copied per rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Arc<str>>,
}

impl RequestSignature {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: Headers::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Arc<str>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_shared_body(mut self, body: Option<Arc<str>>) -> Self {
        self.body = body;
        self
    }

    /// Path with any `?query` suffix stripped
    pub fn simple_path(&self) -> &str {
        self.path
            .split_once('?')
            .map_or(self.path.as_str(), |(base, _)| base)
    }

    /// Query component, if the path has one
    pub fn query(&self) -> Option<&str> {
        self.path.split_once('?').map(|(_, query)| query)
    }

    /// Body as text; an absent body reads as empty
    pub fn body_str(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }
}

impl fmt::Display for RequestSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Canned response
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResponseSpec {
    pub status: u16,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: Headers,
    #[serde(default)]
    pub body: String,
}

impl ResponseSpec {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// "When this signature is observed inbound, answer with this response."
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InboundRule {
    pub request: RequestSignature,
    pub response: ResponseSpec,
}

impl InboundRule {
    pub fn new(request: RequestSignature, response: ResponseSpec) -> Self {
        Self { request, response }
    }

    /// Registry key: method followed by the query-less path
    pub fn route_key(&self) -> String {
        format!("{}{}", self.request.method, self.request.simple_path())
    }
}

/// "Fire this request `repeat_count` times, `delay_between_ms` apart."
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutboundRule {
    pub request: RequestSignature,
    /// Kept for symmetry with inbound rules; the scheduler ignores it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseSpec>,
    #[serde(rename = "delay", default)]
    pub delay_before_first_ms: u64,
    #[serde(rename = "repeat", default = "default_repeat")]
    pub repeat_count: u32,
    #[serde(rename = "interval", default, skip_serializing_if = "Option::is_none")]
    pub delay_between_ms: Option<u64>,
}

fn default_repeat() -> u32 {
    1
}

impl OutboundRule {
    /// Single shot, no delay
    pub fn once(request: RequestSignature) -> Self {
        Self {
            request,
            response: None,
            delay_before_first_ms: 0,
            repeat_count: 1,
            delay_between_ms: None,
        }
    }

    pub fn with_repeat(mut self, repeat_count: u32) -> Self {
        self.repeat_count = repeat_count;
        self
    }

    pub fn with_delay_before_first(mut self, delay_ms: u64) -> Self {
        self.delay_before_first_ms = delay_ms;
        self
    }

    pub fn with_delay_between(mut self, delay_ms: u64) -> Self {
        self.delay_between_ms = Some(delay_ms);
        self
    }

    /// Effective inter-request delay; `None` means no wait
    pub fn interval_ms(&self) -> u64 {
        self.delay_between_ms.unwrap_or(0)
    }
}

/// Discriminant of a [`Rule`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Inbound,
    Outbound,
}

/// Tagged rule, as produced by the loader
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Rule {
    #[serde(rename = "inout")]
    Inbound(InboundRule),
    #[serde(rename = "outin")]
    Outbound(OutboundRule),
}

impl Rule {
    pub fn kind(&self) -> RuleKind {
        match self {
            Rule::Inbound(_) => RuleKind::Inbound,
            Rule::Outbound(_) => RuleKind::Outbound,
        }
    }

    pub fn request(&self) -> &RequestSignature {
        match self {
            Rule::Inbound(rule) => &rule.request,
            Rule::Outbound(rule) => &rule.request,
        }
    }
}

impl From<InboundRule> for Rule {
    fn from(rule: InboundRule) -> Self {
        Rule::Inbound(rule)
    }
}

impl From<OutboundRule> for Rule {
    fn from(rule: OutboundRule) -> Self {
        Rule::Outbound(rule)
    }
}
