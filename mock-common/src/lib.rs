//! Common rule model shared by the mock endpoint and the attack engine
//!
//! A rule either describes an inbound request the mock must answer
//! (`inout`) or an outbound request the service fires itself (`outin`).

pub mod rule;

pub use rule::{
    Headers, InboundRule, OutboundRule, RequestSignature, ResponseSpec, Rule, RuleKind,
};
