//! Attack Engine - attack generation and outbound firing
//!
//! This crate turns a recorded rule corpus into adversarial outbound rules
//! (XSS, HTTP flood, request splitting, robustness) and fires outbound rules
//! at their targets with the requested repeat count and delays.

pub mod error;
pub mod execution;
pub mod generator;
pub mod payload;
pub mod traits;
pub mod transport;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::{AttackError, AttackResult};

pub use execution::{OutboundScheduler, SchedulerSnapshot, SchedulerStats};

pub use generator::AttackGenerator;

pub use payload::{
    extract_ip_addresses, inject_body_xss, inject_header_xss, inject_query_xss, XSS_PAYLOAD,
};

pub use traits::OutboundTransport;

pub use transport::{target_url, HttpTransport};

pub use types::{AttackConfig, AttackKind, FiringReport, FLOOD_REPEAT_COUNT};
