//! Mock Core Library
//!
//! Programmable HTTP mock endpoint: inbound rules answer matching requests,
//! outbound rules fire requests at other hosts, and the attack generator
//! turns the loaded rules into hostile traffic.

pub mod admin;
pub mod handlers;
pub mod loader;
pub mod registry;
/// Route binding on the listener
pub mod routes;
pub mod server;
pub mod service;

/// Configuration types
pub mod config;

/// Error types for mock operations
pub mod error;

pub use admin::{AdminState, Metrics};
pub use config::MockConfig;
pub use error::MockError;
pub use handlers::{no_match_response, rule_matches, InboundHandler, ObservedRequest};
pub use loader::{load_rules, load_rules_file, RuleFormat};
pub use registry::RouteRegistry;
pub use routes::{RouteBinder, RouteTable};
pub use server::{router, MockServer};
pub use service::MockService;

/// Result type alias for mock operations
pub type Result<T> = std::result::Result<T, MockError>;
