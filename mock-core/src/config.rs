//! Configuration types

use attack_engine::AttackConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Mock endpoint startup configuration
/// Set once at startup; nothing here changes while the server runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Address to listen on
    pub listen_address: String,
    /// Port of the mock listener (inbound rules and control API)
    pub listen_port: u16,
    /// Admin API port
    pub admin_port: u16,
    /// Per-request timeout for outbound sends, in seconds
    pub outbound_timeout_secs: u64,
    /// Largest inbound request body accepted
    pub max_body_bytes: usize,
    /// Attack generation settings
    pub attack: AttackConfig,
    /// Rules loaded before the listener opens
    pub rules_file: Option<String>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0".to_string(),
            listen_port: 8000,
            admin_port: 9091,
            outbound_timeout_secs: 30,
            max_body_bytes: 16 * 1024 * 1024,
            attack: AttackConfig::default(),
            rules_file: None,
        }
    }
}

impl MockConfig {
    pub fn listen_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.listen_address, self.listen_port).parse()
    }

    pub fn outbound_timeout(&self) -> Duration {
        Duration::from_secs(self.outbound_timeout_secs)
    }
}
