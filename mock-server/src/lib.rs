//! Mock server process wiring: command line, logging and startup.

pub mod logging;

use attack_engine::AttackConfig;
use clap::Parser;
use mock_core::{MockConfig, MockServer};
use std::future::Future;
use tracing::info;

pub use logging::{init_logging, LoggingConfig};

/// Programmable HTTP mock endpoint with attack-traffic generation
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    pub listen_address: String,

    /// Port of the mock listener (rules, attacks and mocked routes)
    #[arg(long, short = 'p', default_value_t = 8000)]
    pub port: u16,

    /// Admin API port (health and metrics)
    #[arg(long, default_value_t = 9091)]
    pub admin_port: u16,

    /// Rules file loaded at startup (.json, .yaml or .yml)
    #[arg(long, short = 'r')]
    pub rules: Option<String>,

    /// Timeout for outbound requests in seconds
    #[arg(long, default_value_t = 30)]
    pub outbound_timeout: u64,

    /// Size in bytes of the HTTP flood body
    #[arg(long, default_value_t = attack_engine::types::DEFAULT_FLOOD_PAYLOAD_SIZE)]
    pub flood_payload_size: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", value_parser = parse_log_level)]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    /// Also write logs to this file, rotated daily
    #[arg(long)]
    pub log_file: Option<String>,
}

fn parse_log_level(level: &str) -> Result<String, String> {
    if logging::levels::is_valid_level(level) {
        Ok(level.to_lowercase())
    } else {
        Err(format!("unknown log level '{}'", level))
    }
}

impl Args {
    pub fn mock_config(&self) -> MockConfig {
        MockConfig {
            listen_address: self.listen_address.clone(),
            listen_port: self.port,
            admin_port: self.admin_port,
            outbound_timeout_secs: self.outbound_timeout,
            attack: AttackConfig {
                flood_payload_size: self.flood_payload_size,
                ..AttackConfig::default()
            },
            rules_file: self.rules.clone(),
            ..MockConfig::default()
        }
    }

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            json_format: self.log_json,
            log_file: self.log_file.clone(),
            ..LoggingConfig::default()
        }
    }
}

/// Build the server, preload rules and serve until `shutdown` resolves
pub async fn run_server<F>(config: MockConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let server = MockServer::new(config.clone())?;

    let preloaded = server.preload().await?;
    if preloaded > 0 {
        info!(preloaded, "Startup rules applied");
    }

    info!(
        "Mock endpoint on {}:{}, admin API on port {}",
        config.listen_address, config.listen_port, config.admin_port
    );
    server.run_until(shutdown).await?;
    Ok(())
}
