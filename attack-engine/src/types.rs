//! Core data types for the attack engine

use crate::error::AttackError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Default size of the flood body (256 MiB)
pub const DEFAULT_FLOOD_PAYLOAD_SIZE: usize = 256 * 1024 * 1024;

/// Number of times each flood rule fires
pub const FLOOD_REPEAT_COUNT: u32 = 2000;

/// Attack campaign selector
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AttackKind {
    /// Every campaign, in the order xss, httpflood, robustness, reqsplitting
    All,
    Xss,
    HttpFlood,
    Robustness,
    ReqSplitting,
}

impl AttackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttackKind::All => "all",
            AttackKind::Xss => "xss",
            AttackKind::HttpFlood => "httpflood",
            AttackKind::Robustness => "robustness",
            AttackKind::ReqSplitting => "reqsplitting",
        }
    }
}

impl fmt::Display for AttackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttackKind {
    type Err = AttackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(AttackKind::All),
            "xss" => Ok(AttackKind::Xss),
            "httpflood" => Ok(AttackKind::HttpFlood),
            "robustness" => Ok(AttackKind::Robustness),
            "reqsplitting" => Ok(AttackKind::ReqSplitting),
            other => Err(AttackError::InvalidAttackType {
                given: other.to_string(),
            }),
        }
    }
}

/// Configuration for attack generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackConfig {
    /// Size in bytes of the pseudo-random flood body
    pub flood_payload_size: usize,
    /// Repeat count given to every flood rule
    pub flood_repeat_count: u32,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            flood_payload_size: DEFAULT_FLOOD_PAYLOAD_SIZE,
            flood_repeat_count: FLOOD_REPEAT_COUNT,
        }
    }
}

/// Outcome of one scheduled firing sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiringReport {
    pub id: Uuid,
    pub target: String,
    pub method: String,
    pub attempts: u32,
    pub successes: u32,
    pub failures: u32,
    /// True when shutdown interrupted the sequence before `repeat_count` sends
    pub cancelled: bool,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl FiringReport {
    pub fn new(target: String, method: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            method,
            attempts: 0,
            successes: 0,
            failures: 0,
            cancelled: false,
            started_at: chrono::Utc::now(),
            finished_at: None,
        }
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Some(chrono::Utc::now());
        self
    }
}
