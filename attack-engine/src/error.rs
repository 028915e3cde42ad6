//! Error types for the attack engine

use thiserror::Error;

/// Main error type for attack generation and outbound firing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttackError {
    #[error("Malformed attack input: {reason}")]
    MalformedAttackInput { reason: String },

    #[error("Send to {target} failed: {details}")]
    SendFailure { target: String, details: String },

    #[error("Payload generation failed: {reason}")]
    PayloadGenerationFailed { reason: String },

    #[error("Unknown attack type: {given:?}")]
    InvalidAttackType { given: String },

    #[error("Timeout occurred: {operation} after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },
}

impl AttackError {
    /// Create a malformed-input error
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedAttackInput {
            reason: reason.into(),
        }
    }

    /// Create a send failure for the given target
    pub fn send_failure(target: &str, details: impl ToString) -> Self {
        Self::SendFailure {
            target: target.to_string(),
            details: details.to_string(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: &str, duration_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.to_string(),
            duration_ms,
        }
    }

    /// Failures observed while firing, as opposed to generation problems
    pub fn is_send_failure(&self) -> bool {
        matches!(self, Self::SendFailure { .. } | Self::Timeout { .. })
    }
}

/// Result type alias for attack engine operations
pub type AttackResult<T> = Result<T, AttackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AttackError::send_failure("10.0.0.1", "connection refused");
        assert_eq!(err.to_string(), "Send to 10.0.0.1 failed: connection refused");

        let err = AttackError::malformed("no query component in /plain");
        assert!(err.to_string().contains("/plain"));
    }

    #[test]
    fn test_send_failure_classification() {
        assert!(AttackError::send_failure("t", "x").is_send_failure());
        assert!(AttackError::timeout("send", 10).is_send_failure());
        assert!(!AttackError::malformed("x").is_send_failure());
    }
}
