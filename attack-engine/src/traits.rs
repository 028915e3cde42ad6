//! Core traits for the attack engine

use crate::error::AttackResult;
use async_trait::async_trait;
use mock_common::RequestSignature;

/// Sends one outbound request and reports what happened
///
/// `request.path` is the target. Implementations must not retry: the
/// scheduler counts every call as one attempt.
#[async_trait]
pub trait OutboundTransport: Send + Sync {
    /// Returns the status code of the reply, or a `SendFailure`
    async fn send(&self, request: &RequestSignature) -> AttackResult<u16>;
}
