//! Outbound firing scheduler
//!
//! Every scheduled rule runs as its own tokio task. Tasks share nothing but
//! the transport, the stats counters and the shutdown token.

use crate::traits::OutboundTransport;
use crate::types::FiringReport;
use mock_common::OutboundRule;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Counters shared by all firing sequences
#[derive(Debug, Default)]
pub struct SchedulerStats {
    pub scheduled: AtomicU64,
    pub active: AtomicU64,
    pub completed: AtomicU64,
    pub sent: AtomicU64,
    pub succeeded: AtomicU64,
    pub failed: AtomicU64,
}

/// Point-in-time copy of [`SchedulerStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchedulerSnapshot {
    pub scheduled: u64,
    pub active: u64,
    pub completed: u64,
    pub sent: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl SchedulerStats {
    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            scheduled: self.scheduled.load(Ordering::Relaxed),
            active: self.active.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Fires outbound rules, each independently of the others
#[derive(Clone)]
pub struct OutboundScheduler {
    transport: Arc<dyn OutboundTransport>,
    stats: Arc<SchedulerStats>,
    shutdown: CancellationToken,
}

impl OutboundScheduler {
    pub fn new(transport: Arc<dyn OutboundTransport>) -> Self {
        Self {
            transport,
            stats: Arc::new(SchedulerStats::default()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn stats(&self) -> Arc<SchedulerStats> {
        Arc::clone(&self.stats)
    }

    /// Start a firing sequence for `rule` and return at once
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, rule: OutboundRule) -> JoinHandle<FiringReport> {
        self.stats.scheduled.fetch_add(1, Ordering::Relaxed);
        self.stats.active.fetch_add(1, Ordering::Relaxed);

        let transport = Arc::clone(&self.transport);
        let stats = Arc::clone(&self.stats);
        let shutdown = self.shutdown.child_token();

        tokio::spawn(async move {
            let report = fire(rule, transport.as_ref(), &stats, &shutdown).await;
            stats.active.fetch_sub(1, Ordering::Relaxed);
            stats.completed.fetch_add(1, Ordering::Relaxed);
            report
        })
    }

    pub fn schedule_all<I>(&self, rules: I) -> Vec<JoinHandle<FiringReport>>
    where
        I: IntoIterator<Item = OutboundRule>,
    {
        rules.into_iter().map(|rule| self.schedule(rule)).collect()
    }

    /// Stop every running sequence between sends
    pub fn shutdown(&self) {
        info!(
            active = self.stats.active.load(Ordering::Relaxed),
            "Cancelling outbound firing sequences"
        );
        self.shutdown.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

/// Wait `ms`, returning false if shutdown came first
async fn pause(ms: u64, shutdown: &CancellationToken) -> bool {
    if ms == 0 {
        return !shutdown.is_cancelled();
    }
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(Duration::from_millis(ms)) => true,
    }
}

async fn fire(
    rule: OutboundRule,
    transport: &dyn OutboundTransport,
    stats: &SchedulerStats,
    shutdown: &CancellationToken,
) -> FiringReport {
    let mut report = FiringReport::new(rule.request.path.clone(), rule.request.method.clone());
    debug!(
        id = %report.id,
        destination = %rule.request.path,
        repeat = rule.repeat_count,
        "Firing sequence started"
    );

    if !pause(rule.delay_before_first_ms, shutdown).await {
        report.cancelled = true;
        return report.finish();
    }

    let interval = rule.interval_ms();
    for sent in 1..=rule.repeat_count {
        let outcome = tokio::select! {
            _ = shutdown.cancelled() => None,
            outcome = transport.send(&rule.request) => Some(outcome),
        };
        let Some(outcome) = outcome else {
            report.cancelled = true;
            break;
        };

        report.attempts += 1;
        stats.sent.fetch_add(1, Ordering::Relaxed);
        match outcome {
            Ok(status) => {
                report.successes += 1;
                stats.succeeded.fetch_add(1, Ordering::Relaxed);
                debug!(destination = %rule.request.path, status, attempt = sent, "Outbound request sent");
            }
            Err(e) => {
                report.failures += 1;
                stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!(destination = %rule.request.path, attempt = sent, "Outbound request failed: {}", e);
            }
        }

        if sent < rule.repeat_count && !pause(interval, shutdown).await {
            report.cancelled = true;
            break;
        }
    }

    debug!(
        id = %report.id,
        attempts = report.attempts,
        failures = report.failures,
        "Firing sequence finished"
    );
    report.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AttackError, AttackResult};
    use async_trait::async_trait;
    use mock_common::RequestSignature;
    use std::sync::atomic::AtomicU32;

    /// Fails every other call
    #[derive(Default)]
    struct FlakyTransport {
        calls: AtomicU32,
    }

    #[async_trait]
    impl OutboundTransport for FlakyTransport {
        async fn send(&self, request: &RequestSignature) -> AttackResult<u16> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call % 2 == 0 {
                Err(AttackError::send_failure(&request.path, "connection refused"))
            } else {
                Ok(200)
            }
        }
    }

    /// Never answers
    struct HangingTransport;

    #[async_trait]
    impl OutboundTransport for HangingTransport {
        async fn send(&self, _request: &RequestSignature) -> AttackResult<u16> {
            std::future::pending().await
        }
    }

    fn rule(repeat: u32) -> OutboundRule {
        OutboundRule::once(RequestSignature::new("GET", "http://1.2.3.4/")).with_repeat(repeat)
    }

    #[tokio::test]
    async fn test_repeat_count_is_exact_despite_failures() {
        let transport = Arc::new(FlakyTransport::default());
        let scheduler = OutboundScheduler::new(transport.clone());

        let report = scheduler
            .schedule(rule(3).with_delay_between(0))
            .await
            .unwrap();

        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.attempts, 3);
        assert_eq!(report.failures, 2);
        assert_eq!(report.successes, 1);
        assert!(!report.cancelled);
        assert!(report.finished_at.is_some());

        let stats = scheduler.stats().snapshot();
        assert_eq!(stats.scheduled, 1);
        assert_eq!(stats.sent, 3);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.active, 0);
    }

    #[tokio::test]
    async fn test_delays_are_honoured() {
        let transport = Arc::new(FlakyTransport::default());
        let scheduler = OutboundScheduler::new(transport.clone());

        let started = std::time::Instant::now();
        let report = scheduler
            .schedule(rule(3).with_delay_before_first(30).with_delay_between(20))
            .await
            .unwrap();

        // 30 before the first send, 20 between each of the three sends
        assert!(started.elapsed() >= Duration::from_millis(70));
        assert_eq!(report.attempts, 3);
    }

    #[tokio::test]
    async fn test_sequences_are_independent() {
        let scheduler = OutboundScheduler::new(Arc::new(FlakyTransport::default()));
        let hanging = OutboundScheduler::new(Arc::new(HangingTransport));

        let _stuck = hanging.schedule(rule(1));
        let handles = scheduler.schedule_all(vec![rule(2), rule(2), rule(2)]);
        let mut attempts = 0;
        for handle in handles {
            attempts += handle.await.unwrap().attempts;
        }
        assert_eq!(attempts, 6);
        hanging.shutdown();
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_sequence() {
        let transport = Arc::new(FlakyTransport::default());
        let scheduler = OutboundScheduler::new(transport.clone());

        let handle = scheduler.schedule(rule(1000).with_delay_between(50));
        tokio::time::sleep(Duration::from_millis(20)).await;
        scheduler.shutdown();

        let report = handle.await.unwrap();
        assert!(report.cancelled);
        assert!(report.attempts < 1000);
        assert!(scheduler.is_shutdown());
    }

    #[tokio::test]
    async fn test_shutdown_cancels_pending_send() {
        let scheduler = OutboundScheduler::new(Arc::new(HangingTransport));
        let handle = scheduler.schedule(rule(5));
        tokio::time::sleep(Duration::from_millis(10)).await;
        scheduler.shutdown();

        let report = handle.await.unwrap();
        assert!(report.cancelled);
        assert_eq!(report.attempts, 0);
    }
}
