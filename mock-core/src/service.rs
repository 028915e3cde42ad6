//! Mock service state
//!
//! Owns the route registry, the rule corpus the attack generator reads and
//! the outbound scheduler. Control handlers and startup preload both go
//! through [`MockService`].

use crate::admin::{AdminState, Metrics};
use crate::error::MockError;
use crate::registry::RouteRegistry;
use crate::routes::RouteBinder;
use attack_engine::{AttackConfig, AttackGenerator, AttackKind, OutboundScheduler, OutboundTransport};
use mock_common::Rule;
use parking_lot::RwLock;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub struct MockService {
    registry: Arc<RouteRegistry>,
    corpus: RwLock<Vec<Rule>>,
    scheduler: OutboundScheduler,
    attack_config: AttackConfig,
    metrics: Arc<Metrics>,
}

impl MockService {
    pub fn new(
        binder: Arc<dyn RouteBinder>,
        transport: Arc<dyn OutboundTransport>,
        attack_config: AttackConfig,
    ) -> Self {
        Self {
            registry: Arc::new(RouteRegistry::new(binder)),
            corpus: RwLock::new(Vec::new()),
            scheduler: OutboundScheduler::new(transport),
            attack_config,
            metrics: Arc::new(Metrics::default()),
        }
    }

    pub fn registry(&self) -> &Arc<RouteRegistry> {
        &self.registry
    }

    pub fn scheduler(&self) -> &OutboundScheduler {
        &self.scheduler
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn admin_state(&self) -> AdminState {
        AdminState {
            metrics: Arc::clone(&self.metrics),
            registry: Arc::clone(&self.registry),
            scheduler: self.scheduler.stats(),
        }
    }

    /// Copy of every rule ingested so far, in ingestion order
    pub fn corpus(&self) -> Vec<Rule> {
        self.corpus.read().clone()
    }

    pub fn has_rules(&self) -> bool {
        !self.corpus.read().is_empty()
    }

    /// Apply loaded rules in order
    ///
    /// Inbound rules are registered; outbound rules start firing immediately.
    /// Both kinds join the corpus. The first conflict stops the batch and
    /// everything applied before it stays.
    pub fn ingest(&self, rules: Vec<Rule>) -> Result<usize, MockError> {
        let mut applied = 0;
        for rule in rules {
            match rule {
                Rule::Inbound(inbound) => {
                    self.registry.register_inbound(inbound.clone())?;
                    self.corpus.write().push(Rule::Inbound(inbound));
                }
                Rule::Outbound(outbound) => {
                    self.corpus.write().push(Rule::Outbound(outbound.clone()));
                    self.scheduler.schedule(outbound);
                }
            }
            applied += 1;
            self.metrics.rules_loaded.fetch_add(1, Ordering::Relaxed);
        }

        info!(applied, "Rules ingested");
        Ok(applied)
    }

    /// Run one attack campaign over the current corpus and fire its output
    pub async fn attack(&self, kind: AttackKind) -> Result<usize, MockError> {
        let rules = self.corpus();
        if rules.is_empty() {
            warn!(%kind, "Attack requested with no rules loaded");
            return Err(MockError::NoRules);
        }

        let config = self.attack_config.clone();
        let attack_rules = tokio::task::spawn_blocking(move || {
            let mut generator = AttackGenerator::new(rules).with_config(config);
            generator.run(kind)?;
            Ok::<_, MockError>(generator.into_attack_rules())
        })
        .await
        .map_err(|e| MockError::Internal(format!("Attack generation panicked: {}", e)))??;

        let produced = attack_rules.len();
        self.scheduler.schedule_all(attack_rules);
        self.metrics.attacks_run.fetch_add(1, Ordering::Relaxed);

        info!(%kind, produced, "Attack campaign scheduled");
        Ok(produced)
    }

    /// Stop every firing sequence still running
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }
}
