//! Route registry
//!
//! Maps a route key (method followed by the query-less path) to the handler
//! holding every inbound rule registered under it. The first rule for a key
//! binds the handler on the listener; later rules only append.

use crate::error::MockError;
use crate::handlers::InboundHandler;
use crate::routes::RouteBinder;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use mock_common::InboundRule;
use std::sync::Arc;
use tracing::{info, warn};

pub struct RouteRegistry {
    handlers: DashMap<String, Arc<InboundHandler>>,
    binder: Arc<dyn RouteBinder>,
}

impl RouteRegistry {
    pub fn new(binder: Arc<dyn RouteBinder>) -> Self {
        Self {
            handlers: DashMap::new(),
            binder,
        }
    }

    /// Register an inbound rule
    ///
    /// A conflict only fails this call; routes bound earlier stay as they are.
    pub fn register_inbound(&self, rule: InboundRule) -> Result<(), MockError> {
        let key = rule.route_key();
        match self.handlers.entry(key) {
            Entry::Occupied(existing) => {
                existing.get().add_rule(rule);
                Ok(())
            }
            Entry::Vacant(slot) => {
                let method = rule.request.method.clone();
                let path = rule.request.simple_path().to_string();

                let handler = Arc::new(InboundHandler::new(slot.key().clone()));
                handler.add_rule(rule);
                if let Err(e) = self.binder.bind(&method, &path, Arc::clone(&handler)) {
                    warn!(%method, %path, "Route binding refused");
                    return Err(e);
                }

                info!(%method, %path, "New inbound route");
                slot.insert(handler);
                Ok(())
            }
        }
    }

    /// Handler for a live request: exact route key first, then the listener's
    /// own routing
    pub fn lookup(&self, method: &str, path: &str) -> Option<Arc<InboundHandler>> {
        let simple_path = path.split_once('?').map_or(path, |(base, _)| base);
        let key = format!("{}{}", method, simple_path);
        if let Some(handler) = self.handlers.get(&key) {
            return Some(Arc::clone(handler.value()));
        }
        self.binder.resolve(method, simple_path)
    }

    /// Remove a rule by value from the handler it was registered under
    pub fn remove_inbound(&self, rule: &InboundRule) -> bool {
        self.handlers
            .get(&rule.route_key())
            .map_or(false, |handler| handler.remove_rule(rule))
    }

    /// Number of bound routes
    pub fn route_count(&self) -> usize {
        self.handlers.len()
    }

    /// Number of inbound rules across all routes
    pub fn rule_count(&self) -> usize {
        self.handlers.iter().map(|entry| entry.value().len()).sum()
    }
}
