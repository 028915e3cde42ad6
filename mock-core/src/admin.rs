use crate::registry::RouteRegistry;
use crate::Result;
use attack_engine::{SchedulerSnapshot, SchedulerStats};
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tracing::info;

/// Shared state for metrics
#[derive(Debug, Default)]
pub struct Metrics {
    pub inbound_requests: AtomicU64,
    pub inbound_matched: AtomicU64,
    /// Requests answered with the no-match fallback
    pub inbound_unmatched: AtomicU64,
    /// Requests on a path nothing is bound to
    pub inbound_unrouted: AtomicU64,
    pub rules_loaded: AtomicU64,
    pub attacks_run: AtomicU64,
}

#[derive(Clone)]
pub struct AdminState {
    pub metrics: Arc<Metrics>,
    pub registry: Arc<RouteRegistry>,
    pub scheduler: Arc<SchedulerStats>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
pub struct MetricsResponse {
    pub inbound: InboundMetrics,
    pub routes: usize,
    pub inbound_rules: usize,
    pub rules_loaded: u64,
    pub attacks_run: u64,
    pub outbound: SchedulerSnapshot,
}

#[derive(Serialize)]
pub struct InboundMetrics {
    pub requests: u64,
    pub matched: u64,
    pub unmatched: u64,
    pub unrouted: u64,
    pub match_rate: f64,
}

pub fn admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

pub async fn start_admin_server(addr: SocketAddr, state: AdminState) -> Result<()> {
    info!("Starting Admin API on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        crate::error::MockError::Network(format!("Failed to bind admin port {}: {}", addr.port(), e))
    })?;

    axum::serve(listener, admin_router(state))
        .await
        .map_err(|e| crate::error::MockError::Network(format!("Admin server failed: {}", e)))?;

    Ok(())
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub fn collect_metrics(state: &AdminState) -> MetricsResponse {
    let metrics = &state.metrics;
    let requests = metrics.inbound_requests.load(Ordering::Relaxed);
    let matched = metrics.inbound_matched.load(Ordering::Relaxed);

    let match_rate = if requests > 0 {
        (matched as f64 / requests as f64) * 100.0
    } else {
        0.0
    };

    MetricsResponse {
        inbound: InboundMetrics {
            requests,
            matched,
            unmatched: metrics.inbound_unmatched.load(Ordering::Relaxed),
            unrouted: metrics.inbound_unrouted.load(Ordering::Relaxed),
            match_rate,
        },
        routes: state.registry.route_count(),
        inbound_rules: state.registry.rule_count(),
        rules_loaded: metrics.rules_loaded.load(Ordering::Relaxed),
        attacks_run: metrics.attacks_run.load(Ordering::Relaxed),
        outbound: state.scheduler.snapshot(),
    }
}

async fn metrics_handler(State(state): State<AdminState>) -> Json<MetricsResponse> {
    Json(collect_metrics(&state))
}
