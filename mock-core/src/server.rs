use crate::{
    admin::start_admin_server,
    config::MockConfig,
    error::MockError,
    handlers::{no_match_response, ObservedRequest},
    loader::{load_rules, load_rules_file, RuleFormat},
    routes::RouteTable,
    service::MockService,
    Result,
};
use attack_engine::{AttackKind, HttpTransport};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use mock_common::ResponseSpec;
use serde::Deserialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

const ROOT_BODY: &str = "It works !";

pub struct MockServer {
    config: MockConfig,
    service: Arc<MockService>,
}

impl MockServer {
    /// Server with the default route table and HTTP transport
    pub fn new(config: MockConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.outbound_timeout())?;
        let service = MockService::new(
            Arc::new(RouteTable::with_reserved_routes()),
            Arc::new(transport),
            config.attack.clone(),
        );
        Ok(Self::with_service(config, Arc::new(service)))
    }

    pub fn with_service(config: MockConfig, service: Arc<MockService>) -> Self {
        Self { config, service }
    }

    pub fn service(&self) -> &Arc<MockService> {
        &self.service
    }

    pub fn router(&self) -> Router {
        router(Arc::clone(&self.service), self.config.max_body_bytes)
    }

    /// Ingest the configured rules file, if any
    pub async fn preload(&self) -> Result<usize> {
        let Some(path) = &self.config.rules_file else {
            return Ok(0);
        };
        info!("Preloading rules from {}", path);
        let rules = load_rules_file(path).await?;
        self.service.ingest(rules)
    }

    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Bind the configured ports and serve until `shutdown` resolves
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self
            .config
            .listen_addr()
            .map_err(|e| MockError::Network(format!("Invalid listen address: {}", e)))?;
        let admin_addr = SocketAddr::new(addr.ip(), self.config.admin_port);

        let admin_state = self.service.admin_state();
        tokio::spawn(async move {
            if let Err(e) = start_admin_server(admin_addr, admin_state).await {
                error!("Admin server failed: {}", e);
            }
        });

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| MockError::Network(format!("Failed to bind {}: {}", addr, e)))?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Starting mock server on {}", listener.local_addr()?);

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| MockError::Network(format!("Mock server failed: {}", e)));

        self.service.shutdown();
        info!("Mock server stopped");
        result
    }
}

/// Control routes plus dispatch of everything else to the inbound handlers
///
/// Control routes only own their exact method; any other method on the same
/// path still reaches the registry.
pub fn router(service: Arc<MockService>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root_handler).fallback(dispatch))
        .route("/rules", post(rules_handler).fallback(dispatch))
        .route("/attack", post(attack_handler).fallback(dispatch))
        .fallback(dispatch)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn root_handler() -> &'static str {
    ROOT_BODY
}

async fn rules_handler(
    State(service): State<Arc<MockService>>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let format = RuleFormat::from_content_type(content_type)?;
    let rules = load_rules(&body, format)?;
    service.ingest(rules)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct AttackQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
}

async fn attack_handler(
    State(service): State<Arc<MockService>>,
    Query(query): Query<AttackQuery>,
) -> Result<StatusCode> {
    if !service.has_rules() {
        return Err(MockError::NoRules);
    }
    let kind: AttackKind = query.kind.unwrap_or_default().parse()?;
    service.attack(kind).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn dispatch(
    State(service): State<Arc<MockService>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let metrics = service.metrics();
    metrics.inbound_requests.fetch_add(1, Ordering::Relaxed);

    let Some(handler) = service.registry().lookup(method.as_str(), uri.path()) else {
        metrics.inbound_unrouted.fetch_add(1, Ordering::Relaxed);
        debug!(%method, path = uri.path(), "No route bound");
        return StatusCode::NOT_FOUND.into_response();
    };

    let mut observed = ObservedRequest::new(uri.path())
        .with_body(String::from_utf8_lossy(&body).into_owned());
    if let Some(query) = uri.query() {
        observed = observed.with_query(query);
    }
    for (name, value) in &headers {
        observed = observed.with_header(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
    }

    let spec = match handler.find_match(&observed) {
        Some(spec) => {
            metrics.inbound_matched.fetch_add(1, Ordering::Relaxed);
            spec
        }
        None => {
            metrics.inbound_unmatched.fetch_add(1, Ordering::Relaxed);
            debug!(route = handler.route_key(), "Request not matching any rule");
            no_match_response()
        }
    };

    match render(&spec) {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

fn render(spec: &ResponseSpec) -> Result<Response> {
    let status = StatusCode::from_u16(spec.status)
        .map_err(|_| MockError::Internal(format!("Invalid response status {}", spec.status)))?;

    let mut response = (status, spec.body.clone()).into_response();
    for (name, value) in &spec.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| MockError::Internal(format!("Invalid response header {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| MockError::Internal(format!("Invalid value for header {}: {}", name, e)))?;
        response.headers_mut().insert(name, value);
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_applies_status_and_headers() {
        let spec = ResponseSpec::new(201, "made").with_header("X-Mock", "1");
        let response = render(&spec).unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get("x-mock").unwrap(), "1");
    }

    #[test]
    fn test_render_rejects_bad_status() {
        assert!(matches!(render(&ResponseSpec::new(42, "")), Err(MockError::Internal(_))));
    }
}
