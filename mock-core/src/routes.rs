//! Route binding on the listener
//!
//! The listener owns one binding per (verb, path). A binding either points at
//! an inbound handler or is reserved for the control API.

use crate::error::MockError;
use crate::handlers::InboundHandler;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Verbs a handler can be bound under
pub const BINDABLE_VERBS: [&str; 9] = [
    "GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS", "TRACE", "CONNECT",
];

/// Routes owned by the control API
///
/// `HEAD /` is answered by the `GET /` handler, so it is taken as well.
pub const RESERVED_ROUTES: [(&str, &str); 4] = [
    ("GET", "/"),
    ("HEAD", "/"),
    ("POST", "/rules"),
    ("POST", "/attack"),
];

/// "Bind a handler for (method, path), or fail if already bound"
pub trait RouteBinder: Send + Sync {
    fn bind(&self, method: &str, path: &str, handler: Arc<InboundHandler>) -> Result<(), MockError>;

    /// Handler serving a live request, if one is bound
    fn resolve(&self, method: &str, path: &str) -> Option<Arc<InboundHandler>>;
}

#[derive(Debug, Clone)]
enum Binding {
    Reserved,
    Handler(Arc<InboundHandler>),
}

/// Trailing slashes are not significant, except for the root itself
pub fn normalize_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

/// Default binder: exact verb, trailing-slash-insensitive path
#[derive(Debug, Default)]
pub struct RouteTable {
    bindings: DashMap<(String, String), Binding>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table with the control API routes already taken
    pub fn with_reserved_routes() -> Self {
        let table = Self::new();
        for (method, path) in RESERVED_ROUTES {
            table
                .bindings
                .insert((method.to_string(), normalize_path(path).to_string()), Binding::Reserved);
        }
        table
    }

    pub fn is_bound(&self, method: &str, path: &str) -> bool {
        self.bindings
            .contains_key(&(method.to_string(), normalize_path(path).to_string()))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl RouteBinder for RouteTable {
    fn bind(&self, method: &str, path: &str, handler: Arc<InboundHandler>) -> Result<(), MockError> {
        if !BINDABLE_VERBS.contains(&method) {
            return Err(MockError::route_conflict(method, path));
        }

        let id = (method.to_string(), normalize_path(path).to_string());
        match self.bindings.entry(id) {
            Entry::Occupied(_) => Err(MockError::route_conflict(method, path)),
            Entry::Vacant(slot) => {
                debug!(method, path, "Route bound");
                slot.insert(Binding::Handler(handler));
                Ok(())
            }
        }
    }

    fn resolve(&self, method: &str, path: &str) -> Option<Arc<InboundHandler>> {
        let id = (method.to_string(), normalize_path(path).to_string());
        match self.bindings.get(&id)?.value() {
            Binding::Handler(handler) => Some(Arc::clone(handler)),
            Binding::Reserved => None,
        }
    }
}
