//! Error types for the mock endpoint

use attack_engine::AttackError;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Main error type for mock operations
#[derive(Debug, Error)]
pub enum MockError {
    /// The transport refused to bind a new (method, path) pair
    #[error("The route '{method} -> {path}' cannot be created.")]
    RouteConflict { method: String, path: String },

    /// Rule input could not be decoded or validated
    #[error("{0}")]
    Loader(String),

    /// An attack was requested with an empty corpus
    #[error("Error: no rules found.")]
    NoRules,

    #[error(transparent)]
    Attack(#[from] AttackError),

    /// Listener and socket errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unclassified failure while serving a request
    #[error("{0}")]
    Internal(String),
}

impl MockError {
    pub fn route_conflict(method: &str, path: &str) -> Self {
        Self::RouteConflict {
            method: method.to_string(),
            path: path.to_string(),
        }
    }

    pub fn loader(reason: impl Into<String>) -> Self {
        Self::Loader(reason.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            MockError::RouteConflict { .. } | MockError::Loader(_) | MockError::NoRules => {
                StatusCode::BAD_REQUEST
            }
            MockError::Attack(AttackError::InvalidAttackType { .. }) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            MockError::RouteConflict { .. } | MockError::Loader(_) => {
                let body = serde_json::json!({ "message": self.to_string() });
                (status, axum::Json(body)).into_response()
            }
            MockError::Attack(AttackError::InvalidAttackType { .. }) => (
                status,
                [(header::CONTENT_TYPE, "text/plain")],
                "Error: wrong/no attack type given.",
            )
                .into_response(),
            other => (status, [(header::CONTENT_TYPE, "text/plain")], other.to_string())
                .into_response(),
        }
    }
}
