//! HTTP error responses

use crate::identity::{IdentityError, StoreError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error envelope returned by every endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    pub error: ApiErrorBody,
}

/// Error details.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiErrorBody {
    pub message: String,
    pub r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiError {
    fn new(message: impl Into<String>, r#type: &str, code: &str) -> Self {
        Self {
            error: ApiErrorBody {
                message: message.into(),
                r#type: r#type.to_string(),
                code: Some(code.to_string()),
            },
        }
    }

    /// No remote identity could be bound to the request (401).
    pub fn unauthenticated(message: &str) -> Self {
        Self::new(message, "authentication_error", "no_remote_identity")
    }

    /// The identity would have to be created but the store forbids it (403).
    pub fn creation_forbidden(message: &str) -> Self {
        Self::new(message, "permission_error", "creation_forbidden")
    }

    /// The identity store or session store failed (503).
    pub fn store_unavailable(message: &str) -> Self {
        Self::new(message, "server_error", "store_unavailable")
    }

    /// Create an internal server error (500).
    pub fn internal(message: &str) -> Self {
        Self::new(message, "server_error", "internal_error")
    }

    fn status_code(&self) -> StatusCode {
        match self.error.code.as_deref() {
            Some("no_remote_identity") => StatusCode::UNAUTHORIZED,
            Some("creation_forbidden") => StatusCode::FORBIDDEN,
            Some("store_unavailable") => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(error: IdentityError) -> Self {
        match error {
            IdentityError::StoreFailure(e) => e.into(),
            // Soft errors are consumed by the engine
            other => Self::internal(&other.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Unavailable(_) => Self::store_unavailable(&error.to_string()),
            other => Self::internal(&other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}
