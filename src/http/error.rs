//! Maps chat failures to HTTP status codes and `{ "error": ... }` bodies.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::chat::ChatError;
use crate::providers::ProviderError;
use crate::providers::error::{is_remote_binding_message, is_tls_interception_message};

pub const REMOTE_BINDING_GUIDANCE: &str = "Remote Workers AI required. Either switch networks and restart the local binding in remote mode, or configure `CF_AI_API_TOKEN` for direct API access.";

pub const TLS_GUIDANCE: &str = "TLS handshake failed. This usually means the network is intercepting HTTPS traffic. Try another network or a hotspot.";

pub const INTERNAL_ERROR: &str = "Internal Server Error";

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Empty or missing message (400).
    Validation(String),
    /// Local binding must run remotely and no fallback succeeded (503).
    RemoteBindingUnavailable(String),
    /// HTTPS interception detected on the way to the model (503).
    TlsInterception(String),
    /// Anything else (500). Carries the detail for logs only.
    Internal(String),
}

impl From<ProviderError> for AppError {
    fn from(e: ProviderError) -> Self {
        let detail = e.to_string();
        if e.is_fallback_eligible() || is_remote_binding_message(&detail) {
            AppError::RemoteBindingUnavailable(detail)
        } else if e.is_tls_interception() || is_tls_interception_message(&detail) {
            AppError::TlsInterception(detail)
        } else {
            AppError::Internal(detail)
        }
    }
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::Validation(msg) => AppError::Validation(msg),
            ChatError::Provider(e) => e.into(),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::RemoteBindingUnavailable(_) | AppError::TlsInterception(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text shown to the client.
    pub fn public_message(&self) -> &str {
        match self {
            AppError::Validation(msg) => msg,
            AppError::RemoteBindingUnavailable(_) => REMOTE_BINDING_GUIDANCE,
            AppError::TlsInterception(_) => TLS_GUIDANCE,
            AppError::Internal(_) => INTERNAL_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Validation(msg) => tracing::debug!(error = %msg, "Rejected chat request"),
            AppError::RemoteBindingUnavailable(detail)
            | AppError::TlsInterception(detail)
            | AppError::Internal(detail) => {
                tracing::error!(status = %self.status(), error = %detail, "Chat request failed")
            }
        }

        (self.status(), Json(json!({ "error": self.public_message() }))).into_response()
    }
}
