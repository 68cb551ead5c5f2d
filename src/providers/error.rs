//! Error types for model invocation
//!
//! Errors are classified once, where they enter the crate, so callers can
//! branch on variants instead of re-reading message text. The two text
//! patterns that drive classification are kept here.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static REMOTE_BINDING_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Binding AI needs to be run remotely").expect("static regex")
});

static TLS_HANDSHAKE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)sslv3 alert handshake failure").expect("static regex"));

/// Maximum number of characters of an error body kept in [`ProviderError::Http`].
pub const HTTP_BODY_EXCERPT_CHARS: usize = 200;

/// True when `message` is the local binding's "run me remotely" signal.
pub fn is_remote_binding_message(message: &str) -> bool {
    REMOTE_BINDING_PATTERN.is_match(message)
}

/// True when `message` looks like a TLS handshake broken by an intercepting proxy.
pub fn is_tls_interception_message(message: &str) -> bool {
    TLS_HANDSHAKE_PATTERN.is_match(message)
}

/// Errors that can occur when invoking the model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The local binding cannot serve requests and asks to be run remotely
    #[error("{message}")]
    RemoteBindingRequired { message: String },

    /// TLS handshake failed, typically because the network intercepts HTTPS
    #[error("TLS handshake failed: {message}")]
    TlsInterception { message: String },

    /// Non-2xx response from the inference endpoint
    #[error("Cloudflare AI HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    /// 2xx response reporting failure, or an unusable payload
    #[error("{message}")]
    Provider { message: String },

    /// Connection-level failures
    #[error("Network error: {message}")]
    Network { message: String },

    /// Request took too long
    #[error("Request timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Configuration errors (bad URL, client build failure)
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Neither the binding nor the REST fallback can be used
    #[error("{message}")]
    Unavailable { message: String },
}

impl ProviderError {
    /// Only the remote-binding signal makes the REST fallback worth trying.
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(self, ProviderError::RemoteBindingRequired { .. })
    }

    pub fn is_tls_interception(&self) -> bool {
        matches!(self, ProviderError::TlsInterception { .. })
    }

    /// Classifies a failure message reported by the local binding.
    pub fn from_binding_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_remote_binding_message(&message) {
            Self::RemoteBindingRequired { message }
        } else if is_tls_interception_message(&message) {
            Self::TlsInterception { message }
        } else {
            Self::Provider { message }
        }
    }

    /// Builds an HTTP error, keeping at most [`HTTP_BODY_EXCERPT_CHARS`] of the body.
    pub fn http(status: u16, body: &str) -> Self {
        Self::Http {
            status,
            body: body.chars().take(HTTP_BODY_EXCERPT_CHARS).collect(),
        }
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn timeout(seconds: u64) -> Self {
        Self::Timeout { seconds }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Converts a transport error, inspecting the whole source chain for the
    /// TLS handshake signature.
    pub fn from_transport(err: &reqwest::Error, timeout_seconds: u64) -> Self {
        let chain = error_chain_text(err);
        if is_tls_interception_message(&chain) {
            Self::TlsInterception { message: chain }
        } else if err.is_timeout() {
            Self::timeout(timeout_seconds)
        } else if err.is_connect() {
            Self::network(format!("Connection failed: {}", chain))
        } else {
            Self::network(format!("Request failed: {}", chain))
        }
    }
}

fn error_chain_text(err: &(dyn std::error::Error + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;
