//! Model invocation for relaychat
//!
//! # Architecture
//!
//! - `LlmProvider` is the interface every inference backend implements
//! - `LocalBinding` talks to an inference binding exposed by a local runtime
//! - `WorkersAiProvider` calls the hosted REST endpoint directly
//! - `ModelInvoker` tries the binding first and falls back to REST when the
//!   binding reports it must be run remotely
//!
//! # Example
//!
//! ```rust,no_run
//! use relaychat::providers::{LlmProvider, WorkersAiProvider, MODEL_ID};
//! use relaychat::session::Message;
//!
//! async fn example(provider: &dyn LlmProvider) {
//!     let messages = vec![
//!         Message::system("You are a friendly chatbot."),
//!         Message::user("Hello!"),
//!     ];
//!     let response = provider.chat(messages, MODEL_ID).await.unwrap();
//!     println!("Response: {}", response.content);
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::session::Message;

pub mod error;
pub mod invoker;
pub mod local;
#[cfg(test)]
pub mod mock;
pub mod workers_ai;

pub use error::ProviderError;
pub use invoker::ModelInvoker;
pub use local::LocalBinding;
pub use workers_ai::WorkersAiProvider;

/// The single model every request is sent to.
pub const MODEL_ID: &str = "@cf/meta/llama-3-8b-instruct";

/// Response from an inference backend
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LlmResponse {
    /// Assistant reply text; empty when the backend returned none
    pub content: String,
}

impl LlmResponse {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Trait for inference backends (local binding, hosted REST, test doubles)
///
/// All implementations must be Send + Sync so one instance can serve
/// concurrent requests.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Sends the full message list and returns the assistant reply.
    async fn chat(&self, messages: Vec<Message>, model: &str) -> Result<LlmResponse, ProviderError>;

    /// Returns the provider name, used for logging
    fn provider_name(&self) -> &'static str;
}

/// Pulls reply text out of an inference result object: `response` first,
/// then `output_text`, else empty.
pub(crate) fn reply_text(result: &serde_json::Value) -> String {
    result
        .get("response")
        .and_then(|v| v.as_str())
        .or_else(|| result.get("output_text").and_then(|v| v.as_str()))
        .unwrap_or_default()
        .to_string()
}
