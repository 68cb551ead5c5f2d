//! Local inference binding
//!
//! A development runtime running next to relaychat can expose the inference
//! binding over loopback HTTP. Requests go to `POST {binding_url}/run/{model}`
//! and the reply is either `{ "response": ... }` or the REST-style envelope
//! `{ "result": { "response": ... } }`.
//!
//! When the runtime is offline-only it answers with an error whose text is
//! "Binding AI needs to be run remotely"; that error is classified as
//! [`ProviderError::RemoteBindingRequired`] so the invoker can fall back.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::providers::workers_ai::RunRequest;
use crate::providers::{LlmProvider, LlmResponse, ProviderError, reply_text};
use crate::session::Message;

#[derive(Debug, Clone)]
pub struct LocalBinding {
    base_url: String,
    timeout_seconds: u64,
    client: Client,
}

impl LocalBinding {
    pub fn try_new(base_url: impl Into<String>, timeout_seconds: u64) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ProviderError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_seconds,
            client,
        })
    }

    pub fn endpoint(&self, model: &str) -> String {
        format!("{}/run/{}", self.base_url, model)
    }

    /// Extracts the failure message from an error body. JSON bodies may carry
    /// it under `error`, `message` or `errors[0].message`; anything else is
    /// used verbatim.
    fn failure_message(body: &str) -> String {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
            return body.trim().to_string();
        };

        value
            .get("error")
            .and_then(|v| v.as_str())
            .or_else(|| value.get("message").and_then(|v| v.as_str()))
            .or_else(|| {
                value
                    .get("errors")
                    .and_then(|v| v.get(0))
                    .and_then(|v| v.get("message"))
                    .and_then(|v| v.as_str())
            })
            .map(str::to_string)
            .unwrap_or_else(|| body.trim().to_string())
    }

    fn parse_reply(body: &str) -> Result<LlmResponse, ProviderError> {
        let value: serde_json::Value = serde_json::from_str(body)?;
        let content = match value.get("result") {
            Some(result) if result.is_object() => reply_text(result),
            _ => reply_text(&value),
        };
        Ok(LlmResponse::new(content))
    }
}

#[async_trait::async_trait]
impl LlmProvider for LocalBinding {
    async fn chat(&self, messages: Vec<Message>, model: &str) -> Result<LlmResponse, ProviderError> {
        let url = self.endpoint(model);
        info!(
            model = model,
            provider = self.provider_name(),
            message_count = messages.len(),
            "Sending chat request to local binding"
        );

        let response = self
            .client
            .post(&url)
            .json(&RunRequest {
                messages: &messages,
            })
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&e, self.timeout_seconds))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::from_transport(&e, self.timeout_seconds))?;

        if !status.is_success() {
            let message = Self::failure_message(&body);
            warn!(status = %status, error = %message, "Local binding returned an error");
            return Err(ProviderError::from_binding_message(message));
        }

        debug!(status = %status, "Received response from local binding");
        Self::parse_reply(&body)
    }

    fn provider_name(&self) -> &'static str {
        "local-binding"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_format() {
        let binding = LocalBinding::try_new("http://127.0.0.1:8788/", 30).unwrap();
        assert_eq!(
            binding.endpoint("@cf/meta/llama-3-8b-instruct"),
            "http://127.0.0.1:8788/run/@cf/meta/llama-3-8b-instruct"
        );
    }

    #[test]
    fn test_failure_message_variants() {
        assert_eq!(
            LocalBinding::failure_message(r#"{"error":"Binding AI needs to be run remotely"}"#),
            "Binding AI needs to be run remotely"
        );
        assert_eq!(
            LocalBinding::failure_message(r#"{"errors":[{"message":"quota"}]}"#),
            "quota"
        );
        assert_eq!(LocalBinding::failure_message("  plain text  "), "plain text");
    }

    #[test]
    fn test_parse_reply_shapes() {
        assert_eq!(
            LocalBinding::parse_reply(r#"{"response":"direct"}"#).unwrap().content,
            "direct"
        );
        assert_eq!(
            LocalBinding::parse_reply(r#"{"result":{"response":"wrapped"}}"#)
                .unwrap()
                .content,
            "wrapped"
        );
        assert_eq!(LocalBinding::parse_reply("{}").unwrap().content, "");
        assert!(LocalBinding::parse_reply("not json").is_err());
    }
}
