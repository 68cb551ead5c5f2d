//! Direct REST access to the hosted inference endpoint
//!
//! Used as the fallback path when the local binding cannot serve a request.
//! The endpoint wraps model output in an envelope:
//!
//! ```json
//! { "success": true, "result": { "response": "..." }, "errors": [] }
//! ```
//!
//! A single attempt is made per call; failures surface to the caller.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::providers::{LlmProvider, LlmResponse, ProviderError, reply_text};
use crate::session::Message;

/// Default API root for the hosted endpoint
pub const DEFAULT_API_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Request body for a model run
#[derive(Debug, Serialize)]
pub(crate) struct RunRequest<'a> {
    pub(crate) messages: &'a [Message],
}

/// Authenticated client for `POST /accounts/{account}/ai/run/{model}`
#[derive(Debug, Clone)]
pub struct WorkersAiProvider {
    account_id: String,
    api_token: String,
    base_url: String,
    timeout_seconds: u64,
    client: Client,
}

impl WorkersAiProvider {
    /// Creates a provider, returning an error if the HTTP client fails to build
    pub fn try_new(
        account_id: impl Into<String>,
        api_token: impl Into<String>,
        base_url: impl Into<String>,
        timeout_seconds: u64,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ProviderError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            account_id: account_id.into(),
            api_token: api_token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_seconds,
            client,
        })
    }

    /// Full endpoint URL for `model`
    pub fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/accounts/{}/ai/run/{}",
            self.base_url, self.account_id, model
        )
    }

    /// Interprets a 2xx body.
    fn parse_payload(body: &str) -> Result<LlmResponse, ProviderError> {
        let payload: serde_json::Value = serde_json::from_str(body).map_err(|e| {
            debug!(error = %e, "Workers AI returned a non-JSON body");
            error_response()
        })?;

        if !payload.is_object() || payload.get("success") == Some(&serde_json::Value::Bool(false))
        {
            return Err(error_response());
        }

        let content = payload
            .get("result")
            .filter(|result| result.is_object())
            .map(reply_text)
            .unwrap_or_default();

        Ok(LlmResponse::new(content))
    }
}

fn error_response() -> ProviderError {
    ProviderError::provider("Cloudflare AI returned an error response.")
}

#[async_trait::async_trait]
impl LlmProvider for WorkersAiProvider {
    async fn chat(&self, messages: Vec<Message>, model: &str) -> Result<LlmResponse, ProviderError> {
        let url = self.endpoint(model);
        info!(
            model = model,
            provider = self.provider_name(),
            message_count = messages.len(),
            "Sending chat request to Workers AI REST endpoint"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&RunRequest {
                messages: &messages,
            })
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Workers AI request failed");
                ProviderError::from_transport(&e, self.timeout_seconds)
            })?;

        let status = response.status();
        debug!(status = %status, "Received response");

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::from_transport(&e, self.timeout_seconds))?;

        if !status.is_success() {
            return Err(ProviderError::http(status.as_u16(), &body));
        }

        let llm_response = Self::parse_payload(&body)?;
        info!(
            content_length = llm_response.content.len(),
            "Received response from Workers AI"
        );
        Ok(llm_response)
    }

    fn provider_name(&self) -> &'static str {
        "workers-ai"
    }
}
