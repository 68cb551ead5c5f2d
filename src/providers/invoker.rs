//! Two-path model invocation: local binding first, REST fallback second.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::providers::{
    LlmProvider, LocalBinding, MODEL_ID, ProviderError, WorkersAiProvider,
};
use crate::session::Message;

const NO_BACKEND_MESSAGE: &str = "AI binding unavailable and no API token configured.";

#[derive(Clone)]
pub struct ModelInvoker {
    binding: Option<Arc<dyn LlmProvider>>,
    fallback: Option<Arc<dyn LlmProvider>>,
    model: String,
}

impl ModelInvoker {
    pub fn new(
        binding: Option<Arc<dyn LlmProvider>>,
        fallback: Option<Arc<dyn LlmProvider>>,
    ) -> Self {
        Self {
            binding,
            fallback,
            model: MODEL_ID.to_string(),
        }
    }

    /// Wires the binding and fallback from configuration.
    ///
    /// The REST fallback is only built when both the account id and the API
    /// token are present.
    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        let binding = match config.binding_url.as_deref() {
            Some(url) => Some(
                Arc::new(LocalBinding::try_new(url, config.timeout_seconds)?) as Arc<dyn LlmProvider>,
            ),
            None => None,
        };

        let fallback = match (config.account_id.as_deref(), config.api_token.as_deref()) {
            (Some(account_id), Some(api_token)) => Some(Arc::new(WorkersAiProvider::try_new(
                account_id,
                api_token,
                &config.api_base_url,
                config.timeout_seconds,
            )?) as Arc<dyn LlmProvider>),
            _ => None,
        };

        info!(
            binding = binding.is_some(),
            rest_fallback = fallback.is_some(),
            model = MODEL_ID,
            "Model invoker configured"
        );

        Ok(Self::new(binding, fallback))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_binding(&self) -> bool {
        self.binding.is_some()
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Returns the assistant reply for `messages`.
    ///
    /// Binding errors other than the remote-binding signal propagate without
    /// touching the fallback.
    pub async fn run(&self, messages: Vec<Message>) -> Result<String, ProviderError> {
        let mut last_error = None;

        if let Some(binding) = &self.binding {
            match binding.chat(messages.clone(), &self.model).await {
                Ok(response) => return Ok(response.content),
                Err(e) if e.is_fallback_eligible() => {
                    warn!(
                        provider = binding.provider_name(),
                        error = %e,
                        "Local binding must run remotely, trying REST fallback"
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        let Some(fallback) = &self.fallback else {
            return Err(last_error.unwrap_or_else(|| ProviderError::unavailable(NO_BACKEND_MESSAGE)));
        };

        let response = fallback.chat(messages, &self.model).await?;
        Ok(response.content)
    }
}
