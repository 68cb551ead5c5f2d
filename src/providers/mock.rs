//! Mock inference provider for unit tests
//!
//! Returns a configured reply or error and records what it was called with.

use std::sync::{Arc, Mutex};

use crate::providers::{LlmProvider, LlmResponse, ProviderError};
use crate::session::Message;

#[derive(Clone)]
pub struct MockLlmProvider {
    response: Arc<Mutex<LlmResponse>>,
    error: Arc<Mutex<Option<ProviderError>>>,
    name: &'static str,
    call_count: Arc<Mutex<usize>>,
    last_messages: Arc<Mutex<Option<Vec<Message>>>>,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self::with_name("mock")
    }

    pub fn with_name(name: &'static str) -> Self {
        Self {
            response: Arc::new(Mutex::new(LlmResponse::new("Mock response"))),
            error: Arc::new(Mutex::new(None)),
            name,
            call_count: Arc::new(Mutex::new(0)),
            last_messages: Arc::new(Mutex::new(None)),
        }
    }

    pub fn replying(content: impl Into<String>) -> Self {
        let mock = Self::new();
        mock.set_response(content);
        mock
    }

    pub fn failing(error: ProviderError) -> Self {
        let mock = Self::new();
        mock.set_error(error);
        mock
    }

    pub fn set_response(&self, content: impl Into<String>) {
        *self.response.lock().unwrap() = LlmResponse::new(content);
    }

    pub fn set_error(&self, error: ProviderError) {
        *self.error.lock().unwrap() = Some(error);
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn last_messages(&self) -> Option<Vec<Message>> {
        self.last_messages.lock().unwrap().clone()
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockLlmProvider {
    async fn chat(&self, messages: Vec<Message>, _model: &str) -> Result<LlmResponse, ProviderError> {
        *self.call_count.lock().unwrap() += 1;
        *self.last_messages.lock().unwrap() = Some(messages);

        let error = self.error.lock().unwrap().clone();
        if let Some(err) = error {
            return Err(err);
        }

        Ok(self.response.lock().unwrap().clone())
    }

    fn provider_name(&self) -> &'static str {
        self.name
    }
}
