//! One chat turn, end to end
//!
//! Resolve the session, load prior history, call the model with
//! `system + trailing history + new message`, then persist and return the
//! updated window.

use thiserror::Error;
use tracing::{debug, info};

use crate::chat::types::{ChatReply, ChatRequest};
use crate::providers::{ModelInvoker, ProviderError};
use crate::session::{History, HistoryStore, Message, SessionId};

/// Instruction prepended to every model call.
pub const SYSTEM_PROMPT: &str = "You are a friendly chatbot.";

/// Error text for a missing or blank message.
pub const MESSAGE_REQUIRED: &str = "Message is required.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChatError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[derive(Clone)]
pub struct ChatService {
    invoker: ModelInvoker,
    history: HistoryStore,
}

impl ChatService {
    pub fn new(invoker: ModelInvoker, history: HistoryStore) -> Self {
        Self { invoker, history }
    }

    pub fn history_store(&self) -> &HistoryStore {
        &self.history
    }

    pub async fn process_turn(&self, request: ChatRequest) -> Result<ChatReply, ChatError> {
        let message = request.trimmed_message().to_string();
        if message.is_empty() {
            return Err(ChatError::Validation(MESSAGE_REQUIRED.to_string()));
        }

        let session_id = SessionId::resolve(request.session_id.as_deref());
        debug!(session_id = %session_id, "Processing chat turn");

        let prior = self.history.load(&session_id, request.history).await;
        let trimmed = History::from_messages(prior);

        let mut chat = Vec::with_capacity(trimmed.len() + 2);
        chat.push(Message::system(SYSTEM_PROMPT));
        chat.extend(trimmed.iter().cloned());
        chat.push(Message::user(message.clone()));

        let reply = self.invoker.run(chat).await?;

        let mut updated = trimmed;
        updated.push_turn(message, reply.clone());

        self.history.save(&session_id, &updated).await;

        info!(
            session_id = %session_id,
            history_len = updated.len(),
            reply_length = reply.len(),
            "Chat turn completed"
        );

        Ok(ChatReply {
            session_id: session_id.to_string(),
            response: reply,
            history: updated,
        })
    }
}
