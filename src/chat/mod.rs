pub mod service;
pub mod types;

pub use service::{ChatError, ChatService, MESSAGE_REQUIRED, SYSTEM_PROMPT};
pub use types::{ChatReply, ChatRequest};
