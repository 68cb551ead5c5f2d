use serde::Serialize;
use serde_json::Value;

use crate::session::{History, Message};

/// Body of `POST /chat`.
///
/// Parsed leniently: a non-string `message` or `sessionId` counts as absent
/// and a non-array `history` as empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub history: Vec<Message>,
    pub session_id: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return Self::default();
        };

        let string_field = |v: Option<Value>| match v {
            Some(Value::String(s)) => Some(s),
            _ => None,
        };

        Self {
            message: string_field(fields.remove("message")),
            history: fields
                .remove("history")
                .map(Message::parse_list)
                .unwrap_or_default(),
            session_id: string_field(fields.remove("sessionId")),
        }
    }

    /// Message text with surrounding whitespace removed; empty when absent.
    pub fn trimmed_message(&self) -> &str {
        self.message.as_deref().map(str::trim).unwrap_or_default()
    }
}

/// Successful chat turn, serialized as the `POST /chat` response.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub session_id: String,
    pub response: String,
    pub history: History,
}
