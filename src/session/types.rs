use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Number of prior messages kept per session.
pub const MAX_HISTORY_LENGTH: usize = 20;

/// Role of a message sender in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Parses a loosely typed JSON array, dropping entries that are not
    /// `{role, content}` objects with a known role.
    pub fn parse_list(value: serde_json::Value) -> Vec<Message> {
        match value {
            serde_json::Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match serde_json::from_value::<Message>(item) {
                    Ok(message) => Some(message),
                    Err(e) => {
                        tracing::debug!(error = %e, "Dropping malformed history entry");
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Trailing window of a conversation, capped at [`MAX_HISTORY_LENGTH`].
///
/// The oldest entries are dropped first when the window overflows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    messages: VecDeque<Message>,
}

impl History {
    pub fn new() -> Self {
        Self {
            messages: VecDeque::with_capacity(MAX_HISTORY_LENGTH),
        }
    }

    /// Builds a window from an arbitrary list, keeping only the trailing entries.
    pub fn from_messages(messages: Vec<Message>) -> Self {
        let skip = messages.len().saturating_sub(MAX_HISTORY_LENGTH);
        Self {
            messages: messages.into_iter().skip(skip).collect(),
        }
    }

    pub fn push(&mut self, message: Message) {
        if self.messages.len() >= MAX_HISTORY_LENGTH {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    /// Records a completed turn: the user message followed by the reply.
    pub fn push_turn(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.push(Message::user(user));
        self.push(Message::assistant(assistant));
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.back()
    }

    pub fn into_vec(self) -> Vec<Message> {
        self.messages.into()
    }
}

/// Opaque conversation identifier, supplied by the client or generated here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Uses `provided` verbatim when non-empty, otherwise mints a fresh UUID.
    pub fn resolve(provided: Option<&str>) -> Self {
        match provided {
            Some(id) if !id.is_empty() => Self(id.to_string()),
            _ => Self::generate(),
        }
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Key under which the session history is persisted.
    pub fn storage_key(&self) -> String {
        format!("session:{}", self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
