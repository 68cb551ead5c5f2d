//! HTTP surface: the bundled page and `POST /chat`.

pub mod error;
pub mod handlers;
pub mod router;

pub use error::AppError;
pub use router::build_router;

use crate::chat::ChatService;

/// Shared handler state. Holds no per-session data; each request carries
/// its own session id.
#[derive(Clone)]
pub struct AppState {
    pub chat: ChatService,
}

impl AppState {
    pub fn new(chat: ChatService) -> Self {
        Self { chat }
    }
}
