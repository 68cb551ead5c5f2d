//! Request handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;

use crate::chat::{ChatReply, ChatRequest};
use crate::http::AppState;
use crate::http::error::AppError;

/// Bundled single-page client.
pub const INDEX_HTML: &str = include_str!("../../assets/index.html");

/// `GET|HEAD /` and `/index.html`.
pub async fn index() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/html; charset=UTF-8")],
        INDEX_HTML,
    )
}

/// `GET|HEAD /favicon.ico`: nothing to serve.
pub async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}

/// `POST /chat`.
///
/// The body is read raw so that invalid JSON is reported like any other
/// unexpected failure (500) rather than as an extractor rejection.
pub async fn chat(State(state): State<AppState>, body: Bytes) -> Result<Json<ChatReply>, AppError> {
    let value: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::Internal(format!("Invalid JSON body: {}", e)))?;

    let reply = state.chat.process_turn(ChatRequest::from_value(value)).await?;
    Ok(Json(reply))
}
