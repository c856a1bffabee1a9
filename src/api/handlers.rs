use axum::extract::State;
use axum::response::Html;
use axum::Json;

use crate::api::types::{ChatRequest, ChatResponse};
use crate::api::AppState;
use crate::error::InferenceError;
use crate::prompt::{wrap_instruction, STOP_SEQS};

/// Generation cap for a single chat reply.
const MAX_REPLY_TOKENS: usize = 256;

/// Chat page markup, embedded at compile time.
const CHAT_PAGE: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/chat.html"));

pub async fn index() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

/// One-shot chat: wrap the message in instruction delimiters, run a single
/// completion, return the trimmed reply. Blank input short-circuits to an
/// empty reply without touching the model.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, InferenceError> {
    let message = req.message.as_deref().map(str::trim).unwrap_or("");
    if message.is_empty() {
        return Ok(Json(ChatResponse {
            reply: String::new(),
        }));
    }

    let prompt = wrap_instruction(message);
    let raw = state
        .engine
        .complete(&prompt, MAX_REPLY_TOKENS, STOP_SEQS)
        .await?;

    Ok(Json(ChatResponse {
        reply: raw.trim().to_string(),
    }))
}
