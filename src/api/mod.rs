use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

pub mod handlers;
pub mod types;

use handlers::{chat, index};

use crate::inference::CompletionEngine;

/// Shared state, constructed once in `main` and injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn CompletionEngine>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/chat", post(chat))
}
