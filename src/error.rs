use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Startup failures. Any of these aborts the process before it binds.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("model weights not found at {}", .0.display())]
    MissingModel(PathBuf),

    #[error("tokenizer not found at {}", .0.display())]
    MissingTokenizer(PathBuf),

    #[error("invalid value for {var}: {value:?}")]
    InvalidVar { var: &'static str, value: String },

    #[error("failed to read model weights: {0}")]
    ModelLoad(#[source] candle::Error),

    #[error("failed to load tokenizer: {0}")]
    TokenizerLoad(String),
}

/// Failures while serving one completion. Fatal for the request being
/// served, not for the process.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("tokenizer: {0}")]
    Tokenizer(String),

    #[error(transparent)]
    Model(#[from] candle::Error),

    #[error("prompt of {prompt_tokens} tokens does not fit a {context_length}-token context")]
    ContextOverflow {
        prompt_tokens: usize,
        context_length: usize,
    },

    #[error("generation worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("model session lock poisoned")]
    LockPoisoned,
}

impl IntoResponse for InferenceError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "inference failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
    }
}
