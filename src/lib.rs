//! charla — a single-page chat front-end for a locally loaded llama model.
//!
//! One axum server, one embedded HTML page, one `POST /chat` endpoint that
//! wraps the user message in Llama-2 instruction delimiters and returns the
//! model's completion as JSON.

pub mod api;
pub mod config;
pub mod error;
pub mod inference;
pub mod prompt;

pub use api::AppState;
pub use config::{AppConfig, ModelConfig};
pub use error::{ConfigError, InferenceError};
pub use inference::{CompletionEngine, LlamaSession};
