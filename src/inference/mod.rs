//! Model session and the completion seam the HTTP layer talks through.

pub mod llama;

pub use llama::LlamaSession;

use async_trait::async_trait;

use crate::error::InferenceError;

/// Prompt-in, text-out surface of the loaded model.
///
/// Handlers hold this as a trait object so ownership stays explicit and
/// tests can substitute a recording stub for the real session.
#[async_trait]
pub trait CompletionEngine: Send + Sync {
    /// Generate at most `max_tokens` new tokens for `prompt`, halting early
    /// at end-of-sequence or when any of `stop` appears in the decoded text.
    /// The returned text is cut before the stop sequence.
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: usize,
        stop: &[&str],
    ) -> Result<String, InferenceError>;
}
