//! Llama-2-chat instruction wrapping.
//!
//! User turns go to the model inside fixed instruction delimiters; the
//! closing delimiter doubles as the stop sequence for generation.

pub const INST_OPEN: &str = "[INST]";
pub const INST_CLOSE: &str = "[/INST]";

/// Stop sequences passed to the engine for chat completions.
pub const STOP_SEQS: &[&str] = &[INST_CLOSE];

/// Wrap a user message in the instruction delimiters expected by
/// Llama-2-chat models.
pub fn wrap_instruction(message: &str) -> String {
    format!("{INST_OPEN} {message} {INST_CLOSE}")
}

/// Cut `text` just before the earliest stop-sequence occurrence.
pub fn truncate_at_stop<'a>(text: &'a str, stops: &[&str]) -> &'a str {
    let end = stops
        .iter()
        .filter_map(|seq| text.find(seq))
        .min()
        .unwrap_or(text.len());
    &text[..end]
}
