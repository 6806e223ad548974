//! Chat model access for scholarbot.
//!
//! The assembler only needs [`ChatModel`]: hand over role-tagged messages, get
//! the reply text back. [`OpenAiCompatClient`] implements it against any
//! OpenAI-compatible `/chat/completions` endpoint (OpenRouter by default).
//! [`extraction`] decodes the structured per-section replies.

mod client;
pub mod extraction;

use std::future::Future;

use scholarbot_shared::{ChatMessage, Result};

pub use client::OpenAiCompatClient;
pub use extraction::{SectionExtraction, parse_extraction};

/// A chat completion backend.
pub trait ChatModel: Send + Sync {
    /// Complete the conversation formed by `messages`, in order.
    fn complete(&self, messages: &[&ChatMessage]) -> impl Future<Output = Result<String>> + Send;
}
