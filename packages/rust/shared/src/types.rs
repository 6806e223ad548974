//! Core domain types shared by the segmenter, the model client and the assembler.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// TurnId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one question/answer turn (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnId(pub Uuid);

impl TurnId {
    /// Generate a new time-sortable turn identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Paragraph / Section
// ---------------------------------------------------------------------------

/// A block of text from one page, tagged with the largest glyph size in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Raw paragraph text (may carry trailing newlines).
    pub text: String,
    /// Maximum glyph size among the paragraph's characters.
    pub font_size: f32,
    /// Zero-based index of the page the paragraph was read from.
    #[serde(default)]
    pub page: usize,
}

impl Paragraph {
    pub fn new(text: impl Into<String>, font_size: f32, page: usize) -> Self {
        Self {
            text: text.into(),
            font_size,
            page,
        }
    }
}

/// A named, page-bounded span of a paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Trimmed header text.
    pub name: String,
    /// Page on which the header was found.
    pub start_page: usize,
    /// Last page belonging to the section (inclusive when fetching text).
    pub end_page: usize,
}

// ---------------------------------------------------------------------------
// Conversation messages
// ---------------------------------------------------------------------------

/// Who authored a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Human,
    Assistant,
    /// Contextual note injected by the bot (article text, section extracts).
    System,
}

impl Role {
    /// Role name used by OpenAI-compatible chat APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Human => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

/// A single role-tagged conversation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}
