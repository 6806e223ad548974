//! Structured per-section replies: `{"summary": "...", "relevant": true}`.

use serde::{Deserialize, Serialize};

use scholarbot_shared::{Result, ScholarbotError};

/// What the classifier said about one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionExtraction {
    /// Concise account of what the section says about the question.
    pub summary: String,
    /// Whether the section bears on the question at all.
    pub relevant: bool,
}

impl SectionExtraction {
    /// Result used when a reply cannot be decoded.
    pub fn irrelevant() -> Self {
        Self {
            summary: String::new(),
            relevant: false,
        }
    }

    /// The single example shown to the model to anchor the reply format.
    pub fn example_json() -> String {
        let example = Self {
            summary: "The authors train on 2T tokens and report a 4% gain on the long-context benchmark.".into(),
            relevant: true,
        };
        serde_json::to_string(&example).unwrap_or_default()
    }
}

/// Decode a classifier reply.
///
/// The reply must be exactly one JSON object carrying both fields; a
/// surrounding Markdown code fence is the only wrapping that is tolerated.
pub fn parse_extraction(reply: &str) -> Result<SectionExtraction> {
    let body = strip_code_fence(reply.trim());
    serde_json::from_str(body).map_err(|e| ScholarbotError::classification_parse(e.to_string()))
}

fn strip_code_fence(reply: &str) -> &str {
    let Some(rest) = reply.strip_prefix("```") else {
        return reply;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return reply;
    };
    // Drop an info string such as `json` on the opening fence line.
    match inner.split_once('\n') {
        Some((info, body)) if !info.trim_start().starts_with('{') => body.trim(),
        _ => inner.trim(),
    }
}
