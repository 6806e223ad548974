//! Error types for scholarbot.
//!
//! Library crates use [`ScholarbotError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all scholarbot operations.
#[derive(Debug, thiserror::Error)]
pub enum ScholarbotError {
    /// A section name was requested that segmentation never recorded.
    #[error("section not found: {name:?}")]
    SectionNameNotFound { name: String },

    /// Internal invariant violation in the segmented section index.
    #[error("structural inconsistency: {message}")]
    StructuralInconsistency { message: String },

    /// A model reply did not decode as the expected structure.
    #[error("could not parse classifier reply: {message}")]
    ClassificationParse { message: String },

    /// Download, classification, or answer-generation call failed.
    #[error("{service} call failed: {message}")]
    ExternalCall { service: String, message: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (malformed layout, bad identifier, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScholarbotError>;

impl ScholarbotError {
    /// Create a section-not-found error.
    pub fn section_not_found(name: impl Into<String>) -> Self {
        Self::SectionNameNotFound { name: name.into() }
    }

    /// Create a structural inconsistency error from any displayable message.
    pub fn structural(msg: impl Into<String>) -> Self {
        Self::StructuralInconsistency {
            message: msg.into(),
        }
    }

    /// Create a classification parse error from any displayable message.
    pub fn classification_parse(msg: impl Into<String>) -> Self {
        Self::ClassificationParse {
            message: msg.into(),
        }
    }

    /// Create an external call error for the named service.
    pub fn external(service: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ExternalCall {
            service: service.into(),
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short, stable label for the kind of failure, shown to chat users.
    pub fn category(&self) -> &'static str {
        match self {
            Self::SectionNameNotFound { .. } => "section-not-found",
            Self::StructuralInconsistency { .. } => "structural-inconsistency",
            Self::ClassificationParse { .. } => "classification-parse",
            Self::ExternalCall { .. } => "external-call",
            Self::Config { .. } => "config",
            Self::Io { .. } => "io",
            Self::Validation { .. } => "validation",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ScholarbotError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = ScholarbotError::section_not_found("2 Method");
        assert_eq!(err.to_string(), r#"section not found: "2 Method""#);

        let err = ScholarbotError::external("model", "HTTP 429");
        assert_eq!(err.to_string(), "model call failed: HTTP 429");
    }

    #[test]
    fn categories_are_stable() {
        assert_eq!(
            ScholarbotError::structural("x").category(),
            "structural-inconsistency"
        );
        assert_eq!(
            ScholarbotError::classification_parse("x").category(),
            "classification-parse"
        );
        assert_eq!(
            ScholarbotError::io("/tmp/x", std::io::Error::other("boom")).category(),
            "io"
        );
    }
}
