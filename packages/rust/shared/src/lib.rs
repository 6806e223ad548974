//! Shared types, error model, and configuration for scholarbot.
//!
//! This crate is the foundation depended on by all other scholarbot crates.
//! It provides:
//! - [`ScholarbotError`]: the unified error type
//! - Domain types ([`Paragraph`], [`Section`], [`ChatMessage`], [`TurnId`])
//! - Configuration ([`AppConfig`], [`SegmenterConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, AssistantConfig, ModelConfig, SegmenterConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, resolve_api_key,
};
pub use error::{Result, ScholarbotError};
pub use types::{ChatMessage, Paragraph, Role, Section, TurnId};
