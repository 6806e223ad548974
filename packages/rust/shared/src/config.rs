//! Application configuration for scholarbot.
//!
//! User config lives at `~/.scholarbot/scholarbot.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScholarbotError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "scholarbot.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".scholarbot";

// ---------------------------------------------------------------------------
// Config structs (matching scholarbot.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Chat model endpoint settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Header detection heuristics.
    #[serde(default)]
    pub segmenter: SegmenterConfig,

    /// Turn-level behaviour.
    #[serde(default)]
    pub assistant: AssistantConfig,
}

/// `[model]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used for both section classification and the final answer.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Per-request timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Sampling temperature.
    #[serde(default)]
    pub temperature: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            default_model: default_model(),
            request_timeout_secs: default_request_timeout(),
            temperature: 0.0,
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "openai/gpt-3.5-turbo-16k".into()
}
fn default_request_timeout() -> u64 {
    60
}

/// `[segmenter]` section.
///
/// Header detection keys off the glyph size of the first paragraph mentioning
/// `introduction_keyword`; the other keywords drive front/back trimming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmenterConfig {
    #[serde(default = "default_introduction_keyword")]
    pub introduction_keyword: String,

    #[serde(default = "default_abstract_keyword")]
    pub abstract_keyword: String,

    /// A section whose name contains any of these ends the body.
    #[serde(default = "default_back_matter_keywords")]
    pub back_matter_keywords: Vec<String>,

    /// Maximum size difference still counted as a header match.
    #[serde(default = "default_font_size_tolerance")]
    pub font_size_tolerance: f32,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            introduction_keyword: default_introduction_keyword(),
            abstract_keyword: default_abstract_keyword(),
            back_matter_keywords: default_back_matter_keywords(),
            font_size_tolerance: default_font_size_tolerance(),
        }
    }
}

fn default_introduction_keyword() -> String {
    "Introduction".into()
}
fn default_abstract_keyword() -> String {
    "Abstract".into()
}
fn default_back_matter_keywords() -> Vec<String> {
    vec!["Reference".into(), "Citation".into()]
}
fn default_font_size_tolerance() -> f32 {
    1e-3
}

/// `[assistant]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Attempts per progress notification before giving up on it.
    #[serde(default = "default_progress_retries")]
    pub progress_retries: u32,

    /// Timeout for document downloads.
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// arXiv export API endpoint used for paper titles and abstracts.
    #[serde(default = "default_arxiv_api_url")]
    pub arxiv_api_url: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            progress_retries: default_progress_retries(),
            download_timeout_secs: default_download_timeout(),
            arxiv_api_url: default_arxiv_api_url(),
        }
    }
}

fn default_progress_retries() -> u32 {
    3
}
fn default_download_timeout() -> u64 {
    60
}
fn default_arxiv_api_url() -> String {
    "https://export.arxiv.org/api/query".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.scholarbot/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ScholarbotError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.scholarbot/scholarbot.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ScholarbotError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ScholarbotError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ScholarbotError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ScholarbotError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ScholarbotError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the model API key from the env var named in the config.
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.model.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(ScholarbotError::config(format!(
            "model API key not found. Set the {var_name} environment variable."
        ))),
    }
}
