use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    discord_token: String,
    openai_api_key: String,
    /// Persona text used as the system turn of every completion request.
    persona: String,
    #[serde(default = "default_model")]
    model: String,
    /// Extra attempts after the first failed completion call.
    #[serde(default = "default_max_retries")]
    max_retries: u32,
    /// Base unit for exponential backoff between attempts.
    #[serde(default = "default_backoff_base_secs")]
    backoff_base_secs: u64,
    /// Override for the completion endpoint (e.g. a local gateway).
    openai_base_url: Option<String>,
    /// Directory for the log file. File logging is disabled when unset.
    log_dir: Option<String>,
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_max_retries() -> u32 {
    2
}

fn default_backoff_base_secs() -> u64 {
    1
}

pub struct Config {
    pub discord_token: String,
    pub openai_api_key: String,
    /// Persona text, trimmed. Always the first turn of a completion request.
    pub persona: String,
    pub model: String,
    /// Extra attempts after the first failed completion call.
    pub max_retries: u32,
    pub backoff_base_secs: u64,
    pub openai_base_url: Option<String>,
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        // Validate required fields
        if file.discord_token.is_empty() {
            return Err(ConfigError::Validation("discord_token is required".into()));
        }
        if file.openai_api_key.is_empty() {
            return Err(ConfigError::Validation("openai_api_key is required".into()));
        }
        if !file.openai_api_key.starts_with("sk-") {
            return Err(ConfigError::Validation(
                "openai_api_key appears invalid (expected format: sk-...)".into(),
            ));
        }
        let persona = file.persona.trim().to_string();
        if persona.is_empty() {
            return Err(ConfigError::Validation("persona must not be empty".into()));
        }

        let openai_base_url = file
            .openai_base_url
            .map(|url| url.trim_end_matches('/').to_string());

        Ok(Self {
            discord_token: file.discord_token,
            openai_api_key: file.openai_api_key,
            persona,
            model: file.model,
            max_retries: file.max_retries,
            backoff_base_secs: file.backoff_base_secs,
            openai_base_url,
            log_dir: file.log_dir.map(PathBuf::from),
        })
    }
}
