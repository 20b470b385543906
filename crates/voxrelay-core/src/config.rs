use crate::error::ConfigError;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

/// Environment variable consulted when neither the CLI nor the config
/// file provides an API key.
pub const API_KEY_ENV: &str = "DEEPGRAM_API_KEY";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub source: SourceConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            api: ApiConfig::default(),
            source: SourceConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_stream_url")]
    pub stream_url: String,

    #[serde(default)]
    pub key: Option<String>,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            stream_url: default_stream_url(),
            key: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_sample_path")]
    pub sample_path: String,

    #[serde(default = "default_stream_url_source")]
    pub stream_default_url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            sample_path: default_sample_path(),
            stream_default_url: default_stream_url_source(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "https://api.deepgram.com".to_string()
}

fn default_stream_url() -> String {
    "wss://api.deepgram.com/v1/listen".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_sample_path() -> String {
    "assets/sample_file.wav".to_string()
}

fn default_stream_url_source() -> String {
    "http://stream.live.vc.bbcmedia.co.uk/bbc_world_service".to_string()
}

/// Interpolate `${VAR}` patterns with environment variable values.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([^}]+)\}").unwrap();
    let mut result = input.to_string();
    let mut missing = Vec::new();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => {
                result = result.replace(&cap[0], &val);
            }
            Err(_) => {
                missing.push(var_name.to_string());
            }
        }
    }

    if let Some(first_missing) = missing.into_iter().next() {
        return Err(ConfigError::EnvVarNotFound(first_missing));
    }

    Ok(result)
}

impl AppConfig {
    /// Load configuration from a TOML file, with environment variable interpolation.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let interpolated = interpolate_env_vars(&content)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        Ok(config)
    }

    /// Parse configuration from a TOML string (for testing).
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let interpolated = interpolate_env_vars(s)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        Ok(config)
    }
}

/// Resolve the vendor API key: an explicit override (CLI) wins over the
/// config file, which wins over the environment. Absence blocks every
/// transcription action.
pub fn resolve_api_key(
    override_key: Option<&str>,
    config: &AppConfig,
) -> Result<String, ConfigError> {
    if let Some(key) = override_key.filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }
    if let Some(key) = config.api.key.as_deref().filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }
    match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.is_empty() => Ok(key),
        _ => Err(ConfigError::MissingApiKey(API_KEY_ENV)),
    }
}
