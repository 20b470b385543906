use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("no API key: pass --api-key, set [api] key in the config file, or export {0}")]
    MissingApiKey(&'static str),
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read audio file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("unsupported URL scheme (expected http or https): {0}")]
    UnsupportedScheme(String),

    #[error("audio extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("audio buffer is empty")]
    EmptyBuffer,
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to open streaming connection: {0}")]
    ConnectFailed(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response from transcription service: {0}")]
    Protocol(String),

    #[error("failed to send audio: {0}")]
    SendFailed(String),
}

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("response is missing expected field: {0}")]
    MissingField(String),
}
