pub mod config;
pub mod error;
pub mod options;
pub mod types;

pub use config::{resolve_api_key, ApiConfig, AppConfig, GeneralConfig, SourceConfig, API_KEY_ENV};
pub use error::{ConfigError, RelayError, SourceError, ViewError};
pub use options::{
    language_name, Encoding, LanguageSetting, OptionToggles, RedactTarget, TranscriptionMode,
    TranscriptionOptions, DEFAULT_MODEL, LANGUAGES, MODELS,
};
pub use types::{
    ConnectionEvent, RelayState, ResolvedSource, SourceSpec, StreamSummary, TranscriptEvent,
};
