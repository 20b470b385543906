//! Assembly of the per-attempt transcription configuration record.
//!
//! User toggles come in as [`OptionToggles`] (every field optional);
//! [`OptionToggles::assemble`] fills per-mode defaults and applies the
//! documented cross-option implications, producing an immutable
//! [`TranscriptionOptions`] record for exactly one transcription attempt.

/// Vendor models, display name → identifier.
pub const MODELS: &[(&str, &str)] = &[
    ("Nova-2", "nova-2-ea"),
    ("Nova", "nova"),
    ("Whisper Cloud", "whisper-medium"),
    ("Enhanced", "enhanced"),
    ("Base", "base"),
];

/// Languages with fixed codes; auto-detection is a separate setting.
pub const LANGUAGES: &[(&str, &str)] = &[("English", "en"), ("French", "fr"), ("Hindi", "hi")];

pub const DEFAULT_MODEL: &str = "nova-2-ea";
pub const DEFAULT_UTT_SPLIT: f64 = 0.8;

/// Display name for a vendor language code.
pub fn language_name(code: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(name, _)| *name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptionMode {
    Prerecorded,
    Streaming,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LanguageSetting {
    /// Ask the vendor to detect the spoken language.
    Detect,
    /// A fixed language code such as `"en"`.
    Fixed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedactTarget {
    /// Strings of numerals.
    Numbers,
    /// Credit card number, expiration date, CVV.
    Pci,
    /// Social security numbers.
    Ssn,
}

impl RedactTarget {
    pub fn as_param(&self) -> &'static str {
        match self {
            RedactTarget::Numbers => "numbers",
            RedactTarget::Pci => "pci",
            RedactTarget::Ssn => "ssn",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "numbers" => Some(RedactTarget::Numbers),
            "pci" => Some(RedactTarget::Pci),
            "ssn" => Some(RedactTarget::Ssn),
            _ => None,
        }
    }
}

/// Expected encoding of submitted streaming audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Linear16,
    Flac,
    Mulaw,
    AmrNb,
    AmrWb,
    Opus,
    Speex,
}

impl Encoding {
    pub fn as_param(&self) -> &'static str {
        match self {
            Encoding::Linear16 => "linear16",
            Encoding::Flac => "flac",
            Encoding::Mulaw => "mulaw",
            Encoding::AmrNb => "amr-nb",
            Encoding::AmrWb => "amr-wb",
            Encoding::Opus => "opus",
            Encoding::Speex => "speex",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "linear16" => Some(Encoding::Linear16),
            "flac" => Some(Encoding::Flac),
            "mulaw" => Some(Encoding::Mulaw),
            "amr-nb" => Some(Encoding::AmrNb),
            "amr-wb" => Some(Encoding::AmrWb),
            "opus" => Some(Encoding::Opus),
            "speex" => Some(Encoding::Speex),
            _ => None,
        }
    }
}

/// Raw toggle/value state as picked by the user. Unset fields take
/// per-mode defaults at assembly.
#[derive(Debug, Clone, Default)]
pub struct OptionToggles {
    pub model: Option<String>,
    pub language: Option<LanguageSetting>,
    pub channels: Option<u32>,
    pub detect_topics: Option<bool>,
    pub diarize: Option<bool>,
    pub detect_entities: Option<bool>,
    pub encoding: Option<Encoding>,
    pub endpointing: Option<bool>,
    pub interim_results: Option<bool>,
    pub multichannel: Option<bool>,
    pub paragraphs: Option<bool>,
    pub profanity_filter: Option<bool>,
    pub punctuate: Option<bool>,
    pub redact: Option<bool>,
    pub redact_targets: Vec<RedactTarget>,
    /// Comma-separated search terms, as typed.
    pub search_terms: Option<String>,
    pub smart_format: Option<bool>,
    pub summarize: Option<bool>,
    pub utterances: Option<bool>,
    pub utt_split: Option<f64>,
}

impl OptionToggles {
    /// Produce the configuration record for one transcription attempt.
    ///
    /// Features the original UI enables by default for a given mode keep
    /// those defaults here: diarization and smart formatting are on
    /// everywhere; topics, entities, paragraphs, summaries and utterances
    /// default on for prerecorded audio; endpointing and a linear16
    /// encoding default on for streaming.
    pub fn assemble(&self, mode: TranscriptionMode) -> TranscriptionOptions {
        let prerecorded = mode == TranscriptionMode::Prerecorded;
        let streaming = mode == TranscriptionMode::Streaming;

        let language = match (&self.language, mode) {
            (Some(LanguageSetting::Detect), TranscriptionMode::Streaming) | (None, TranscriptionMode::Streaming) => {
                // The streaming endpoint has no language detection.
                LanguageSetting::Fixed("en".to_string())
            }
            (Some(setting), _) => setting.clone(),
            (None, TranscriptionMode::Prerecorded) => LanguageSetting::Detect,
        };

        let redact = if self.redact.unwrap_or(!self.redact_targets.is_empty()) {
            self.redact_targets.clone()
        } else {
            Vec::new()
        };

        let search = self
            .search_terms
            .as_deref()
            .map(|terms| {
                terms
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let mut options = TranscriptionOptions {
            model: self
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            language,
            channels: self.channels.unwrap_or(1),
            detect_topics: self.detect_topics.unwrap_or(prerecorded),
            diarize: self.diarize.unwrap_or(true),
            detect_entities: self.detect_entities.unwrap_or(prerecorded),
            encoding: self
                .encoding
                .or(if streaming { Some(Encoding::Linear16) } else { None }),
            endpointing: self.endpointing.unwrap_or(streaming),
            interim_results: self.interim_results.unwrap_or(false),
            multichannel: self.multichannel.unwrap_or(false),
            paragraphs: self.paragraphs.unwrap_or(prerecorded),
            profanity_filter: self.profanity_filter.unwrap_or(false),
            punctuate: self.punctuate.unwrap_or(false),
            redact,
            search,
            smart_format: self.smart_format.unwrap_or(true),
            summarize: self.summarize.unwrap_or(prerecorded),
            utterances: self.utterances.unwrap_or(prerecorded),
            utt_split: self.utt_split.unwrap_or(DEFAULT_UTT_SPLIT),
        };
        options.normalize();
        options
    }
}

/// Immutable configuration record for one transcription attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionOptions {
    pub model: String,
    pub language: LanguageSetting,
    pub channels: u32,
    pub detect_topics: bool,
    pub diarize: bool,
    pub detect_entities: bool,
    pub encoding: Option<Encoding>,
    pub endpointing: bool,
    pub interim_results: bool,
    pub multichannel: bool,
    pub paragraphs: bool,
    pub profanity_filter: bool,
    pub punctuate: bool,
    pub redact: Vec<RedactTarget>,
    pub search: Vec<String>,
    pub smart_format: bool,
    pub summarize: bool,
    pub utterances: bool,
    pub utt_split: f64,
}

impl TranscriptionOptions {
    /// Apply the documented cross-option implications.
    ///
    /// Smart formatting, paragraph splitting and summarization each turn
    /// punctuation on at the vendor; the record reflects that instead of
    /// leaving callers to know it.
    pub fn normalize(&mut self) {
        if self.smart_format || self.paragraphs || self.summarize {
            self.punctuate = true;
        }
    }

    /// Query parameters consumed by the prerecorded endpoint, in a fixed
    /// order. Streaming-only toggles (endpointing, interim results) are
    /// not part of this surface; channel count and encoding pass through
    /// unchecked, matching what the endpoint accepts and ignores.
    pub fn prerecorded_params(&self) -> Vec<(String, String)> {
        let mut params = self.common_params();
        match &self.language {
            LanguageSetting::Detect => push(&mut params, "detect_language", "true"),
            LanguageSetting::Fixed(code) => push(&mut params, "language", code),
        }
        push_flag(&mut params, "detect_topics", self.detect_topics);
        push_flag(&mut params, "detect_entities", self.detect_entities);
        push_flag(&mut params, "paragraphs", self.paragraphs);
        push_flag(&mut params, "summarize", self.summarize);
        if self.utterances {
            push(&mut params, "utterances", "true");
            push(&mut params, "utt_split", &self.utt_split.to_string());
        }
        params
    }

    /// Query parameters consumed by the streaming endpoint, in a fixed
    /// order. The streaming endpoint never sees `detect_language` or the
    /// prerecorded-only projections (topics, entities, paragraphs,
    /// summaries, utterances).
    pub fn streaming_params(&self) -> Vec<(String, String)> {
        let mut params = self.common_params();
        if let LanguageSetting::Fixed(code) = &self.language {
            push(&mut params, "language", code);
        }
        push_flag(&mut params, "endpointing", self.endpointing);
        push_flag(&mut params, "interim_results", self.interim_results);
        params
    }

    fn common_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        push(&mut params, "model", &self.model);
        push(&mut params, "channels", &self.channels.to_string());
        push_flag(&mut params, "diarize", self.diarize);
        if let Some(encoding) = self.encoding {
            push(&mut params, "encoding", encoding.as_param());
        }
        push_flag(&mut params, "multichannel", self.multichannel);
        push_flag(&mut params, "profanity_filter", self.profanity_filter);
        push_flag(&mut params, "punctuate", self.punctuate);
        for target in &self.redact {
            push(&mut params, "redact", target.as_param());
        }
        for term in &self.search {
            push(&mut params, "search", term);
        }
        push_flag(&mut params, "smart_format", self.smart_format);
        params
    }
}

fn push(params: &mut Vec<(String, String)>, key: &str, value: &str) {
    params.push((key.to_string(), value.to_string()));
}

fn push_flag(params: &mut Vec<(String, String)>, key: &str, value: bool) {
    if value {
        push(params, key, "true");
    }
}
