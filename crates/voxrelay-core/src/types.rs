use std::path::PathBuf;

/// User-facing description of where the audio comes from.
/// Exactly one variant is active per transcription attempt.
#[derive(Debug, Clone)]
pub enum SourceSpec {
    /// Bundled sample file, path taken from configuration.
    SampleFile(PathBuf),
    /// An audio file picked from the local filesystem.
    UploadedFile(PathBuf),
    /// Audio already available in memory as encoded bytes.
    RecordedBuffer {
        data: Vec<u8>,
        mimetype: Option<String>,
    },
    /// Direct HTTP(S) audio URL.
    RemoteUrl(String),
    /// Video-hosting link whose audio track must be extracted first.
    VideoLink(String),
}

/// What the relay actually consumes. The vendor API takes either a
/// remote URL or a byte buffer, nothing else.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedSource {
    Url(String),
    Buffer {
        data: Vec<u8>,
        mimetype: Option<String>,
    },
}

impl ResolvedSource {
    pub fn kind(&self) -> &'static str {
        match self {
            ResolvedSource::Url(_) => "url",
            ResolvedSource::Buffer { .. } => "buffer",
        }
    }
}

/// One transcript fragment delivered by the streaming connection.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEvent {
    pub transcript: String,
    pub is_final: bool,
    pub start: f64,
    pub duration: f64,
}

/// Events surfaced by a streaming connection, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Opened,
    Transcript(TranscriptEvent),
    Closed(Option<u16>),
}

/// Lifecycle of a streaming relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    Connecting,
    Streaming,
    Finishing,
    Closed,
    Failed,
}

impl RelayState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RelayState::Closed | RelayState::Failed)
    }
}

/// Summary returned by a completed streaming relay run.
#[derive(Debug, Clone)]
pub struct StreamSummary {
    pub chunks_pumped: usize,
    pub events_forwarded: usize,
    pub cancelled: bool,
    pub final_state: RelayState,
}
