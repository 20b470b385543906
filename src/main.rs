use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use voxrelay_core::{
    resolve_api_key, AppConfig, Encoding, LanguageSetting, OptionToggles, RedactTarget, RelayError,
    SourceSpec, TranscriptionMode, TranscriptionOptions,
};
use voxrelay_relay::{
    HttpBackend, HttpBackendConfig, HttpByteStream, PrerecordedRelay, StreamingRelay, WsConnection,
    WsConnectionConfig,
};
use voxrelay_render::{render_prerecorded, render_stream_event, TerminalSurface};
use voxrelay_source::YtDlpExtractor;

#[derive(Parser)]
#[command(name = "voxrelay", about = "Speech-to-text relay for the Deepgram API")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Vendor API key (overrides the config file and the environment)
    #[arg(long)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transcribe a complete audio file, buffer or URL in one request
    Prerecorded {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        options: OptionArgs,
    },
    /// Relay a remote audio stream and print transcripts as they arrive
    Streaming {
        /// Streaming audio URL (defaults to the config's stream URL)
        #[arg(long)]
        url: Option<String>,

        #[command(flatten)]
        options: OptionArgs,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Use the bundled sample file from the config
    #[arg(long, conflicts_with_all = ["file", "url", "video"])]
    sample: bool,

    /// Local audio file to upload
    #[arg(long, conflicts_with_all = ["url", "video"])]
    file: Option<PathBuf>,

    /// Direct audio URL
    #[arg(long, conflicts_with = "video")]
    url: Option<String>,

    /// Video-hosting link; the audio track is extracted with yt-dlp
    #[arg(long)]
    video: Option<String>,
}

impl SourceArgs {
    fn to_spec(&self, config: &AppConfig) -> SourceSpec {
        if self.sample {
            SourceSpec::SampleFile(PathBuf::from(&config.source.sample_path))
        } else if let Some(path) = &self.file {
            SourceSpec::UploadedFile(path.clone())
        } else if let Some(url) = &self.url {
            SourceSpec::RemoteUrl(url.clone())
        } else if let Some(url) = &self.video {
            SourceSpec::VideoLink(url.clone())
        } else {
            // No source given: fall back to the bundled sample.
            SourceSpec::SampleFile(PathBuf::from(&config.source.sample_path))
        }
    }
}

#[derive(Args)]
struct OptionArgs {
    /// Model identifier (nova-2-ea, nova, whisper-medium, enhanced, base)
    #[arg(long)]
    model: Option<String>,

    /// Language code (en, fr, hi)
    #[arg(long, conflicts_with = "detect_language")]
    language: Option<String>,

    /// Ask the vendor to detect the spoken language
    #[arg(long)]
    detect_language: bool,

    /// Number of independent audio channels in the submitted audio
    #[arg(long)]
    channels: Option<u32>,

    /// Identify and extract key topics
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    detect_topics: Option<bool>,

    /// Recognize speaker changes
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    diarize: Option<bool>,

    /// Identify and extract key entities
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    detect_entities: Option<bool>,

    /// Expected encoding of streaming audio (linear16, flac, mulaw, amr-nb, amr-wb, opus, speex)
    #[arg(long)]
    encoding: Option<String>,

    /// Return transcripts when pauses in speech are detected
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    endpointing: Option<bool>,

    /// Provide preliminary results for streaming audio
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    interim_results: Option<bool>,

    /// Transcribe each audio channel independently
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    multichannel: Option<bool>,

    /// Split the transcript into paragraphs
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    paragraphs: Option<bool>,

    /// Remove profanity from the transcript
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    profanity_filter: Option<bool>,

    /// Add punctuation and capitalization
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    punctuate: Option<bool>,

    /// Redact sensitive content, replacing it with asterisks
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    redact: Option<bool>,

    /// Redaction targets (numbers, pci, ssn)
    #[arg(long, value_delimiter = ',')]
    redact_targets: Vec<String>,

    /// Comma-separated terms to search for in the submitted audio
    #[arg(long)]
    search: Option<String>,

    /// Apply smart formatting (punctuation, numerals, paragraphs, dates)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    smart_format: Option<bool>,

    /// Summarize sections of content
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    summarize: Option<bool>,

    /// Segment speech into utterances
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    utterances: Option<bool>,

    /// Seconds of silence between words used to split utterances
    #[arg(long)]
    utt_split: Option<f64>,
}

impl OptionArgs {
    fn assemble(&self, mode: TranscriptionMode) -> Result<TranscriptionOptions> {
        let language = if self.detect_language {
            Some(LanguageSetting::Detect)
        } else {
            self.language
                .as_ref()
                .map(|code| LanguageSetting::Fixed(code.clone()))
        };

        let encoding = match self.encoding.as_deref() {
            Some(value) => Some(
                Encoding::parse(value).with_context(|| format!("unknown encoding: {value}"))?,
            ),
            None => None,
        };

        let mut redact_targets = Vec::new();
        for target in &self.redact_targets {
            redact_targets.push(
                RedactTarget::parse(target)
                    .with_context(|| format!("unknown redaction target: {target}"))?,
            );
        }

        let toggles = OptionToggles {
            model: self.model.clone(),
            language,
            channels: self.channels,
            detect_topics: self.detect_topics,
            diarize: self.diarize,
            detect_entities: self.detect_entities,
            encoding,
            endpointing: self.endpointing,
            interim_results: self.interim_results,
            multichannel: self.multichannel,
            paragraphs: self.paragraphs,
            profanity_filter: self.profanity_filter,
            punctuate: self.punctuate,
            redact: self.redact,
            redact_targets,
            search_terms: self.search.clone(),
            smart_format: self.smart_format,
            summarize: self.summarize,
            utterances: self.utterances,
            utt_split: self.utt_split,
        };
        Ok(toggles.assemble(mode))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        AppConfig::load_from_file(&cli.config)
            .with_context(|| format!("failed to load config from {:?}", cli.config))?
    } else {
        AppConfig::default()
    };

    let env_filter =
        EnvFilter::try_new(&config.general.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    // A missing credential blocks everything; the error says how to
    // provide one.
    let api_key = resolve_api_key(cli.api_key.as_deref(), &config)?;

    match cli.command {
        Command::Prerecorded { source, options } => {
            let options = options.assemble(TranscriptionMode::Prerecorded)?;
            run_prerecorded(&config, api_key, source, options).await
        }
        Command::Streaming { url, options } => {
            let options = options.assemble(TranscriptionMode::Streaming)?;
            let url = url.unwrap_or_else(|| config.source.stream_default_url.clone());
            run_streaming(&config, api_key, url, options).await
        }
    }
}

async fn run_prerecorded(
    config: &AppConfig,
    api_key: String,
    source: SourceArgs,
    options: TranscriptionOptions,
) -> Result<()> {
    let spec = source.to_spec(config);
    let extractor = YtDlpExtractor::default();
    let resolved = voxrelay_source::resolve(spec, &extractor)
        .await
        .context("failed to resolve audio source")?;
    tracing::info!(kind = resolved.kind(), model = %options.model, "transcribing");

    let backend = HttpBackend::new(HttpBackendConfig {
        base_url: config.api.base_url.clone(),
        api_key,
        connect_timeout: Duration::from_secs(config.api.connect_timeout_secs),
        request_timeout: Duration::from_secs(config.api.request_timeout_secs),
    });
    let backend = match backend {
        Ok(backend) => backend,
        Err(e) => return fail_with_relay_error(e),
    };
    let relay = PrerecordedRelay::new(backend);

    match relay.transcribe(&resolved, &options).await {
        Ok(outcome) => {
            if outcome.from_cache {
                tracing::debug!("result served from cache");
            }
            let mut surface = TerminalSurface::new();
            render_prerecorded(&outcome.response, &options, &mut surface);
            Ok(())
        }
        Err(e) => fail_with_relay_error(e),
    }
}

async fn run_streaming(
    config: &AppConfig,
    api_key: String,
    url: String,
    options: TranscriptionOptions,
) -> Result<()> {
    let connect_timeout = Duration::from_secs(config.api.connect_timeout_secs);

    // No overall timeout on the audio client; the stream is open-ended.
    let client = reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .build()
        .context("failed to build HTTP client")?;
    let source = match HttpByteStream::open(&client, &url).await {
        Ok(source) => source,
        Err(e) => return fail_with_relay_error(e),
    };

    let connection = WsConnection::new(WsConnectionConfig {
        stream_url: config.api.stream_url.clone(),
        api_key,
        connect_timeout,
    });
    let relay = StreamingRelay::new(connection);

    let cancel = relay.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("stop requested, finishing at the next chunk boundary");
            cancel.cancel();
        }
    });

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let renderer = tokio::spawn(async move {
        let mut surface = TerminalSurface::new();
        while let Some(event) = event_rx.recv().await {
            render_stream_event(&event, &mut surface);
        }
    });

    let result = relay.run(source, &options, event_tx).await;
    let _ = renderer.await;

    match result {
        Ok(summary) => {
            tracing::info!(
                chunks = summary.chunks_pumped,
                events = summary.events_forwarded,
                cancelled = summary.cancelled,
                "streaming finished"
            );
            Ok(())
        }
        Err(e) => fail_with_relay_error(e),
    }
}

/// Convert a relay failure into its user-facing message. Timeouts get
/// their own wording.
fn fail_with_relay_error(e: RelayError) -> Result<()> {
    match &e {
        RelayError::Timeout(_) => bail!(
            "{e}\nPlease try again after some time, or with a smaller source if the issue persists."
        ),
        _ => bail!("{e}"),
    }
}
