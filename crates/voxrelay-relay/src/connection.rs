use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use voxrelay_core::{ConnectionEvent, RelayError, TranscriptEvent, TranscriptionOptions};

/// A persistent duplex connection to the streaming transcription endpoint.
///
/// `open` yields a receiver of typed events in vendor arrival order;
/// `finish` is the explicit end-of-stream signal that makes the vendor
/// flush pending transcripts and close.
#[async_trait]
pub trait StreamingConnection: Send {
    async fn open(
        &mut self,
        options: &TranscriptionOptions,
    ) -> Result<mpsc::UnboundedReceiver<ConnectionEvent>, RelayError>;

    async fn send_audio(&mut self, chunk: Vec<u8>) -> Result<(), RelayError>;

    async fn finish(&mut self) -> Result<(), RelayError>;
}

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

#[derive(Debug, Clone)]
pub struct WsConnectionConfig {
    pub stream_url: String,
    pub api_key: String,
    pub connect_timeout: Duration,
}

/// WebSocket implementation of [`StreamingConnection`].
pub struct WsConnection {
    config: WsConnectionConfig,
    sink: Option<WsSink>,
    reader: Option<tokio::task::JoinHandle<()>>,
}

impl WsConnection {
    pub fn new(config: WsConnectionConfig) -> Self {
        Self {
            config,
            sink: None,
            reader: None,
        }
    }

    fn request_url(&self, options: &TranscriptionOptions) -> Result<String, RelayError> {
        let url = reqwest::Url::parse_with_params(
            &self.config.stream_url,
            options.streaming_params(),
        )
        .map_err(|e| {
            RelayError::ConnectFailed(format!(
                "invalid streaming URL {}: {e}",
                self.config.stream_url
            ))
        })?;
        Ok(url.to_string())
    }
}

#[async_trait]
impl StreamingConnection for WsConnection {
    async fn open(
        &mut self,
        options: &TranscriptionOptions,
    ) -> Result<mpsc::UnboundedReceiver<ConnectionEvent>, RelayError> {
        let url = self.request_url(options)?;

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| RelayError::ConnectFailed(e.to_string()))?;
        let auth = HeaderValue::from_str(&format!("Token {}", self.config.api_key))
            .map_err(|e| RelayError::ConnectFailed(format!("invalid API key header: {e}")))?;
        request.headers_mut().insert("Authorization", auth);

        let (stream, _) = tokio::time::timeout(self.config.connect_timeout, connect_async(request))
            .await
            .map_err(|_| {
                RelayError::ConnectFailed("timed out opening streaming connection".to_string())
            })?
            .map_err(|e| RelayError::ConnectFailed(e.to_string()))?;

        tracing::info!(url = %self.config.stream_url, "streaming connection open");

        let (sink, source) = stream.split();
        self.sink = Some(sink);

        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(ConnectionEvent::Opened);
        self.reader = Some(tokio::spawn(read_events(source, tx)));

        Ok(rx)
    }

    async fn send_audio(&mut self, chunk: Vec<u8>) -> Result<(), RelayError> {
        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| RelayError::SendFailed("connection not open".to_string()))?;
        sink.send(Message::Binary(chunk.into()))
            .await
            .map_err(|e| RelayError::SendFailed(e.to_string()))
    }

    async fn finish(&mut self) -> Result<(), RelayError> {
        let sink = match self.sink.as_mut() {
            Some(sink) => sink,
            // Already gone; nothing left to signal.
            None => return Ok(()),
        };
        sink.send(Message::Text(
            r#"{"type":"CloseStream"}"#.to_string().into(),
        ))
        .await
        .map_err(|e| RelayError::SendFailed(e.to_string()))?;
        sink.flush()
            .await
            .map_err(|e| RelayError::SendFailed(e.to_string()))
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

/// Reader half: decode vendor frames into typed events until the socket
/// closes, preserving arrival order through the unbounded channel.
async fn read_events(mut source: WsSource, tx: mpsc::UnboundedSender<ConnectionEvent>) {
    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                if let Some(event) = parse_transcript_frame(text.as_str()) {
                    if tx.send(ConnectionEvent::Transcript(event)).is_err() {
                        return;
                    }
                }
            }
            Ok(Message::Close(frame)) => {
                let code = frame.map(|f| u16::from(f.code));
                let _ = tx.send(ConnectionEvent::Closed(code));
                return;
            }
            Ok(_) => {
                // Binary, ping and pong frames carry no transcript data.
            }
            Err(e) => {
                tracing::warn!("streaming connection read failed: {e}");
                let _ = tx.send(ConnectionEvent::Closed(None));
                return;
            }
        }
    }
    let _ = tx.send(ConnectionEvent::Closed(None));
}

#[derive(Deserialize)]
struct ResultFrame {
    channel: FrameChannel,
    #[serde(default)]
    is_final: bool,
    #[serde(default)]
    start: f64,
    #[serde(default)]
    duration: f64,
}

#[derive(Deserialize)]
struct FrameChannel {
    alternatives: Vec<FrameAlternative>,
}

#[derive(Deserialize)]
struct FrameAlternative {
    transcript: String,
}

/// Decode one text frame into a transcript event. Frames without a
/// channel/alternatives shape (metadata, speech markers) are skipped.
fn parse_transcript_frame(text: &str) -> Option<TranscriptEvent> {
    let frame: ResultFrame = serde_json::from_str(text).ok()?;
    let alternative = frame.channel.alternatives.into_iter().next()?;
    Some(TranscriptEvent {
        transcript: alternative.transcript,
        is_final: frame.is_final,
        start: frame.start,
        duration: frame.duration,
    })
}
