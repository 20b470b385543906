use crate::byte_stream::AudioByteStream;
use crate::connection::StreamingConnection;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use voxrelay_core::{ConnectionEvent, RelayError, RelayState, StreamSummary, TranscriptionOptions};

const DEFAULT_CLOSE_ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Cooperative cancellation shared between the caller and the byte pump.
/// The pump reads it at chunk boundaries only; a chunk in flight is never
/// interrupted.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Relay between a remote audio byte stream and the streaming
/// transcription connection.
///
/// One background task pumps bytes, in order, into the connection; the
/// foreground forwards transcript events to the caller strictly in
/// vendor arrival order. End-of-stream is signalled to the connection
/// exactly once per session.
pub struct StreamingRelay<C> {
    connection: C,
    cancel: CancelFlag,
    close_ack_timeout: Duration,
    state_tx: Arc<watch::Sender<RelayState>>,
    state_rx: watch::Receiver<RelayState>,
}

impl<C> StreamingRelay<C>
where
    C: StreamingConnection + 'static,
{
    pub fn new(connection: C) -> Self {
        let (state_tx, state_rx) = watch::channel(RelayState::Idle);
        Self {
            connection,
            cancel: CancelFlag::new(),
            close_ack_timeout: DEFAULT_CLOSE_ACK_TIMEOUT,
            state_tx: Arc::new(state_tx),
            state_rx,
        }
    }

    /// Bound on the wait for the connection's close acknowledgment after
    /// end-of-stream has been signalled.
    pub fn with_close_ack_timeout(mut self, timeout: Duration) -> Self {
        self.close_ack_timeout = timeout;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn state(&self) -> RelayState {
        *self.state_rx.borrow()
    }

    /// Watch relay state transitions. The receiver stays readable after
    /// the run completes.
    pub fn state_watch(&self) -> watch::Receiver<RelayState> {
        self.state_rx.clone()
    }

    /// Run the relay to completion. Consumes the relay: one session per
    /// connection.
    ///
    /// If the connection cannot be opened the byte pump is never started
    /// and the error is returned immediately.
    pub async fn run<S>(
        self,
        source: S,
        options: &TranscriptionOptions,
        events: mpsc::UnboundedSender<ConnectionEvent>,
    ) -> Result<StreamSummary, RelayError>
    where
        S: AudioByteStream + 'static,
    {
        let StreamingRelay {
            mut connection,
            cancel,
            close_ack_timeout,
            state_tx,
            state_rx,
        } = self;

        set_state(&state_tx, RelayState::Connecting);
        let mut conn_events = match connection.open(options).await {
            Ok(rx) => rx,
            Err(e) => {
                set_state(&state_tx, RelayState::Failed);
                return Err(e);
            }
        };
        set_state(&state_tx, RelayState::Streaming);

        let mut pump = tokio::spawn(pump_audio(
            connection,
            source,
            cancel.clone(),
            Arc::clone(&state_tx),
        ));

        let mut events_forwarded = 0usize;
        let mut saw_close = false;
        let mut pump_outcome: Option<PumpOutcome<C>> = None;

        while !saw_close {
            if pump_outcome.is_none() {
                tokio::select! {
                    result = &mut pump => {
                        pump_outcome = Some(result.unwrap_or_else(|e| {
                            set_state(&state_tx, RelayState::Failed);
                            PumpOutcome {
                                connection: None,
                                chunks_pumped: 0,
                                error: Some(RelayError::SendFailed(format!(
                                    "byte pump task failed: {e}"
                                ))),
                            }
                        }));
                    }
                    event = conn_events.recv() => {
                        saw_close = forward_event(event, &events, &mut events_forwarded);
                    }
                }
            } else {
                // End-of-stream has been signalled; wait a bounded interval
                // for the close acknowledgment.
                match tokio::time::timeout(close_ack_timeout, conn_events.recv()).await {
                    Ok(event) => {
                        saw_close = forward_event(event, &events, &mut events_forwarded);
                    }
                    Err(_) => {
                        tracing::warn!("timed out waiting for close acknowledgment");
                        break;
                    }
                }
            }
        }

        let outcome = match pump_outcome {
            Some(outcome) => outcome,
            // The connection closed while the pump was still running;
            // the pump unblocks on its next send and returns.
            None => pump.await.unwrap_or_else(|e| PumpOutcome {
                connection: None,
                chunks_pumped: 0,
                error: Some(RelayError::SendFailed(format!("byte pump task failed: {e}"))),
            }),
        };
        // The connection stays alive until the event stream has drained.
        drop(outcome.connection);

        let final_state = if *state_rx.borrow() == RelayState::Failed || outcome.error.is_some() {
            RelayState::Failed
        } else {
            RelayState::Closed
        };
        set_state(&state_tx, final_state);

        if let Some(e) = outcome.error {
            return Err(e);
        }

        Ok(StreamSummary {
            chunks_pumped: outcome.chunks_pumped,
            events_forwarded,
            cancelled: cancel.is_cancelled(),
            final_state,
        })
    }
}

/// Forward one connection event to the caller. Returns `true` when the
/// stream of events is over (close frame or channel end).
fn forward_event(
    event: Option<ConnectionEvent>,
    events: &mpsc::UnboundedSender<ConnectionEvent>,
    forwarded: &mut usize,
) -> bool {
    match event {
        Some(event) => {
            let closed = matches!(event, ConnectionEvent::Closed(_));
            if events.send(event).is_ok() {
                *forwarded += 1;
            }
            closed
        }
        None => true,
    }
}

struct PumpOutcome<C> {
    connection: Option<C>,
    chunks_pumped: usize,
    error: Option<RelayError>,
}

/// The byte pump: read chunks in order and relay them into the
/// connection, checking the cancellation flag between chunks. No matter
/// how the pump ends, the end-of-stream signal is attempted exactly once.
async fn pump_audio<C, S>(
    mut connection: C,
    mut source: S,
    cancel: CancelFlag,
    state: Arc<watch::Sender<RelayState>>,
) -> PumpOutcome<C>
where
    C: StreamingConnection,
    S: AudioByteStream,
{
    let mut chunks_pumped = 0usize;
    let mut finish_sent = false;
    let mut error = None;

    loop {
        if cancel.is_cancelled() {
            tracing::info!(chunks_pumped, "cancellation requested, finishing stream");
            set_state(&state, RelayState::Finishing);
            if let Err(e) = finish_once(&mut connection, &mut finish_sent).await {
                set_state(&state, RelayState::Failed);
                error = Some(e);
            }
            break;
        }

        match source.next_chunk().await {
            Ok(Some(chunk)) => {
                if let Err(e) = connection.send_audio(chunk).await {
                    // Still signal end-of-stream so the vendor side
                    // does not hang waiting for more audio.
                    let _ = finish_once(&mut connection, &mut finish_sent).await;
                    set_state(&state, RelayState::Failed);
                    error = Some(e);
                    break;
                }
                chunks_pumped += 1;
            }
            Ok(None) => {
                tracing::debug!(chunks_pumped, "audio source exhausted");
                set_state(&state, RelayState::Finishing);
                if let Err(e) = finish_once(&mut connection, &mut finish_sent).await {
                    set_state(&state, RelayState::Failed);
                    error = Some(e);
                }
                break;
            }
            Err(e) => {
                let _ = finish_once(&mut connection, &mut finish_sent).await;
                set_state(&state, RelayState::Failed);
                error = Some(e);
                break;
            }
        }
    }

    PumpOutcome {
        connection: Some(connection),
        chunks_pumped,
        error,
    }
}

async fn finish_once<C: StreamingConnection>(
    connection: &mut C,
    finish_sent: &mut bool,
) -> Result<(), RelayError> {
    if *finish_sent {
        return Ok(());
    }
    // Marked before the attempt: the signal is sent at most once even
    // when the attempt itself fails.
    *finish_sent = true;
    connection.finish().await
}

fn set_state(state: &watch::Sender<RelayState>, value: RelayState) {
    tracing::debug!(state = ?value, "relay state");
    let _ = state.send(value);
}
