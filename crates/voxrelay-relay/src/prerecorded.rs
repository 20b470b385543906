use crate::cache::RequestKey;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use voxrelay_core::{RelayError, ResolvedSource, TranscriptionOptions};

/// The vendor's prerecorded endpoint takes either a remote URL or a raw
/// byte buffer, through two distinct calls.
#[async_trait]
pub trait PrerecordedBackend: Send + Sync {
    async fn transcribe_url(
        &self,
        url: &str,
        options: &TranscriptionOptions,
    ) -> Result<Value, RelayError>;

    async fn transcribe_buffer(
        &self,
        data: &[u8],
        mimetype: Option<&str>,
        options: &TranscriptionOptions,
    ) -> Result<Value, RelayError>;
}

#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    pub base_url: String,
    pub api_key: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

/// Backend speaking the vendor's HTTP API. Timeouts live entirely in the
/// underlying client; there is no retry layer.
pub struct HttpBackend {
    client: reqwest::Client,
    config: HttpBackendConfig,
}

impl HttpBackend {
    pub fn new(config: HttpBackendConfig) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RelayError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/listen", self.config.base_url.trim_end_matches('/'))
    }

    async fn read_response(response: reqwest::Response) -> Result<Value, RelayError> {
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            let preview: String = body.chars().take(200).collect();
            return Err(RelayError::Protocol(format!("{status}: {preview}")));
        }
        serde_json::from_str(&body)
            .map_err(|e| RelayError::Protocol(format!("invalid JSON response: {e}")))
    }
}

#[async_trait]
impl PrerecordedBackend for HttpBackend {
    async fn transcribe_url(
        &self,
        url: &str,
        options: &TranscriptionOptions,
    ) -> Result<Value, RelayError> {
        tracing::debug!(url = %url, "prerecorded transcription request (url)");
        let response = self
            .client
            .post(self.endpoint())
            .query(&options.prerecorded_params())
            .header("Authorization", format!("Token {}", self.config.api_key))
            .json(&serde_json::json!({ "url": url }))
            .send()
            .await
            .map_err(transport_error)?;
        Self::read_response(response).await
    }

    async fn transcribe_buffer(
        &self,
        data: &[u8],
        mimetype: Option<&str>,
        options: &TranscriptionOptions,
    ) -> Result<Value, RelayError> {
        tracing::debug!(bytes = data.len(), "prerecorded transcription request (buffer)");
        let response = self
            .client
            .post(self.endpoint())
            .query(&options.prerecorded_params())
            .header("Authorization", format!("Token {}", self.config.api_key))
            .header(
                "Content-Type",
                mimetype.unwrap_or("application/octet-stream"),
            )
            .body(data.to_vec())
            .send()
            .await
            .map_err(transport_error)?;
        Self::read_response(response).await
    }
}

/// Classify a transport failure: timeouts get their own variant so the
/// boundary can suggest retrying with a smaller source.
pub(crate) fn transport_error(e: reqwest::Error) -> RelayError {
    if e.is_timeout() {
        RelayError::Timeout(e.to_string())
    } else {
        RelayError::Network(e.to_string())
    }
}

/// Result of one prerecorded relay call.
#[derive(Debug, Clone)]
pub struct PrerecordedOutcome {
    pub response: Value,
    pub from_cache: bool,
}

/// Request/response relay to the prerecorded endpoint, memoizing on the
/// full request descriptor so an identical (source, configuration) pair
/// never hits the network twice.
pub struct PrerecordedRelay<B> {
    backend: B,
    cache: Mutex<HashMap<RequestKey, Value>>,
}

impl<B: PrerecordedBackend> PrerecordedRelay<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn transcribe(
        &self,
        source: &ResolvedSource,
        options: &TranscriptionOptions,
    ) -> Result<PrerecordedOutcome, RelayError> {
        let key = RequestKey::compute(source, options);

        if let Some(hit) = self.cache.lock().await.get(&key) {
            tracing::debug!(key = %key.to_hex(), "serving prerecorded result from cache");
            return Ok(PrerecordedOutcome {
                response: hit.clone(),
                from_cache: true,
            });
        }

        let response = match source {
            ResolvedSource::Url(url) => self.backend.transcribe_url(url, options).await?,
            ResolvedSource::Buffer { data, mimetype } => {
                self.backend
                    .transcribe_buffer(data, mimetype.as_deref(), options)
                    .await?
            }
        };

        self.cache.lock().await.insert(key, response.clone());
        Ok(PrerecordedOutcome {
            response,
            from_cache: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingBackend {
        url_calls: AtomicUsize,
        buffer_calls: AtomicUsize,
        fail: bool,
    }

    impl CountingBackend {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl PrerecordedBackend for CountingBackend {
        async fn transcribe_url(
            &self,
            url: &str,
            _options: &TranscriptionOptions,
        ) -> Result<Value, RelayError> {
            self.url_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RelayError::Network("boom".to_string()));
            }
            Ok(serde_json::json!({ "method": "url", "source": url }))
        }

        async fn transcribe_buffer(
            &self,
            data: &[u8],
            _mimetype: Option<&str>,
            _options: &TranscriptionOptions,
        ) -> Result<Value, RelayError> {
            self.buffer_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RelayError::Network("boom".to_string()));
            }
            Ok(serde_json::json!({ "method": "buffer", "bytes": data.len() }))
        }
    }

    fn options() -> TranscriptionOptions {
        voxrelay_core::OptionToggles {
            model: Some("nova-2-ea".to_string()),
            punctuate: Some(true),
            ..Default::default()
        }
        .assemble(voxrelay_core::TranscriptionMode::Prerecorded)
    }

    fn url_source() -> ResolvedSource {
        ResolvedSource::Url("https://example.com/a.wav".to_string())
    }

    fn buffer_source() -> ResolvedSource {
        ResolvedSource::Buffer {
            data: vec![0u8; 64],
            mimetype: Some("audio/wav".to_string()),
        }
    }

    #[tokio::test]
    async fn test_url_source_issues_url_request() {
        let relay = PrerecordedRelay::new(CountingBackend::default());
        let outcome = relay.transcribe(&url_source(), &options()).await.unwrap();
        assert_eq!(outcome.response["method"], "url");
        assert_eq!(relay.backend.url_calls.load(Ordering::SeqCst), 1);
        assert_eq!(relay.backend.buffer_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_buffer_source_issues_buffer_request() {
        let relay = PrerecordedRelay::new(CountingBackend::default());
        let outcome = relay
            .transcribe(&buffer_source(), &options())
            .await
            .unwrap();
        assert_eq!(outcome.response["method"], "buffer");
        assert_eq!(relay.backend.url_calls.load(Ordering::SeqCst), 0);
        assert_eq!(relay.backend.buffer_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_identical_request_served_from_cache() {
        let relay = PrerecordedRelay::new(CountingBackend::default());

        let first = relay.transcribe(&url_source(), &options()).await.unwrap();
        assert!(!first.from_cache);

        let second = relay.transcribe(&url_source(), &options()).await.unwrap();
        assert!(second.from_cache);
        assert_eq!(first.response, second.response);
        // The second call never reached the backend.
        assert_eq!(relay.backend.url_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_changed_options_miss_cache() {
        let relay = PrerecordedRelay::new(CountingBackend::default());
        relay.transcribe(&url_source(), &options()).await.unwrap();

        let mut changed = options();
        changed.diarize = !changed.diarize;
        let outcome = relay.transcribe(&url_source(), &changed).await.unwrap();
        assert!(!outcome.from_cache);
        assert_eq!(relay.backend.url_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_changed_source_misses_cache() {
        let relay = PrerecordedRelay::new(CountingBackend::default());
        relay.transcribe(&url_source(), &options()).await.unwrap();
        relay
            .transcribe(&buffer_source(), &options())
            .await
            .unwrap();
        assert_eq!(relay.backend.url_calls.load(Ordering::SeqCst), 1);
        assert_eq!(relay.backend.buffer_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let relay = PrerecordedRelay::new(CountingBackend::failing());
        assert!(relay.transcribe(&url_source(), &options()).await.is_err());
        assert!(relay.transcribe(&url_source(), &options()).await.is_err());
        // Both attempts reached the backend; errors never enter the cache.
        assert_eq!(relay.backend.url_calls.load(Ordering::SeqCst), 2);
    }
}
