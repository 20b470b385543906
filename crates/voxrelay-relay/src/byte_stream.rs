use crate::prerecorded::transport_error;
use async_trait::async_trait;
use voxrelay_core::RelayError;

/// Ordered pull of raw audio bytes feeding the streaming relay.
/// `Ok(None)` is end-of-stream.
#[async_trait]
pub trait AudioByteStream: Send {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, RelayError>;
}

/// Chunked read of a remote audio URL over HTTP. Chunk boundaries are
/// whatever the transport delivers.
pub struct HttpByteStream {
    response: reqwest::Response,
}

impl HttpByteStream {
    pub async fn open(client: &reqwest::Client, url: &str) -> Result<Self, RelayError> {
        let response = client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?
            .error_for_status()
            .map_err(transport_error)?;
        tracing::debug!(url = %url, "audio byte stream open");
        Ok(Self { response })
    }
}

#[async_trait]
impl AudioByteStream for HttpByteStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, RelayError> {
        match self.response.chunk().await {
            Ok(Some(bytes)) => Ok(Some(bytes.to_vec())),
            Ok(None) => Ok(None),
            Err(e) => Err(transport_error(e)),
        }
    }
}
