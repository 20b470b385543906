use sha2::{Digest, Sha256};
use voxrelay_core::{ResolvedSource, TranscriptionOptions};

/// Deterministic digest of one prerecorded request descriptor: the source
/// (URL, or buffer contents plus content type) and the full ordered
/// parameter projection of the configuration record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey([u8; 32]);

impl RequestKey {
    pub fn compute(source: &ResolvedSource, options: &TranscriptionOptions) -> Self {
        let mut hasher = Sha256::new();
        match source {
            ResolvedSource::Url(url) => {
                hasher.update(b"url\0");
                hasher.update(url.as_bytes());
            }
            ResolvedSource::Buffer { data, mimetype } => {
                hasher.update(b"buffer\0");
                hasher.update(Sha256::digest(data));
                if let Some(mimetype) = mimetype {
                    hasher.update(mimetype.as_bytes());
                }
            }
        }
        hasher.update(b"\0");
        for (key, value) in options.prerecorded_params() {
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
            hasher.update(b"&");
        }
        Self(hasher.finalize().into())
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}
