use crate::extract::MediaExtractor;
use std::path::Path;
use voxrelay_core::{ResolvedSource, SourceError, SourceSpec};

/// Resolve a user-facing source description into what the relay consumes:
/// a remote URL or an in-memory byte buffer. Local files are read to
/// bytes; video-hosting links go through the extractor and the transient
/// file is removed once read.
pub async fn resolve(
    spec: SourceSpec,
    extractor: &dyn MediaExtractor,
) -> Result<ResolvedSource, SourceError> {
    match spec {
        SourceSpec::SampleFile(path) | SourceSpec::UploadedFile(path) => {
            let mimetype = guess_mimetype(&path);
            let data = tokio::fs::read(&path).await?;
            if data.is_empty() {
                return Err(SourceError::EmptyBuffer);
            }
            Ok(ResolvedSource::Buffer { data, mimetype })
        }
        SourceSpec::RecordedBuffer { data, mimetype } => {
            if data.is_empty() {
                return Err(SourceError::EmptyBuffer);
            }
            Ok(ResolvedSource::Buffer { data, mimetype })
        }
        SourceSpec::RemoteUrl(url) => {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(SourceError::UnsupportedScheme(url));
            }
            Ok(ResolvedSource::Url(url))
        }
        SourceSpec::VideoLink(url) => {
            let path = extractor.extract_audio(&url).await?;
            let mimetype = guess_mimetype(&path);
            let data = tokio::fs::read(&path).await?;
            // The extraction is transient; clean it up in place.
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::warn!(path = %path.display(), "failed to remove extracted file: {e}");
            }
            if data.is_empty() {
                return Err(SourceError::EmptyBuffer);
            }
            Ok(ResolvedSource::Buffer { data, mimetype })
        }
    }
}

/// Content type guessed from the file extension, the way the original
/// upload surface reported it.
pub fn guess_mimetype(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mimetype = match ext.as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "flac" => "audio/flac",
        "ogg" | "opus" => "audio/ogg",
        "m4a" | "mp4" => "audio/mp4",
        "webm" => "audio/webm",
        "aac" => "audio/aac",
        _ => return None,
    };
    Some(mimetype.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeExtractor {
        dir: PathBuf,
        contents: Vec<u8>,
        calls: AtomicUsize,
    }

    impl FakeExtractor {
        fn new(dir: PathBuf, contents: Vec<u8>) -> Self {
            Self {
                dir,
                contents,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MediaExtractor for FakeExtractor {
        async fn extract_audio(&self, _url: &str) -> Result<PathBuf, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let path = self.dir.join("voxrelay-fake.mp3");
            tokio::fs::write(&path, &self.contents).await?;
            Ok(path)
        }
    }

    struct PanicExtractor;

    #[async_trait]
    impl MediaExtractor for PanicExtractor {
        async fn extract_audio(&self, _url: &str) -> Result<PathBuf, SourceError> {
            panic!("extractor must not be called for this source");
        }
    }

    #[tokio::test]
    async fn test_resolve_uploaded_file_reads_bytes() {
        let dir = std::env::temp_dir().join("voxrelay_resolve_upload");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("clip.wav");
        std::fs::write(&path, b"RIFFfake").unwrap();

        let resolved = resolve(SourceSpec::UploadedFile(path), &PanicExtractor)
            .await
            .unwrap();
        match resolved {
            ResolvedSource::Buffer { data, mimetype } => {
                assert_eq!(data, b"RIFFfake");
                assert_eq!(mimetype.as_deref(), Some("audio/wav"));
            }
            other => panic!("expected buffer, got {other:?}"),
        }

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_resolve_missing_file_fails() {
        let result = resolve(
            SourceSpec::UploadedFile(PathBuf::from("/nonexistent/clip.wav")),
            &PanicExtractor,
        )
        .await;
        match result {
            Err(SourceError::FileRead(_)) => {}
            other => panic!("expected FileRead, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resolve_recorded_buffer_passthrough() {
        let resolved = resolve(
            SourceSpec::RecordedBuffer {
                data: vec![1, 2, 3],
                mimetype: Some("audio/wav".to_string()),
            },
            &PanicExtractor,
        )
        .await
        .unwrap();
        assert_eq!(
            resolved,
            ResolvedSource::Buffer {
                data: vec![1, 2, 3],
                mimetype: Some("audio/wav".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_resolve_empty_recorded_buffer_fails() {
        let result = resolve(
            SourceSpec::RecordedBuffer {
                data: Vec::new(),
                mimetype: None,
            },
            &PanicExtractor,
        )
        .await;
        match result {
            Err(SourceError::EmptyBuffer) => {}
            other => panic!("expected EmptyBuffer, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resolve_remote_url_passthrough() {
        let resolved = resolve(
            SourceSpec::RemoteUrl("https://example.com/a.wav".to_string()),
            &PanicExtractor,
        )
        .await
        .unwrap();
        assert_eq!(
            resolved,
            ResolvedSource::Url("https://example.com/a.wav".to_string())
        );
    }

    #[tokio::test]
    async fn test_resolve_rejects_non_http_scheme() {
        let result = resolve(
            SourceSpec::RemoteUrl("ftp://example.com/a.wav".to_string()),
            &PanicExtractor,
        )
        .await;
        match result {
            Err(SourceError::UnsupportedScheme(url)) => assert!(url.starts_with("ftp://")),
            other => panic!("expected UnsupportedScheme, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resolve_video_link_extracts_and_cleans_up() {
        let dir = std::env::temp_dir().join("voxrelay_resolve_video");
        std::fs::create_dir_all(&dir).unwrap();
        let extractor = FakeExtractor::new(dir.clone(), b"mp3bytes".to_vec());

        let resolved = resolve(
            SourceSpec::VideoLink("https://video.example.com/watch?v=abc".to_string()),
            &extractor,
        )
        .await
        .unwrap();

        match resolved {
            ResolvedSource::Buffer { data, mimetype } => {
                assert_eq!(data, b"mp3bytes");
                assert_eq!(mimetype.as_deref(), Some("audio/mpeg"));
            }
            other => panic!("expected buffer, got {other:?}"),
        }
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
        // The transient extraction must be gone after resolution.
        assert!(!dir.join("voxrelay-fake.mp3").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_guess_mimetype_known_extensions() {
        assert_eq!(
            guess_mimetype(Path::new("a.WAV")).as_deref(),
            Some("audio/wav")
        );
        assert_eq!(
            guess_mimetype(Path::new("a.mp3")).as_deref(),
            Some("audio/mpeg")
        );
        assert_eq!(
            guess_mimetype(Path::new("a.flac")).as_deref(),
            Some("audio/flac")
        );
        assert_eq!(
            guess_mimetype(Path::new("a.webm")).as_deref(),
            Some("audio/webm")
        );
    }

    #[test]
    fn test_guess_mimetype_unknown_extension() {
        assert_eq!(guess_mimetype(Path::new("a.xyz")), None);
        assert_eq!(guess_mimetype(Path::new("noext")), None);
    }
}
