use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use voxrelay_core::SourceError;

/// Pulls the audio track out of a video-hosting link and leaves it as a
/// local file. The caller owns the returned file and removes it once the
/// bytes are read.
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    async fn extract_audio(&self, url: &str) -> Result<PathBuf, SourceError>;
}

/// Extractor backed by an external `yt-dlp` binary.
///
/// Downloads audio-only, converts to mp3, and reports the final file path
/// on stdout via `--print after_move:filepath`.
#[derive(Debug)]
pub struct YtDlpExtractor {
    binary: PathBuf,
    output_dir: PathBuf,
}

impl YtDlpExtractor {
    pub fn new(binary: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            output_dir: output_dir.into(),
        }
    }

    fn output_template(&self) -> String {
        self.output_dir
            .join("voxrelay-%(id)s.%(ext)s")
            .to_string_lossy()
            .into_owned()
    }
}

impl Default for YtDlpExtractor {
    fn default() -> Self {
        Self::new("yt-dlp", std::env::temp_dir())
    }
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    async fn extract_audio(&self, url: &str) -> Result<PathBuf, SourceError> {
        tracing::info!(url = %url, "extracting audio track");

        let output = Command::new(&self.binary)
            .arg("--no-simulate")
            .arg("--print")
            .arg("after_move:filepath")
            .arg("-x")
            .arg("--audio-format")
            .arg("mp3")
            .arg("-o")
            .arg(self.output_template())
            .arg(url)
            .output()
            .await
            .map_err(|e| {
                SourceError::ExtractionFailed(format!(
                    "failed to run {}: {e}",
                    self.binary.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SourceError::ExtractionFailed(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                output.status,
                stderr.trim(),
            )));
        }

        let path = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
        if path.as_os_str().is_empty() || !path.exists() {
            return Err(SourceError::ExtractionFailed(format!(
                "extractor reported no output file for {url}"
            )));
        }

        tracing::debug!(path = %path.display(), "audio track extracted");
        Ok(path)
    }
}
