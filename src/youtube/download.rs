use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::instrument;

use super::VideoId;
use crate::{ProcessorError, Result};

/// The only rendition the downloader will fetch
pub const VIDEO_HEIGHT: u32 = 360;

/// Fetches a playable rendition of a video to local storage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoDownloader: Send + Sync {
    /// Download the 360p stream of `video_id` into `dir` and return the file path
    async fn download(&self, video_id: &VideoId, dir: &Path) -> Result<PathBuf>;
}

/// Downloader backed by yt-dlp
pub struct YtDlpDownloader {
    yt_dlp_path: String,
}

impl YtDlpDownloader {
    pub fn new(yt_dlp_path: impl Into<String>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
        }
    }

    /// Format selector for a single progressive stream at exactly 360p
    fn format_selector() -> String {
        format!("best[height={}]", VIDEO_HEIGHT)
    }
}

#[async_trait]
impl VideoDownloader for YtDlpDownloader {
    #[instrument(skip(self, video_id, dir), fields(video_id = %video_id))]
    async fn download(&self, video_id: &VideoId, dir: &Path) -> Result<PathBuf> {
        let output_template = dir.join(format!("{}.%(ext)s", video_id));

        tracing::info!("Downloading {}p stream to: {}", VIDEO_HEIGHT, dir.display());

        let output = Command::new(&self.yt_dlp_path)
            .arg("--format")
            .arg(Self::format_selector())
            .arg("--no-playlist")
            .arg("--no-part")
            .arg("--force-overwrites")
            .arg("--print")
            .arg("after_move:filepath")
            .arg("--output")
            .arg(&output_template)
            .arg(video_id.watch_url())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ProcessorError::Download(format!("failed to run {}: {}", self.yt_dlp_path, e)))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            if error.contains("Requested format is not available") {
                return Err(ProcessorError::Download(format!(
                    "No {}p stream available for video {}",
                    VIDEO_HEIGHT, video_id
                )));
            }
            return Err(ProcessorError::Download(error.trim().to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let path = stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .map(PathBuf::from)
            .ok_or_else(|| ProcessorError::Download("yt-dlp did not report an output file".to_string()))?;

        if !path.is_file() {
            return Err(ProcessorError::Download(format!(
                "downloaded file is missing: {}",
                path.display()
            )));
        }

        tracing::debug!("Video saved to: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_selector_is_fixed() {
        assert_eq!(YtDlpDownloader::format_selector(), "best[height=360]");
    }

    #[tokio::test]
    async fn test_missing_binary_is_download_error() {
        let downloader = YtDlpDownloader::new("/nonexistent/yt-dlp");
        let dir = tempfile::tempdir().unwrap();
        let id = crate::resolve_video_id("dQw4w9WgXcQ").unwrap();

        let err = downloader.download(&id, dir.path()).await.unwrap_err();
        assert!(matches!(err, ProcessorError::Download(_)));
    }
}
