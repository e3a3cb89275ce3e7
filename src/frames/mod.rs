use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::{ProcessorError, Result};

/// Extension of every captured frame
pub const FRAME_FILE_EXTENSION: &str = "jpg";

/// Decodes single still frames out of a local video file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FrameDecoder: Send + Sync {
    /// Seek to `offset_ms` and write the nearest decodable frame to `output`.
    ///
    /// Returns `Ok(false)` when no frame could be decoded at that offset and
    /// `Err` only when the decoder itself could not be run.
    async fn capture(&self, video: &Path, offset_ms: u64, output: &Path) -> Result<bool>;
}

/// A frame written to disk for one timestamp
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapturedFrame {
    /// Position of the timestamp in the requested list
    pub item: usize,

    /// Requested timestamp in seconds
    pub timestamp: f64,

    /// Requested timestamp in whole milliseconds
    pub start: i64,

    /// Local path of the JPEG
    pub frame_path: PathBuf,
}

/// Outcome of a frame extraction run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameExtraction {
    pub captured: Vec<CapturedFrame>,

    /// Items for which no frame could be decoded
    pub missing: Vec<usize>,
}

/// Capture one frame per timestamp into `frames_dir/{item}.jpg`.
///
/// Timestamps without a decodable frame are listed in `missing` and left out of `captured`.
pub async fn extract_frames(
    decoder: &dyn FrameDecoder,
    video: &Path,
    timestamps: &[f64],
    frames_dir: &Path,
) -> Result<FrameExtraction> {
    fs_err::create_dir_all(frames_dir).map_err(|e| ProcessorError::Decode(e.to_string()))?;

    let mut extraction = FrameExtraction::default();

    for (item, &timestamp) in timestamps.iter().enumerate() {
        let offset_ms = (timestamp.max(0.0) * 1000.0) as u64;
        let frame_path = frames_dir.join(format!("{}.{}", item, FRAME_FILE_EXTENSION));

        if decoder.capture(video, offset_ms, &frame_path).await? {
            extraction.captured.push(CapturedFrame {
                item,
                timestamp,
                start: offset_ms as i64,
                frame_path,
            });
        } else {
            tracing::warn!("No frame decoded at {}ms (item {}), skipping", offset_ms, item);
            extraction.missing.push(item);
        }
    }

    tracing::info!(
        "Captured {} of {} frames",
        extraction.captured.len(),
        timestamps.len()
    );

    Ok(extraction)
}

/// Frame decoder driving the ffmpeg binary
pub struct FfmpegFrameDecoder {
    ffmpeg_path: String,
}

impl FfmpegFrameDecoder {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    /// ffmpeg seek argument with millisecond precision
    fn seek_arg(offset_ms: u64) -> String {
        format!("{}.{:03}", offset_ms / 1000, offset_ms % 1000)
    }
}

#[async_trait]
impl FrameDecoder for FfmpegFrameDecoder {
    async fn capture(&self, video: &Path, offset_ms: u64, output: &Path) -> Result<bool> {
        tracing::debug!("Capturing frame at {}ms from {}", offset_ms, video.display());

        // a frame left by an earlier run must not count as a capture
        match fs_err::remove_file(output) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(ProcessorError::Decode(e.to_string())),
        }

        let result = Command::new(&self.ffmpeg_path)
            .args(["-v", "error", "-y", "-ss", &Self::seek_arg(offset_ms), "-i"])
            .arg(video)
            .args(["-frames:v", "1", "-q:v", "2"])
            .arg(output)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ProcessorError::Decode(format!("failed to run {}: {}", self.ffmpeg_path, e)))?;

        if !result.status.success() {
            tracing::debug!(
                "ffmpeg could not decode frame: {}",
                String::from_utf8_lossy(&result.stderr).trim()
            );
            return Ok(false);
        }

        // past the end of the stream ffmpeg succeeds without writing anything
        let written = fs_err::metadata(output).map(|m| m.len() > 0).unwrap_or(false);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::*;

    #[test]
    fn test_seek_arg() {
        assert_eq!(FfmpegFrameDecoder::seek_arg(0), "0.000");
        assert_eq!(FfmpegFrameDecoder::seek_arg(1500), "1.500");
        assert_eq!(FfmpegFrameDecoder::seek_arg(61007), "61.007");
    }

    #[tokio::test]
    async fn test_extract_frames_records_missing_items() {
        let mut decoder = MockFrameDecoder::new();
        decoder
            .expect_capture()
            .with(always(), eq(30_000u64), always())
            .returning(|_, _, _| Ok(false));
        decoder
            .expect_capture()
            .with(always(), ne(30_000u64), always())
            .returning(|_, _, output| {
                std::fs::write(output, b"\xff\xd8\xff").unwrap();
                Ok(true)
            });

        let dir = tempfile::tempdir().unwrap();
        let extraction = extract_frames(&decoder, Path::new("video.mp4"), &[0.0, 30.0, 60.5], dir.path())
            .await
            .unwrap();

        assert_eq!(extraction.missing, vec![1]);
        assert_eq!(extraction.captured.len(), 2);
        assert_eq!(extraction.captured[0].item, 0);
        assert_eq!(extraction.captured[1].item, 2);
        assert_eq!(extraction.captured[1].start, 60_500);
        assert_eq!(extraction.captured[1].frame_path, dir.path().join("2.jpg"));
        assert!(extraction.captured[1].frame_path.exists());
    }

    #[tokio::test]
    async fn test_decoder_failure_aborts_extraction() {
        let mut decoder = MockFrameDecoder::new();
        decoder
            .expect_capture()
            .times(1)
            .returning(|_, _, _| Err(ProcessorError::Decode("ffmpeg not found".into())));

        let dir = tempfile::tempdir().unwrap();
        let err = extract_frames(&decoder, Path::new("video.mp4"), &[0.0, 1.0], dir.path())
            .await
            .unwrap_err();

        assert_eq!(err, ProcessorError::Decode("ffmpeg not found".into()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stale_frame_is_not_reported_as_captured() {
        // `true` exits 0 without writing anything, like ffmpeg past the end of a stream
        let decoder = FfmpegFrameDecoder::new("true");
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("0.jpg");
        std::fs::write(&stale, b"\xff\xd8\xff").unwrap();

        let extraction = extract_frames(&decoder, Path::new("video.mp4"), &[9999.0], dir.path())
            .await
            .unwrap();

        assert!(extraction.captured.is_empty());
        assert_eq!(extraction.missing, vec![0]);
        assert!(!stale.exists());
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_is_decode_error() {
        let decoder = FfmpegFrameDecoder::new("/nonexistent/ffmpeg");
        let dir = tempfile::tempdir().unwrap();

        let err = decoder
            .capture(Path::new("video.mp4"), 0, &dir.path().join("0.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessorError::Decode(_)));
    }
}
