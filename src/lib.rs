//! yt-processor - fetch YouTube transcripts and capture frames at caption timestamps
//!
//! This library resolves a video reference, fetches its captions, downloads a 360p
//! rendition, grabs one still per caption segment and publishes the frames and
//! records to an S3-compatible bucket and a PostgREST database. The same pipeline
//! is exposed through a CLI and a small HTTP API.

pub mod cli;
pub mod config;
pub mod frames;
pub mod output;
pub mod pipeline;
pub mod publish;
pub mod server;
pub mod utils;
pub mod youtube;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use pipeline::{ProcessResult, ProcessingPipeline};
pub use youtube::transcript::{Transcript, TranscriptSegment};
pub use youtube::{resolve_video_id, VideoId};

/// Result type used throughout the library
pub type Result<T, E = ProcessorError> = std::result::Result<T, E>;

/// Error types produced by the processing pipeline
///
/// Every variant carries the underlying message so it can be forwarded to callers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessorError {
    #[error("{0}")]
    Validation(String),

    #[error("Transcript fetch failed: {0}")]
    UpstreamFetch(String),

    #[error("Video download failed: {0}")]
    Download(String),

    #[error("Frame decoding failed: {0}")]
    Decode(String),

    #[error("Storage upload failed: {0}")]
    Storage(String),

    #[error("Database upsert failed: {0}")]
    Database(String),
}

impl ProcessorError {
    /// HTTP status code this error maps to
    pub fn status_code(&self) -> u16 {
        match self {
            ProcessorError::Validation(_) => 400,
            _ => 500,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ProcessorError::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ProcessorError::Validation("bad".into()).status_code(), 400);
        assert_eq!(ProcessorError::UpstreamFetch("x".into()).status_code(), 500);
        assert_eq!(ProcessorError::Download("x".into()).status_code(), 500);
        assert_eq!(ProcessorError::Decode("x".into()).status_code(), 500);
        assert_eq!(ProcessorError::Storage("x".into()).status_code(), 500);
        assert_eq!(ProcessorError::Database("x".into()).status_code(), 500);
    }

    #[test]
    fn test_messages_keep_underlying_text() {
        let err = ProcessorError::UpstreamFetch("Subtitles are disabled for this video".into());
        assert!(err.to_string().contains("Subtitles are disabled for this video"));

        let err = ProcessorError::Validation("Invalid YouTube video ID or URL format".into());
        assert_eq!(err.to_string(), "Invalid YouTube video ID or URL format");
    }
}
