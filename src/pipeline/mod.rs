use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use crate::config::Config;
use crate::frames::{self, CapturedFrame, FfmpegFrameDecoder, FrameDecoder};
use crate::publish::{ArtifactPublisher, PostgrestStore, PublishedRecords, S3ObjectStore};
use crate::youtube::download::{VideoDownloader, YtDlpDownloader};
use crate::youtube::transcript::{Transcript, TranscriptSource, YtDlpTranscriptSource};
use crate::youtube::{resolve_video_id, VideoId};
use crate::{ProcessorError, Result};

/// Records stored by a `/process` run plus the frames that could not be captured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResult {
    #[serde(flatten)]
    pub records: PublishedRecords,

    /// Segment indices without a decodable frame
    pub missing_frames: Vec<usize>,
}

/// Frames written to a local directory, as saved to `frames_info.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalFrames {
    pub youtube_url: String,
    pub segments: Vec<CapturedFrame>,
    pub missing_frames: Vec<usize>,
}

/// Transcript fetch, download, frame capture and publishing for one video at a time
#[derive(Clone)]
pub struct ProcessingPipeline {
    transcripts: Arc<dyn TranscriptSource>,
    downloader: Arc<dyn VideoDownloader>,
    decoder: Arc<dyn FrameDecoder>,
    publisher: Option<ArtifactPublisher>,
    temp_root: Option<PathBuf>,
}

impl ProcessingPipeline {
    pub fn new(
        transcripts: Arc<dyn TranscriptSource>,
        downloader: Arc<dyn VideoDownloader>,
        decoder: Arc<dyn FrameDecoder>,
    ) -> Self {
        Self {
            transcripts,
            downloader,
            decoder,
            publisher: None,
            temp_root: None,
        }
    }

    pub fn with_publisher(mut self, publisher: ArtifactPublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn with_temp_root(mut self, temp_root: Option<PathBuf>) -> Self {
        self.temp_root = temp_root;
        self
    }

    /// Build the pipeline from configuration.
    ///
    /// Publishing is wired only when the configuration validates; without it
    /// transcripts and local frames still work.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let youtube = &config.youtube;
        let pipeline = Self::new(
            Arc::new(YtDlpTranscriptSource::new(&youtube.yt_dlp_path, youtube.languages.clone())),
            Arc::new(YtDlpDownloader::new(&youtube.yt_dlp_path)),
            Arc::new(FfmpegFrameDecoder::new(&youtube.ffmpeg_path)),
        )
        .with_temp_root(config.app.temp_dir.clone());

        if let Err(e) = config.validate() {
            tracing::warn!("Publishing disabled: {}", e);
            return Ok(pipeline);
        }

        let objects = S3ObjectStore::new(&config.storage)
            .await
            .context("Failed to create storage client")?;
        let records = PostgrestStore::new(&config.database).context("Failed to create database client")?;

        Ok(pipeline.with_publisher(ArtifactPublisher::new(
            Arc::new(objects),
            Arc::new(records),
            &config.storage.bucket,
            &config.storage.cache_control,
        )))
    }

    pub fn can_publish(&self) -> bool {
        self.publisher.is_some()
    }

    /// Resolve the video and fetch its transcript
    pub async fn fetch_transcript(&self, video: &str) -> Result<Transcript> {
        let video_id = resolve_video_id(video)?;
        self.transcript_for(&video_id).await
    }

    async fn transcript_for(&self, video_id: &VideoId) -> Result<Transcript> {
        tracing::info!("Fetching transcript for: {}", video_id);
        let segments = self.transcripts.fetch(video_id).await?;
        Ok(Transcript::from_segments(segments))
    }

    /// Run the whole pipeline and return the stored records
    ///
    /// The video row keeps `video` exactly as the caller sent it.
    pub async fn process(&self, video: &str) -> Result<ProcessResult> {
        let video_id = resolve_video_id(video)?;
        let publisher = self.publisher.as_ref().ok_or_else(|| {
            ProcessorError::Database(
                "Publishing is not configured: set database.url and database.api_key".to_string(),
            )
        })?;

        let transcript = self.transcript_for(&video_id).await?;

        // video and frames live in here until the records are stored
        let workdir = self.create_workdir()?;
        let video_path = self.downloader.download(&video_id, workdir.path()).await?;
        let extraction = frames::extract_frames(
            self.decoder.as_ref(),
            &video_path,
            &transcript.timestamps(),
            &workdir.path().join("frames"),
        )
        .await?;

        let records = publisher
            .publish(&video_id, video, &transcript, &extraction.captured)
            .await?;

        Ok(ProcessResult {
            records,
            missing_frames: extraction.missing,
        })
    }

    /// Capture frames into `output_dir` without publishing them.
    ///
    /// Without explicit timestamps the transcript segment starts are used.
    pub async fn extract_local_frames(
        &self,
        video: &str,
        timestamps: Option<Vec<f64>>,
        output_dir: &Path,
    ) -> Result<LocalFrames> {
        let video_id = resolve_video_id(video)?;
        let timestamps = match timestamps {
            Some(timestamps) => timestamps,
            None => self.transcript_for(&video_id).await?.timestamps(),
        };

        let workdir = self.create_workdir()?;
        let video_path = self.downloader.download(&video_id, workdir.path()).await?;
        let extraction =
            frames::extract_frames(self.decoder.as_ref(), &video_path, &timestamps, output_dir).await?;

        Ok(LocalFrames {
            youtube_url: video_id.watch_url(),
            segments: extraction.captured,
            missing_frames: extraction.missing,
        })
    }

    /// Per-run scratch directory, removed when dropped
    fn create_workdir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("yt-processor-");

        match &self.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| ProcessorError::Download(format!("failed to create temporary directory: {}", e)))
    }
}
