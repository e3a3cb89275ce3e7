use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

pub mod postgrest;
pub mod s3;

pub use postgrest::PostgrestStore;
pub use s3::S3ObjectStore;

use crate::frames::{CapturedFrame, FRAME_FILE_EXTENSION};
use crate::youtube::transcript::Transcript;
use crate::youtube::VideoId;
use crate::{ProcessorError, Result};

pub const VIDEO_TABLE: &str = "youtube_table";
pub const TRANSCRIPT_TABLE: &str = "transcripts";
pub const SEGMENT_TABLE: &str = "segments";

/// Row of `youtube_table`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRow {
    pub id: Uuid,
    pub youtube_link: String,
}

/// Row of `transcripts`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRow {
    pub id: Uuid,
    pub youtube_id: Uuid,
    pub full_text: String,
}

/// Row of `segments`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRow {
    pub id: Uuid,
    pub youtube_id: Uuid,
    pub item: usize,

    /// Segment start in milliseconds
    pub start: i64,
    pub storage_url: String,
}

/// Everything written for one processed video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedRecords {
    pub youtube: VideoRow,
    pub transcript: TranscriptRow,
    pub segments: Vec<SegmentRow>,
}

/// Options attached to an object upload
///
/// Uploads always replace an existing object at the same path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub content_type: String,
    pub cache_control: String,
}

/// Blob storage with public read URLs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, bucket: &str, path: &str, body: Vec<u8>, options: &UploadOptions) -> Result<()>;

    /// Publicly fetchable address of an object
    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// Relational store with insert-or-update writes returning the stored rows
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn upsert_video(&self, row: VideoRow) -> Result<VideoRow>;

    async fn upsert_transcript(&self, row: TranscriptRow) -> Result<TranscriptRow>;

    async fn upsert_segments(&self, rows: Vec<SegmentRow>) -> Result<Vec<SegmentRow>>;
}

/// Storage path of a frame inside the bucket
pub fn frame_storage_path(video_id: &VideoId, item: usize) -> String {
    format!("frames/{}/{}.{}", video_id, item, FRAME_FILE_EXTENSION)
}

/// Uploads frames and writes the video, transcript and segment rows
#[derive(Clone)]
pub struct ArtifactPublisher {
    objects: Arc<dyn ObjectStore>,
    records: Arc<dyn RecordStore>,
    bucket: String,
    cache_control: String,
}

impl ArtifactPublisher {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        records: Arc<dyn RecordStore>,
        bucket: impl Into<String>,
        cache_control: impl Into<String>,
    ) -> Self {
        Self {
            objects,
            records,
            bucket: bucket.into(),
            cache_control: cache_control.into(),
        }
    }

    fn upload_options(&self) -> UploadOptions {
        UploadOptions {
            content_type: "image/jpeg".to_string(),
            cache_control: self.cache_control.clone(),
        }
    }

    /// Upload every captured frame, then upsert the rows.
    ///
    /// Row ids are minted per call, so publishing the same video twice creates
    /// new rows while the frame objects are overwritten in place.
    pub async fn publish(
        &self,
        video_id: &VideoId,
        video_url: &str,
        transcript: &Transcript,
        frames: &[CapturedFrame],
    ) -> Result<PublishedRecords> {
        let options = self.upload_options();
        let mut uploaded = Vec::with_capacity(frames.len());

        for frame in frames {
            let path = frame_storage_path(video_id, frame.item);
            let body = fs_err::read(&frame.frame_path).map_err(|e| ProcessorError::Storage(e.to_string()))?;

            tracing::debug!("Uploading frame to {}/{}", self.bucket, path);
            self.objects.upload(&self.bucket, &path, body, &options).await?;

            uploaded.push((frame, self.objects.public_url(&self.bucket, &path)));
        }

        tracing::info!("Uploaded {} frames for {}", uploaded.len(), video_id);

        let youtube = self
            .records
            .upsert_video(VideoRow {
                id: Uuid::new_v4(),
                youtube_link: video_url.to_string(),
            })
            .await?;

        let transcript = self
            .records
            .upsert_transcript(TranscriptRow {
                id: Uuid::new_v4(),
                youtube_id: youtube.id,
                full_text: transcript.full_text().to_string(),
            })
            .await?;

        let rows = uploaded
            .into_iter()
            .map(|(frame, storage_url)| SegmentRow {
                id: Uuid::new_v4(),
                youtube_id: youtube.id,
                item: frame.item,
                start: frame.start,
                storage_url,
            })
            .collect::<Vec<_>>();

        let segments = if rows.is_empty() {
            Vec::new()
        } else {
            self.records.upsert_segments(rows).await?
        };

        tracing::info!(
            youtube_id = %youtube.id,
            segments = segments.len(),
            "Stored records for {}",
            video_id
        );

        Ok(PublishedRecords {
            youtube,
            transcript,
            segments,
        })
    }
}
