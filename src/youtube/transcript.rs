use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::process::Stdio;
use tokio::process::Command;
use tracing::instrument;

use super::VideoId;
use crate::{ProcessorError, Result};

/// One caption unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Caption text
    pub text: String,

    /// Start time in seconds
    pub start: f64,

    /// Duration in seconds
    pub duration: f64,
}

impl TranscriptSegment {
    /// Start offset in whole milliseconds
    pub fn start_ms(&self) -> i64 {
        (self.start * 1000.0) as i64
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Ordered caption segments plus their joined text
///
/// `full_text` is computed once from the segments, which cannot be changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transcript {
    segments: Vec<TranscriptSegment>,
    full_text: String,
}

impl Transcript {
    pub fn from_segments(segments: Vec<TranscriptSegment>) -> Self {
        let full_text = segments
            .iter()
            .map(|segment| segment.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Self { segments, full_text }
    }

    pub fn segments(&self) -> &[TranscriptSegment] {
        &self.segments
    }

    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    /// Segment start times in seconds, in order
    pub fn timestamps(&self) -> Vec<f64> {
        self.segments.iter().map(|segment| segment.start).collect()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Source of time-coded captions for a video
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the caption segments of a video, in order
    async fn fetch(&self, video_id: &VideoId) -> Result<Vec<TranscriptSegment>>;
}

/// Caption track entry as listed by `yt-dlp --dump-json`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CaptionTrack {
    ext: String,
    url: String,
    #[serde(default)]
    name: Option<String>,
}

/// Subset of the `yt-dlp --dump-json` document used for caption discovery
#[derive(Debug, Default, Deserialize)]
pub(crate) struct CaptionListing {
    #[serde(default)]
    subtitles: HashMap<String, Vec<CaptionTrack>>,
    #[serde(default)]
    automatic_captions: HashMap<String, Vec<CaptionTrack>>,
}

/// YouTube `json3` timed text document
#[derive(Debug, Deserialize)]
pub(crate) struct Json3Document {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    #[serde(default)]
    t_start_ms: u64,
    #[serde(default)]
    d_duration_ms: u64,
    #[serde(default)]
    segs: Vec<Json3Seg>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

/// Pick the `json3` track to download.
///
/// Manually created tracks win over automatic ones; within each kind the
/// languages are tried in the given order.
pub(crate) fn select_caption_track<'a>(
    listing: &'a CaptionListing,
    languages: &[String],
) -> Option<&'a CaptionTrack> {
    let pick = |tracks: &'a HashMap<String, Vec<CaptionTrack>>| {
        languages.iter().find_map(|lang| {
            tracks
                .get(lang)
                .and_then(|entries| entries.iter().find(|track| track.ext == "json3"))
        })
    };

    pick(&listing.subtitles).or_else(|| pick(&listing.automatic_captions))
}

/// Turn a `json3` document into caption segments.
///
/// Events without text (window definitions, line breaks) are dropped.
pub(crate) fn parse_json3(document: Json3Document) -> Vec<TranscriptSegment> {
    document
        .events
        .into_iter()
        .filter_map(|event| {
            let text = event
                .segs
                .iter()
                .map(|seg| seg.utf8.as_str())
                .collect::<String>()
                .replace('\n', " ");
            let text = text.trim();

            if text.is_empty() {
                return None;
            }

            Some(TranscriptSegment {
                text: text.to_string(),
                start: event.t_start_ms as f64 / 1000.0,
                duration: event.d_duration_ms as f64 / 1000.0,
            })
        })
        .collect()
}

/// Caption fetcher backed by yt-dlp for discovery and a plain HTTP GET for the track
pub struct YtDlpTranscriptSource {
    yt_dlp_path: String,
    languages: Vec<String>,
    http: reqwest::Client,
}

impl YtDlpTranscriptSource {
    pub fn new(yt_dlp_path: impl Into<String>, languages: Vec<String>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
            languages,
            http: reqwest::Client::new(),
        }
    }

    /// List the caption tracks of a video
    async fn list_captions(&self, video_id: &VideoId) -> Result<CaptionListing> {
        tracing::debug!("Listing caption tracks for: {}", video_id);

        let output = Command::new(&self.yt_dlp_path)
            .args(["--dump-json", "--skip-download", "--no-playlist", "--no-warnings"])
            .arg(video_id.watch_url())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ProcessorError::UpstreamFetch(format!("failed to run {}: {}", self.yt_dlp_path, e)))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(ProcessorError::UpstreamFetch(error.trim().to_string()));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| ProcessorError::UpstreamFetch(format!("unreadable video info: {}", e)))
    }
}

#[async_trait]
impl TranscriptSource for YtDlpTranscriptSource {
    #[instrument(skip(self, video_id), fields(video_id = %video_id))]
    async fn fetch(&self, video_id: &VideoId) -> Result<Vec<TranscriptSegment>> {
        let listing = self.list_captions(video_id).await?;

        let track = select_caption_track(&listing, &self.languages).ok_or_else(|| {
            ProcessorError::UpstreamFetch(format!(
                "No transcript found for video {} in languages {:?}",
                video_id, self.languages
            ))
        })?;

        tracing::debug!(
            "Downloading caption track {}",
            track.name.as_deref().unwrap_or("unnamed")
        );

        let response = self
            .http
            .get(&track.url)
            .send()
            .await
            .map_err(|e| ProcessorError::UpstreamFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProcessorError::UpstreamFetch(format!(
                "caption download returned HTTP {}",
                response.status()
            )));
        }

        let document: Json3Document = response
            .json()
            .await
            .map_err(|e| ProcessorError::UpstreamFetch(format!("unreadable caption track: {}", e)))?;

        let segments = parse_json3(document);
        tracing::info!("Fetched {} transcript segments", segments.len());

        Ok(segments)
    }
}
