use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod download;
pub mod transcript;

use crate::{ProcessorError, Result};

/// Video id following `v=` or a path separator, e.g. `watch?v=<id>` or `youtu.be/<id>`
static URL_ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:v=|/)([0-9A-Za-z_-]{11})(?:[&?/]|$)").unwrap());

/// The whole input is a bare id
static BARE_ID_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([0-9A-Za-z_-]{11})$").unwrap());

/// 11-character identifier of a hosted YouTube video
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch page URL for this video
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for VideoId {
    type Err = ProcessorError;

    fn from_str(s: &str) -> Result<Self> {
        resolve_video_id(s)
    }
}

/// Resolve a video id from a full URL, a short URL or a bare id.
///
/// The patterns are tried in order and the first match wins.
pub fn resolve_video_id(input: &str) -> Result<VideoId> {
    [&*URL_ID_REGEX, &*BARE_ID_REGEX]
        .iter()
        .find_map(|re| re.captures(input))
        .and_then(|caps| caps.get(1))
        .map(|m| VideoId(m.as_str().to_string()))
        .ok_or_else(|| {
            ProcessorError::Validation("Invalid YouTube video ID or URL format".to_string())
        })
}

/// Request body accepted by the HTTP surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRequest {
    /// URL or bare id
    pub video: String,
}

impl VideoRequest {
    pub fn video_id(&self) -> Result<VideoId> {
        resolve_video_id(&self.video)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_watch_url() {
        let id = resolve_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap();
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");

        let id = resolve_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s").unwrap();
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");

        let id = resolve_video_id("https://m.youtube.com/watch?feature=share&v=GAuCQe2qqro").unwrap();
        assert_eq!(id.as_str(), "GAuCQe2qqro");
    }

    #[test]
    fn test_resolve_short_and_embed_urls() {
        assert_eq!(resolve_video_id("https://youtu.be/dQw4w9WgXcQ").unwrap().as_str(), "dQw4w9WgXcQ");
        assert_eq!(resolve_video_id("https://youtu.be/dQw4w9WgXcQ?si=abc").unwrap().as_str(), "dQw4w9WgXcQ");
        assert_eq!(
            resolve_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ/").unwrap().as_str(),
            "dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_resolve_bare_id() {
        let id = tokio_test::assert_ok!(resolve_video_id("dQw4w9WgXcQ"));
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");

        let id = tokio_test::assert_ok!(resolve_video_id("a-b_c-d_e-f"));
        assert_eq!(id.as_str(), "a-b_c-d_e-f");
    }

    #[test]
    fn test_resolve_rejects_invalid_input() {
        for input in ["", "not-a-valid-video", "short", "dQw4w9WgXcQQ", "https://example.com/", "dQw4w9WgXc!"] {
            let err = tokio_test::assert_err!(resolve_video_id(input), "{input} should be rejected");
            assert!(err.is_validation());
        }
    }

    #[test]
    fn test_id_needs_delimiter_after_it() {
        // twelve characters after v= cannot be an id
        assert!(resolve_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQQ").is_err());
    }

    #[test]
    fn test_watch_url() {
        let id: VideoId = "https://youtu.be/GAuCQe2qqro".parse().unwrap();
        assert_eq!(id.watch_url(), "https://www.youtube.com/watch?v=GAuCQe2qqro");
        assert_eq!(id.to_string(), "GAuCQe2qqro");
    }

    #[test]
    fn test_video_request() {
        let request: VideoRequest = serde_json::from_str(r#"{"video": "dQw4w9WgXcQ"}"#).unwrap();
        assert_eq!(request.video_id().unwrap().as_str(), "dQw4w9WgXcQ");

        let request = VideoRequest { video: "nope".into() };
        assert!(request.video_id().is_err());
    }
}
