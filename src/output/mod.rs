use anyhow::Result;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::cli::OutputFormat;
use crate::pipeline::LocalFrames;
use crate::utils::format_timestamp;
use crate::youtube::transcript::Transcript;

/// Name of the index written next to locally extracted frames
pub const FRAMES_INFO_FILE: &str = "frames_info.json";

/// Render a transcript in the requested format
pub fn render(transcript: &Transcript, format: &OutputFormat, include_timestamps: bool) -> Result<String> {
    let content = match format {
        OutputFormat::Text => format_as_text(transcript, include_timestamps),
        OutputFormat::Json => serde_json::to_string_pretty(transcript)?,
        OutputFormat::Srt => format_as_srt(transcript),
        OutputFormat::Vtt => format_as_vtt(transcript),
    };
    Ok(content)
}

/// Save a rendered transcript to file
pub async fn save_to_file(
    transcript: &Transcript,
    path: &Path,
    format: &OutputFormat,
    include_timestamps: bool,
) -> Result<()> {
    let content = render(transcript, format, include_timestamps)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print a rendered transcript to console
pub fn print_to_console(transcript: &Transcript, format: &OutputFormat, include_timestamps: bool) -> Result<()> {
    println!("{}", render(transcript, format, include_timestamps)?);
    Ok(())
}

/// Write `frames_info.json` into `dir` and return its path
pub fn write_frames_info(frames: &LocalFrames, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(FRAMES_INFO_FILE);
    fs_err::write(&path, serde_json::to_string_pretty(frames)?)?;
    Ok(path)
}

fn format_as_text(transcript: &Transcript, include_timestamps: bool) -> String {
    if !include_timestamps {
        return transcript.full_text().to_string();
    }

    let mut out = String::new();
    for segment in transcript.segments() {
        let _ = writeln!(out, "[{}] {}", format_timestamp(segment.start, '.'), segment.text);
    }
    out
}

fn format_as_srt(transcript: &Transcript) -> String {
    let mut out = String::new();
    for (index, segment) in transcript.segments().iter().enumerate() {
        let _ = writeln!(
            out,
            "{}\n{} --> {}\n{}\n",
            index + 1,
            format_timestamp(segment.start, ','),
            format_timestamp(segment.end(), ','),
            segment.text
        );
    }
    out
}

fn format_as_vtt(transcript: &Transcript) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for segment in transcript.segments() {
        let _ = writeln!(
            out,
            "{} --> {}\n{}\n",
            format_timestamp(segment.start, '.'),
            format_timestamp(segment.end(), '.'),
            segment.text
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::youtube::transcript::TranscriptSegment;

    fn sample() -> Transcript {
        Transcript::from_segments(vec![
            TranscriptSegment { text: "hello".into(), start: 0.0, duration: 1.5 },
            TranscriptSegment { text: "world".into(), start: 61.25, duration: 2.0 },
        ])
    }

    #[test]
    fn test_text_output() {
        assert_eq!(render(&sample(), &OutputFormat::Text, false).unwrap(), "hello world");
        assert_eq!(
            render(&sample(), &OutputFormat::Text, true).unwrap(),
            "[00:00:00.000] hello\n[00:01:01.250] world\n"
        );
    }

    #[test]
    fn test_srt_output() {
        let srt = render(&sample(), &OutputFormat::Srt, false).unwrap();
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:01,500\nhello\n"));
        assert!(srt.contains("2\n00:01:01,250 --> 00:01:03,250\nworld\n"));
    }

    #[test]
    fn test_vtt_output() {
        let vtt = render(&sample(), &OutputFormat::Vtt, false).unwrap();
        assert!(vtt.starts_with("WEBVTT\n\n00:00:00.000 --> 00:00:01.500\nhello\n"));
    }

    #[test]
    fn test_json_output() {
        let json = render(&sample(), &OutputFormat::Json, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["full_text"], "hello world");
    }

    #[test]
    fn test_write_frames_info() {
        let dir = tempfile::tempdir().unwrap();
        let frames = LocalFrames {
            youtube_url: "https://www.youtube.com/watch?v=GAuCQe2qqro".into(),
            segments: vec![crate::frames::CapturedFrame {
                item: 0,
                timestamp: 30.0,
                start: 30_000,
                frame_path: dir.path().join("0.jpg"),
            }],
            missing_frames: vec![1],
        };

        let path = write_frames_info(&frames, dir.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();

        assert_eq!(value["youtube_url"], "https://www.youtube.com/watch?v=GAuCQe2qqro");
        assert_eq!(value["segments"][0]["item"], 0);
        assert_eq!(value["segments"][0]["start"], 30_000);
        assert_eq!(value["segments"][0]["timestamp"], 30.0);
        assert!(value["segments"][0]["frame_path"].as_str().unwrap().ends_with("0.jpg"));
    }
}
