use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "yt-processor",
    about = "YouTube Processor - fetch transcripts and capture a frame for every caption",
    version,
    long_about = "Fetches the captions of a YouTube video, downloads its 360p stream, captures a still frame at every caption start and publishes the frames to S3-compatible storage and the records to a PostgREST database. Available as a CLI and as an HTTP API."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to bind (defaults to the configured host)
        #[arg(long, env = "YT_PROCESSOR_HOST")]
        host: Option<String>,

        /// Port to bind (defaults to the configured port)
        #[arg(short, long, env = "YT_PROCESSOR_PORT")]
        port: Option<u16>,
    },

    /// Print the video id resolved from a URL or id
    Id {
        /// YouTube URL or 11-character video id
        #[arg(value_name = "VIDEO")]
        video: String,
    },

    /// Fetch the transcript of a video
    Transcript {
        /// YouTube URL or 11-character video id
        #[arg(value_name = "VIDEO")]
        video: String,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Include timestamps in text output
        #[arg(long)]
        timestamps: bool,
    },

    /// Capture frames, upload them and store the records
    Process {
        /// YouTube URL or 11-character video id
        #[arg(value_name = "VIDEO")]
        video: String,
    },

    /// Capture frames into a local directory without publishing
    Frames {
        /// YouTube URL or 11-character video id
        #[arg(value_name = "VIDEO")]
        video: String,

        /// Comma separated timestamps in seconds (defaults to caption starts)
        #[arg(long, value_name = "SECONDS")]
        at: Option<String>,

        /// Directory receiving the frames and frames_info.json
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Show configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON with segments and full text
    Json,
    /// SRT subtitle format
    Srt,
    /// WebVTT format
    Vtt,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Srt => write!(f, "srt"),
            OutputFormat::Vtt => write!(f, "vtt"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_frames_command() {
        let cli = Cli::parse_from(["yt-processor", "frames", "GAuCQe2qqro", "--at", "0,30", "-o", "out"]);
        match cli.command {
            Commands::Frames { video, at, output_dir } => {
                assert_eq!(video, "GAuCQe2qqro");
                assert_eq!(at.as_deref(), Some("0,30"));
                assert_eq!(output_dir, Some(PathBuf::from("out")));
            }
            _ => panic!("expected frames command"),
        }
    }

    #[test]
    fn test_transcript_format_default() {
        let cli = Cli::parse_from(["yt-processor", "transcript", "dQw4w9WgXcQ", "--format", "srt"]);
        match cli.command {
            Commands::Transcript { format, timestamps, .. } => {
                assert_eq!(format.to_string(), "srt");
                assert!(!timestamps);
            }
            _ => panic!("expected transcript command"),
        }
    }
}
