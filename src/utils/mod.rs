use crate::config::YoutubeConfig;

/// Format seconds as `HH:MM:SS<sep>mmm`, as used by SRT (`,`) and WebVTT (`.`)
pub fn format_timestamp(seconds: f64, millis_separator: char) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;

    format!("{:02}:{:02}:{:02}{}{:03}", hours, minutes, secs, millis_separator, millis)
}

/// Parse a comma separated list of timestamps in seconds
pub fn parse_timestamps(input: &str) -> anyhow::Result<Vec<f64>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let value: f64 = part
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid timestamp: {}", part))?;
            if !value.is_finite() || value < 0.0 {
                anyhow::bail!("Timestamp must be a non-negative number of seconds: {}", part);
            }
            Ok(value)
        })
        .collect()
}

/// Check if the current environment has required tools
pub async fn check_dependencies(youtube: &YoutubeConfig) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(&youtube.yt_dlp_path).await {
        missing.push(format!(
            "{} - required for transcripts and video downloads",
            youtube.yt_dlp_path
        ));
    }

    if !check_command_available(&youtube.ffmpeg_path).await {
        missing.push(format!("{} - required for frame capture", youtube.ffmpeg_path));
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str) -> bool {
    use tokio::process::Command;

    // ffmpeg only understands -version
    let flag = if command.ends_with("ffmpeg") { "-version" } else { "--version" };

    Command::new(command)
        .arg(flag)
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}
