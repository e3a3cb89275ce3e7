use anyhow::Result;
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yt_processor::cli::{Cli, Commands};
use yt_processor::config::Config;
use yt_processor::server::{self, AppState};
use yt_processor::{output, resolve_video_id, utils, ProcessingPipeline};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);
    let quiet = cli.quiet;

    match cli.command {
        // Resolving an id needs neither configuration nor external tools
        Commands::Id { video } => {
            println!("{}", resolve_video_id(&video)?);
        }
        Commands::Config { show } => {
            let config = Config::load().await?;
            if show {
                config.display();
            } else {
                config.print_location()?;
            }
        }
        Commands::Serve { host, port } => {
            let (config, pipeline) = prepare().await?;
            let addr = format!(
                "{}:{}",
                host.unwrap_or_else(|| config.server.host.clone()),
                port.unwrap_or(config.server.port)
            );
            server::serve(&addr, AppState::new(pipeline)).await?;
        }
        Commands::Transcript {
            video,
            output,
            format,
            timestamps,
        } => {
            let (_, pipeline) = prepare().await?;

            let progress = spinner(quiet, "Fetching transcript...");
            let transcript = pipeline.fetch_transcript(&video).await;
            progress.finish_and_clear();
            let transcript = transcript?;

            match output {
                Some(path) => {
                    output::save_to_file(&transcript, &path, &format, timestamps).await?;
                    println!("Transcript saved to: {}", path.display());
                }
                None => {
                    output::print_to_console(&transcript, &format, timestamps)?;
                }
            }
        }
        Commands::Process { video } => {
            let (config, pipeline) = prepare().await?;
            config.validate()?;

            let progress = spinner(quiet, "Fetching transcript, downloading video and capturing frames...");
            let result = pipeline.process(&video).await;
            progress.finish_and_clear();
            let result = result?;

            println!("{}", serde_json::to_string_pretty(&result)?);
            eprintln!(
                "{} stored {} segments for video row {}",
                style("Done:").green().bold(),
                result.records.segments.len(),
                result.records.youtube.id
            );
            if !result.missing_frames.is_empty() {
                eprintln!(
                    "{} no frame for segments {:?}",
                    style("Warning:").yellow(),
                    result.missing_frames
                );
            }
        }
        Commands::Frames { video, at, output_dir } => {
            let timestamps = at.as_deref().map(utils::parse_timestamps).transpose()?;
            let video_id = resolve_video_id(&video)?;
            let output_dir = output_dir.unwrap_or_else(|| PathBuf::from("frames").join(video_id.as_str()));
            let (_, pipeline) = prepare().await?;

            let progress = spinner(quiet, "Downloading video and capturing frames...");
            let frames = pipeline.extract_local_frames(&video, timestamps, &output_dir).await;
            progress.finish_and_clear();
            let frames = frames?;

            let info_path = output::write_frames_info(&frames, &output_dir)?;
            println!(
                "Captured {} frames into {}",
                style(frames.segments.len()).cyan(),
                output_dir.display()
            );
            println!("Frame index saved to: {}", info_path.display());
        }
    }

    Ok(())
}

/// Load configuration, warn about missing tools and build the pipeline
async fn prepare() -> Result<(Config, ProcessingPipeline)> {
    let config = Config::load().await?;

    // Check for required external dependencies (non-fatal)
    let missing_deps = utils::check_dependencies(&config.youtube).await;
    if !missing_deps.is_empty() {
        eprintln!("{}", style("Dependency check warnings:").yellow());
        for dep in missing_deps {
            eprintln!("   • {}", dep);
        }
        eprintln!("   (Continuing anyway - tools may be available)");
    }

    let pipeline = ProcessingPipeline::from_config(&config).await?;
    Ok((config, pipeline))
}

fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "yt_processor=debug,tower_http=debug"
    } else {
        "yt_processor=info,tower_http=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn spinner(quiet: bool, message: &'static str) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.set_message(message);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}
