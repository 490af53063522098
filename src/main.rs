//! Shortform - vertical short video composition
//!
//! Entry point for the `shortform` binary: resolves ffmpeg/ffprobe once,
//! then runs the requested pipeline stage.

use anyhow::{bail, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use shortform::cli::{Args, Commands};
use shortform::config::{Config, DEFAULT_CONFIG_FILE};
use shortform::media::{CompositionRequest, SystemRunner};
use shortform::tools::{verify_tool, ExecutableResolver};
use shortform::workflow::{ShortRequest, Workflow};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new(DEFAULT_CONFIG_FILE).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Config::from_file(DEFAULT_CONFIG_FILE)?
            } else {
                Config::default()
            }
        }
    };

    let music_volume_default = config.compose.music_volume;

    match args.command {
        Commands::InitConfig { output, force } => {
            if output.exists() && !force {
                bail!("{} already exists, use --force to overwrite", output.display());
            }
            config.save_to_file(&output)?;
            println!("Wrote configuration to {}", output.display());
        }
        Commands::Tools => {
            let workflow = build_workflow(config);
            let runner = SystemRunner;
            let names = &workflow.config().tools;
            for (name, path) in [
                (names.processor_name.as_str(), workflow.tools().processor()),
                (names.prober_name.as_str(), workflow.tools().prober()),
            ] {
                match path {
                    Some(path) => match verify_tool(path, name, &runner).await {
                        Ok(banner) => println!("{:<8} {}\n         {}", name, path.display(), banner),
                        Err(e) => println!("{:<8} {} (verification failed: {})", name, path.display(), e),
                    },
                    None => println!("{:<8} not found", name),
                }
            }
            if !workflow.tools().is_complete() {
                bail!("ffmpeg and ffprobe are both required");
            }
        }
        Commands::Probe { input } => {
            let duration = build_workflow(config).probe_duration(&input).await?;
            if duration <= 0.0 {
                bail!("Could not determine duration of {}", input.display());
            }
            println!("{:.3}", duration);
        }
        Commands::Prepare { input, output, duration } => {
            let workflow = build_workflow(config);
            with_spinner("Preparing background", workflow.prepare_background(&input, &output, duration)).await?;
            println!("Prepared background: {}", output.display());
        }
        Commands::Compose { video, audio, subtitles, output, music, music_volume } => {
            let workflow = build_workflow(config);
            let request = CompositionRequest::new(video, audio, subtitles, output)
                .with_music(music, music_volume.unwrap_or(music_volume_default));
            with_spinner("Composing video", workflow.compose(&request)).await?;
            println!("Composed video: {}", request.output.display());
        }
        Commands::Short { background, audio, subtitles, output, music, music_volume, keep_intermediate } => {
            let workflow = build_workflow(config);
            let request = ShortRequest {
                background,
                voice: audio,
                subtitles,
                output,
                music,
                music_volume: music_volume.unwrap_or(music_volume_default),
                keep_intermediate,
            };
            with_spinner("Building short", workflow.run_short(&request)).await?;
            println!("Short video: {}", request.output.display());
        }
        Commands::Scenes { input, threshold } => {
            let changes = build_workflow(config).detect_scenes(&input, threshold).await?;
            println!("{:<12} {:<8}", "Time (s)", "Score");
            println!("{}", "-".repeat(20));
            for change in changes {
                let score = change.score.map(|s| format!("{:.3}", s)).unwrap_or_else(|| "-".to_string());
                println!("{:<12.3} {:<8}", change.timestamp, score);
            }
        }
    }

    Ok(())
}

/// Resolve the tool pair once and wire up every pipeline stage
fn build_workflow(config: Config) -> Workflow {
    let tools = ExecutableResolver::from_environment(config.tools.clone()).resolve();
    Workflow::new(config, tools)
}

/// Show a spinner while a long-running tool invocation is awaited
async fn with_spinner<T, F>(message: &str, task: F) -> shortform::error::Result<T>
where
    F: Future<Output = shortform::error::Result<T>>,
{
    let spinner = ProgressBar::new_spinner();
    match ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        Ok(style) => spinner.set_style(style),
        Err(e) => warn!("Invalid spinner template: {}", e),
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = task.await;
    match &result {
        Ok(_) => spinner.finish_with_message(format!("{}: done", message)),
        Err(_) => spinner.abandon_with_message(format!("{}: failed", message)),
    }
    result
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".shortform").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "shortform.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}", log_level, log_dir.join("shortform.log").display());
    Ok(())
}
