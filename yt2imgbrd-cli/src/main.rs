mod cli;
mod config;
mod error;
mod setup;

use std::process;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Text;
use sources_parser::extractor::default_client;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};
use webm_engine::{Pipeline, PipelineError, PipelineEvent, PipelineStage};

use crate::cli::Args;
use crate::config::AppConfig;
use crate::error::{AppError, Result};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    if let Err(e) = run(args).await {
        error!("Application error: {}", e);
        eprintln!("Error: {e}");
        if let AppError::Pipeline(PipelineError::Resolve { source }) = &e
            && source.is_retryable()
        {
            eprintln!("The source may be temporarily unavailable. Try again in a moment.");
        }
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => AppConfig::default_path()?,
    };

    let config = if config_path.is_file() {
        AppConfig::load(&config_path)?
    } else {
        setup::run_first_time_setup(&config_path).await?
    };

    let url = match args.url {
        Some(url) => url,
        None => Text::new("Video URL:").prompt()?,
    };

    let output_root = match args.output_dir {
        Some(dir) => dir,
        None => config.download_root()?,
    };
    let encoder_config = config.encoder_config()?;

    // Fail on a bad encoder path before touching the network.
    let version = webm_engine::probe_version(&encoder_config.binary_path).await?;
    info!(version = %version, "encoder available");

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_token.cancel();
        }
    });

    let (tx, rx) = mpsc::channel(16);
    let pipeline = Pipeline::new(default_client(), encoder_config, &output_root).with_events(tx);

    let pb = new_spinner();
    let progress = tokio::spawn(drive_progress(rx, pb.clone()));

    let result = pipeline.run(&url, &token).await;

    // Dropping the pipeline closes the event channel and ends the task.
    drop(pipeline);
    let _ = progress.await;
    pb.finish_and_clear();

    match result {
        Ok(outcome) => {
            println!(
                "Process complete. Video available at: {}",
                outcome.output_path.display()
            );
            Ok(())
        }
        Err(e) if e.is_cancelled() => {
            println!("Cancelled.");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn new_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap()
            .tick_strings(&[
                "▹▹▹▹▹",
                "▸▹▹▹▹",
                "▹▸▹▹▹",
                "▹▹▸▹▹",
                "▹▹▹▸▹",
                "▹▹▹▹▸",
                "▪▪▪▪▪",
            ]),
    );
    pb
}

async fn drive_progress(mut rx: mpsc::Receiver<PipelineEvent>, pb: ProgressBar) {
    while let Some(event) = rx.recv().await {
        match event {
            PipelineEvent::StageStarted { stage } => {
                let message = match stage {
                    PipelineStage::Resolving => "Resolving video URL...",
                    PipelineStage::Fetching => "Downloading stream(s)...",
                    PipelineStage::Muxing => "Combining audio and video...",
                    PipelineStage::Transcoding => "Transcoding to webm...",
                };
                pb.set_message(message);
            }
            PipelineEvent::StreamFetched { kind, .. } => {
                pb.println(format!("Downloaded {kind} stream"));
            }
            PipelineEvent::StreamFailed { kind, error } => {
                pb.println(format!("Failed to download {kind} stream: {error}"));
            }
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_level(verbose))
        .init();
}
