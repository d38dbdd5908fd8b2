use std::path::PathBuf;

use clap::Parser;

/// Downloads a video post and converts it to a VP9/Opus webm.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// URL of the video post to convert. Prompted for when omitted.
    pub url: Option<String>,

    /// Path to an alternate configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory for the finished webm, overriding the configured default
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}
