use std::path::{Path, PathBuf};

use inquire::Text;
use tracing::debug;

use crate::config::AppConfig;
use crate::error::Result;

const FFMPEG_BINARY: &str = if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" };

/// Accepts either the binary itself or the directory that contains it.
fn resolve_ffmpeg_path(input: &str) -> PathBuf {
    let path = PathBuf::from(input.trim());
    if path.is_dir() {
        path.join(FFMPEG_BINARY)
    } else {
        path
    }
}

/// Interactive first-run setup: asks for the ffmpeg location, verifies that
/// it answers `-version`, and writes the initial configuration file.
pub async fn run_first_time_setup(config_path: &Path) -> Result<AppConfig> {
    println!("No configuration found. Setting up yt2imgbrd for first use.");

    let ffmpeg_path = loop {
        let answer = Text::new("Path to ffmpeg (binary or its directory):")
            .with_default("ffmpeg")
            .prompt()?;
        let candidate = resolve_ffmpeg_path(&answer);
        debug!(candidate = %candidate.display(), "probing encoder");

        match webm_engine::probe_version(&candidate).await {
            Ok(version) => {
                println!("Found {version}");
                break candidate;
            }
            Err(e) => {
                eprintln!("Could not run `{}`: {e}", candidate.display());
                eprintln!("Please try again.");
            }
        }
    };

    let config = AppConfig::first_run(ffmpeg_path);
    config.store(config_path)?;
    println!("Configuration written to {}", config_path.display());

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_input_gets_binary_appended() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_ffmpeg_path(dir.path().to_str().unwrap());
        assert_eq!(resolved, dir.path().join(FFMPEG_BINARY));
    }

    #[test]
    fn file_input_is_kept_as_is() {
        let resolved = resolve_ffmpeg_path("/usr/local/bin/ffmpeg");
        assert_eq!(resolved, PathBuf::from("/usr/local/bin/ffmpeg"));
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let resolved = resolve_ffmpeg_path("  ffmpeg \n");
        assert_eq!(resolved, PathBuf::from("ffmpeg"));
    }
}
