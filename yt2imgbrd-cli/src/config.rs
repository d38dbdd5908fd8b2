use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use webm_engine::EncoderConfig;

pub const CONFIG_DIR_NAME: &str = "yt2imgbrd";
pub const CONFIG_FILE_NAME: &str = "config.toml";

const DEFAULT_THREADS: u32 = 16;
const DEFAULT_CRF: u32 = 30;
const DEFAULT_BIT_RATE: &str = "128k";

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A key the run needs is absent from the file. Users hit this after
    /// hand-editing; the fix is re-running setup or restoring the key.
    #[error("missing configuration key `{section}.{key}`; edit the config file or delete it to re-run setup")]
    MissingKey {
        section: &'static str,
        key: &'static str,
    },

    #[error("no configuration directory available on this system")]
    NoConfigDir,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// On-disk configuration, one `[yt2imgbrd]` table for general settings and
/// one `[ffmpeg]` table for the encoder. Every key is optional when parsing
/// so a hand-trimmed file still loads; accessors report the missing key.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub yt2imgbrd: GeneralSection,
    #[serde(default)]
    pub ffmpeg: FfmpegSection,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct GeneralSection {
    pub default_download_path: Option<PathBuf>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct FfmpegSection {
    pub path: Option<PathBuf>,
    pub default_threads: Option<u32>,
    pub default_crf: Option<u32>,
    pub default_bit_rate: Option<String>,
    pub overwrite: Option<bool>,
}

impl AppConfig {
    /// Default location: `<platform config dir>/yt2imgbrd/config.toml`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    pub fn store(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Fresh configuration for a first run, pointing at a verified encoder.
    pub fn first_run(ffmpeg_path: PathBuf) -> Self {
        Self {
            yt2imgbrd: GeneralSection {
                default_download_path: download_dir(),
            },
            ffmpeg: FfmpegSection {
                path: Some(ffmpeg_path),
                default_threads: Some(DEFAULT_THREADS),
                default_crf: Some(DEFAULT_CRF),
                default_bit_rate: Some(DEFAULT_BIT_RATE.to_string()),
                overwrite: Some(true),
            },
        }
    }

    pub fn download_root(&self) -> Result<PathBuf, ConfigError> {
        self.yt2imgbrd
            .default_download_path
            .clone()
            .ok_or(ConfigError::MissingKey {
                section: "yt2imgbrd",
                key: "default_download_path",
            })
    }

    /// Builds the encoder settings, reporting the first missing key.
    pub fn encoder_config(&self) -> Result<EncoderConfig, ConfigError> {
        let ffmpeg = &self.ffmpeg;
        Ok(EncoderConfig {
            binary_path: ffmpeg.path.clone().ok_or(missing("path"))?,
            threads: ffmpeg.default_threads.ok_or(missing("default_threads"))?,
            crf: ffmpeg.default_crf.ok_or(missing("default_crf"))?,
            audio_bit_rate: ffmpeg
                .default_bit_rate
                .clone()
                .ok_or(missing("default_bit_rate"))?,
            overwrite: ffmpeg.overwrite.ok_or(missing("overwrite"))?,
        })
    }
}

fn missing(key: &'static str) -> ConfigError {
    ConfigError::MissingKey {
        section: "ffmpeg",
        key,
    }
}

fn download_dir() -> Option<PathBuf> {
    dirs::download_dir().or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_run_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = AppConfig::first_run(PathBuf::from("/usr/bin/ffmpeg"));
        config.store(&path).unwrap();
        let loaded = AppConfig::load(&path).unwrap();

        assert_eq!(loaded.ffmpeg.path, Some(PathBuf::from("/usr/bin/ffmpeg")));
        assert_eq!(loaded.ffmpeg.default_threads, Some(16));
        assert_eq!(loaded.ffmpeg.default_crf, Some(30));
        assert_eq!(loaded.ffmpeg.default_bit_rate.as_deref(), Some("128k"));
        assert_eq!(loaded.ffmpeg.overwrite, Some(true));
    }

    #[test]
    fn partial_file_loads_with_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[ffmpeg]\npath = \"/opt/ffmpeg/ffmpeg\"\n").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.ffmpeg.path, Some(PathBuf::from("/opt/ffmpeg/ffmpeg")));
        assert_eq!(config.ffmpeg.default_crf, None);
        assert_eq!(config.yt2imgbrd.default_download_path, None);
    }

    #[test]
    fn missing_encoder_key_is_reported_by_name() {
        let mut config = AppConfig::first_run(PathBuf::from("ffmpeg"));
        config.ffmpeg.default_bit_rate = None;

        let err = config.encoder_config().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingKey {
                section: "ffmpeg",
                key: "default_bit_rate",
            }
        ));
    }

    #[test]
    fn missing_download_root_is_reported_by_name() {
        let config = AppConfig::default();
        let err = config.download_root().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingKey {
                section: "yt2imgbrd",
                ..
            }
        ));
    }
}
