use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::EncoderError;

/// Target codecs. The container is always webm, so these never vary.
const VIDEO_CODEC: &str = "libvpx-vp9";
const AUDIO_CODEC: &str = "libopus";
pub(crate) const WEBM_EXTENSION: &str = "webm";

/// How many stderr lines to keep for the failure report. ffmpeg prints its
/// actual complaint at the very end of the output.
const STDERR_TAIL_LINES: usize = 8;

/// Settings for the external encoder binary, taken from user configuration.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub binary_path: PathBuf,
    pub threads: u32,
    pub crf: u32,
    pub audio_bit_rate: String,
    pub overwrite: bool,
}

/// One planned transcode run.
#[derive(Debug, Clone)]
pub struct EncodeSpec {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub video_codec: &'static str,
    pub audio_codec: &'static str,
    pub threads: u32,
    pub crf: u32,
    /// Always unit-suffixed, see [`normalize_bit_rate`].
    pub audio_bit_rate: String,
    pub overwrite: bool,
}

impl EncodeSpec {
    /// Builds a spec from configuration. When `output_path` is omitted it
    /// defaults to the input path with its extension swapped for `webm`.
    pub fn new(
        input_path: impl Into<PathBuf>,
        output_path: Option<PathBuf>,
        config: &EncoderConfig,
    ) -> Self {
        let input_path = input_path.into();
        let output_path =
            output_path.unwrap_or_else(|| input_path.with_extension(WEBM_EXTENSION));

        Self {
            input_path,
            output_path,
            video_codec: VIDEO_CODEC,
            audio_codec: AUDIO_CODEC,
            threads: config.threads,
            crf: config.crf,
            audio_bit_rate: normalize_bit_rate(&config.audio_bit_rate),
            overwrite: config.overwrite,
        }
    }

    fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-i".to_string(),
            self.input_path.to_string_lossy().to_string(),
            "-c:v".to_string(),
            self.video_codec.to_string(),
            "-threads".to_string(),
            self.threads.to_string(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-b:v".to_string(),
            "0".to_string(),
            "-b:a".to_string(),
            self.audio_bit_rate.clone(),
            "-c:a".to_string(),
            self.audio_codec.to_string(),
        ];

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push(self.output_path.to_string_lossy().to_string());
        args
    }
}

fn mux_args(video: &Path, audio: &Path, output: &Path) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-i".to_string(),
        video.to_string_lossy().to_string(),
        "-i".to_string(),
        audio.to_string_lossy().to_string(),
        "-map".to_string(),
        "0:v".to_string(),
        "-map".to_string(),
        "1:a".to_string(),
        "-c:v".to_string(),
        "copy".to_string(),
        "-y".to_string(),
        output.to_string_lossy().to_string(),
    ]
}

/// Appends the kilobit unit when the configured rate is a bare number.
/// A misconfigured rate is repaired and logged, never rejected.
pub fn normalize_bit_rate(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.ends_with(['k', 'K']) {
        trimmed.to_string()
    } else {
        warn!(bit_rate = %trimmed, "bit-rate lacks a unit suffix, assuming kilobits");
        format!("{trimmed}k")
    }
}

/// Runs `<binary> -version` and returns the first line of its output.
pub async fn probe_version(path: &Path) -> Result<String, EncoderError> {
    let output = Command::new(path)
        .arg("-version")
        .env("LC_ALL", "C")
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| EncoderError::from_spawn(path, e))?;

    if !output.status.success() {
        return Err(EncoderError::unavailable(
            path,
            format!("`-version` exited with {}", output.status),
        ));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| EncoderError::unavailable(path, "`-version` produced no output"))
}

/// Wrapper around the external ffmpeg binary.
pub struct Encoder {
    config: EncoderConfig,
}

impl Encoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Preflight check: the configured binary must answer `-version`.
    pub async fn verify(&self) -> Result<String, EncoderError> {
        probe_version(&self.config.binary_path).await
    }

    /// Muxes a split video/audio pair into one container, stream-copying the
    /// video track. The output may be overwritten; it only ever lives in a
    /// scratch directory.
    pub async fn combine(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        token: &CancellationToken,
    ) -> Result<(), EncoderError> {
        let args = mux_args(video, audio, output);
        info!(output = %output.display(), "combining video and audio");
        self.run("mux", &args, token).await
    }

    /// Transcodes `spec.input_path` into a VP9/Opus webm.
    pub async fn transcode(
        &self,
        spec: &EncodeSpec,
        token: &CancellationToken,
    ) -> Result<(), EncoderError> {
        let args = spec.to_args();
        info!(
            input = %spec.input_path.display(),
            output = %spec.output_path.display(),
            crf = spec.crf,
            "transcoding to webm"
        );
        self.run("transcode", &args, token).await
    }

    async fn run(
        &self,
        operation: &'static str,
        args: &[String],
        token: &CancellationToken,
    ) -> Result<(), EncoderError> {
        debug!(binary = %self.config.binary_path.display(), ?args, "spawning encoder");

        let mut child = Command::new(&self.config.binary_path)
            .args(args)
            .env("LC_ALL", "C") // Force consistent output
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EncoderError::from_spawn(&self.config.binary_path, e))?;

        let stderr = child.stderr.take().ok_or_else(|| {
            EncoderError::unavailable(&self.config.binary_path, "failed to capture stderr")
        })?;

        let mut lines = BufReader::new(stderr).lines();
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    warn!(operation, "cancellation requested, killing encoder");
                    let _ = child.kill().await;
                    return Err(EncoderError::Cancelled);
                }
                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            if tail.len() == STDERR_TAIL_LINES {
                                tail.pop_front();
                            }
                            tail.push_back(line);
                        }
                        Ok(None) => break,
                        Err(e) => {
                            error!(error = %e, "error reading encoder output");
                            break;
                        }
                    }
                }
            }
        }

        let status = tokio::select! {
            _ = token.cancelled() => {
                let _ = child.kill().await;
                return Err(EncoderError::Cancelled);
            }
            status = child.wait() => status?,
        };

        if !status.success() {
            return Err(EncoderError::failed(operation, status, tail));
        }

        debug!(operation, "encoder finished");
        Ok(())
    }
}
