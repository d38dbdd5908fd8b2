use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use reqwest::StatusCode;
use sources_parser::extractor::SourceError;
use sources_parser::media::StreamKind;
use thiserror::Error;

/// Errors while downloading a single stream to disk.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be completed at the transport level.
    #[error("download request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("download of {url} returned HTTP {status}")]
    HttpStatus { status: StatusCode, url: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("download cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn http_status(status: StatusCode, url: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
        }
    }
}

/// Errors while driving the external encoder process.
#[derive(Debug, Error)]
pub enum EncoderError {
    /// The configured binary cannot be executed at all.
    #[error("encoder `{}` unavailable: {reason}", path.display())]
    Unavailable { path: PathBuf, reason: String },

    /// The process ran but exited non-zero. `stderr_tail` holds the last
    /// lines it printed, which is where ffmpeg states its actual problem.
    #[error("encoder {operation} exited with {status}: {stderr_tail}")]
    Failed {
        operation: &'static str,
        status: ExitStatus,
        stderr_tail: String,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("encoder cancelled")]
    Cancelled,
}

impl EncoderError {
    pub fn unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Spawn failures that point at a bad binary path map to `Unavailable`;
    /// anything else stays an I/O error.
    pub(crate) fn from_spawn(path: &Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                Self::unavailable(path, error.to_string())
            }
            _ => Self::Io { source: error },
        }
    }

    pub(crate) fn failed(
        operation: &'static str,
        status: ExitStatus,
        tail: impl IntoIterator<Item = String>,
    ) -> Self {
        Self::Failed {
            operation,
            status,
            stderr_tail: tail.into_iter().collect::<Vec<_>>().join("\n"),
        }
    }
}

/// Stage-tagged error for a whole pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to resolve source: {source}")]
    Resolve {
        #[from]
        source: SourceError,
    },

    /// A mandatory download failed; there is nothing to transcode.
    #[error("{kind} stream download failed: {source}")]
    StreamDownload {
        kind: StreamKind,
        #[source]
        source: FetchError,
    },

    /// One track of a split post failed while its sibling succeeded.
    #[error("incomplete download, {kind} stream failed: {source}")]
    PartialDownload {
        kind: StreamKind,
        #[source]
        source: FetchError,
    },

    #[error("failed to combine audio and video: {source}")]
    Mux {
        #[source]
        source: EncoderError,
    },

    #[error("transcode failed: {source}")]
    Transcode {
        #[source]
        source: EncoderError,
    },

    #[error("output `{}` already exists and overwriting is disabled", path.display())]
    OutputExists { path: PathBuf },

    /// The resolver handed back a stream set the pipeline cannot process.
    #[error("resolver produced an unusable stream set ({count} streams)")]
    InvalidStreamSet { count: usize },

    #[error("run cancelled")]
    Cancelled,

    #[error("workspace I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// True when the run ended because the caller asked it to stop.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_not_found_maps_to_unavailable() {
        let err = EncoderError::from_spawn(
            Path::new("/nonexistent/ffmpeg"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        assert!(matches!(err, EncoderError::Unavailable { .. }));
    }

    #[test]
    fn spawn_interrupted_stays_io() {
        let err = EncoderError::from_spawn(
            Path::new("/usr/bin/ffmpeg"),
            std::io::Error::new(std::io::ErrorKind::Interrupted, "interrupted"),
        );
        assert!(matches!(err, EncoderError::Io { .. }));
    }

    #[test]
    fn failed_joins_stderr_tail() {
        let status = ExitStatus::default();
        let err = EncoderError::failed(
            "transcode",
            status,
            vec!["line one".to_string(), "line two".to_string()],
        );
        let message = err.to_string();
        assert!(message.contains("transcode"));
        assert!(message.contains("line one\nline two"));
    }

    #[test]
    fn cancellation_classification() {
        assert!(PipelineError::Cancelled.is_cancelled());
        assert!(!PipelineError::InvalidStreamSet { count: 3 }.is_cancelled());
    }
}
