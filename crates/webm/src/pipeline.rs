use std::fmt;
use std::path::{Path, PathBuf};

use reqwest::Client;
use rustc_hash::FxHashMap;
use sources_parser::extractor::ExtractorFactory;
use sources_parser::media::{MediaDescriptor, StreamKind, StreamRef};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::encoder::{EncodeSpec, Encoder, EncoderConfig, WEBM_EXTENSION};
use crate::error::{EncoderError, FetchError, PipelineError};
use crate::fetch::StreamFetcher;
use crate::workdir::WorkingArea;

/// The coarse phases a run moves through, in order. Muxing only occurs for
/// split posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Resolving,
    Fetching,
    Muxing,
    Transcoding,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Resolving => "resolving",
            PipelineStage::Fetching => "fetching",
            PipelineStage::Muxing => "muxing",
            PipelineStage::Transcoding => "transcoding",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress notifications for a UI. Delivery is advisory: a slow or closed
/// receiver never stalls the run.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    StageStarted { stage: PipelineStage },
    StreamFetched { kind: StreamKind, path: PathBuf },
    StreamFailed { kind: StreamKind, error: String },
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub title: String,
    pub output_path: PathBuf,
}

/// Drives one URL from resolution to a finished webm in the output root.
pub struct Pipeline {
    factory: ExtractorFactory,
    fetcher: StreamFetcher,
    encoder: Encoder,
    output_root: PathBuf,
    event_tx: Option<mpsc::Sender<PipelineEvent>>,
}

impl Pipeline {
    pub fn new(
        client: Client,
        encoder_config: EncoderConfig,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            factory: ExtractorFactory::new(client.clone()),
            fetcher: StreamFetcher::new(client),
            encoder: Encoder::new(encoder_config),
            output_root: output_root.into(),
            event_tx: None,
        }
    }

    pub fn with_events(mut self, tx: mpsc::Sender<PipelineEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.try_send(event);
        }
    }

    /// Runs the full pipeline for `url`. Intermediate files live in a scratch
    /// directory under the output root that is removed on every exit path;
    /// on success the finished webm is the only new entry in the root.
    #[instrument(skip(self, token), level = "debug")]
    pub async fn run(
        &self,
        url: &str,
        token: &CancellationToken,
    ) -> Result<PipelineOutcome, PipelineError> {
        if token.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        self.emit(PipelineEvent::StageStarted {
            stage: PipelineStage::Resolving,
        });
        info!(url, "resolving media source");

        let extractor = self.factory.create_extractor(url)?;
        let descriptor = tokio::select! {
            _ = token.cancelled() => return Err(PipelineError::Cancelled),
            resolved = extractor.resolve() => resolved?,
        };

        info!(
            source = extractor.source_name(),
            title = %descriptor.title,
            streams = descriptor.streams.len(),
            "source resolved"
        );

        self.run_resolved(descriptor, token).await
    }

    /// Runs everything after resolution for an already built descriptor.
    pub async fn run_resolved(
        &self,
        mut descriptor: MediaDescriptor,
        token: &CancellationToken,
    ) -> Result<PipelineOutcome, PipelineError> {
        if token.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let output_path = self
            .output_root
            .join(format!("{}.{WEBM_EXTENSION}", descriptor.title));

        // Refuse up front, before any download happens.
        if output_path.exists() && !self.encoder.config().overwrite {
            return Err(PipelineError::OutputExists { path: output_path });
        }

        let workdir = WorkingArea::create(&self.output_root)?;
        let result = self
            .execute(&mut descriptor, workdir.path(), &output_path, token)
            .await;

        if let Err(e) = workdir.remove() {
            warn!(error = %e, "failed to remove scratch directory");
        }

        result
    }

    async fn execute(
        &self,
        descriptor: &mut MediaDescriptor,
        scratch: &Path,
        output_path: &Path,
        token: &CancellationToken,
    ) -> Result<PipelineOutcome, PipelineError> {
        self.emit(PipelineEvent::StageStarted {
            stage: PipelineStage::Fetching,
        });
        info!(count = descriptor.streams.len(), "downloading streams");

        let input_path = match descriptor.streams.as_mut_slice() {
            [single] if single.kind == StreamKind::Combined => {
                let kind = single.kind;
                let result = self
                    .fetcher
                    .fetch(
                        single,
                        &descriptor.title,
                        scratch,
                        &descriptor.request_headers,
                        token,
                    )
                    .await;
                let path = result.map_err(|e| match e {
                    FetchError::Cancelled => PipelineError::Cancelled,
                    source => PipelineError::StreamDownload { kind, source },
                })?;
                self.emit(PipelineEvent::StreamFetched {
                    kind,
                    path: path.clone(),
                });
                path
            }
            [a, b] if is_split_pair(a, b) => {
                self.fetch_and_combine(
                    &descriptor.title,
                    &descriptor.request_headers,
                    a,
                    b,
                    scratch,
                    token,
                )
                .await?
            }
            other => {
                return Err(PipelineError::InvalidStreamSet { count: other.len() });
            }
        };

        self.emit(PipelineEvent::StageStarted {
            stage: PipelineStage::Transcoding,
        });

        // Transcode into scratch and move into place afterwards, so a failed
        // or cancelled run never leaves a half-written webm in the root.
        let staged = scratch.join(format!("{}.{WEBM_EXTENSION}", descriptor.title));
        let spec = EncodeSpec::new(&input_path, Some(staged.clone()), self.encoder.config());
        self.encoder
            .transcode(&spec, token)
            .await
            .map_err(|e| match e {
                EncoderError::Cancelled => PipelineError::Cancelled,
                source => PipelineError::Transcode { source },
            })?;

        // Scratch lives under the output root, same filesystem.
        tokio::fs::rename(&staged, output_path).await?;
        info!(output = %output_path.display(), "run complete");

        Ok(PipelineOutcome {
            title: descriptor.title.clone(),
            output_path: output_path.to_path_buf(),
        })
    }

    /// Downloads a video/audio pair concurrently and muxes the tracks into a
    /// single container. When one track fails the sibling finishes on its own
    /// and the run fails afterwards; artifacts stay in scratch either way.
    async fn fetch_and_combine(
        &self,
        title: &str,
        headers: &FxHashMap<String, String>,
        a: &mut StreamRef,
        b: &mut StreamRef,
        scratch: &Path,
        token: &CancellationToken,
    ) -> Result<PathBuf, PipelineError> {
        let (video_ref, audio_ref) = if a.kind == StreamKind::Video {
            (a, b)
        } else {
            (b, a)
        };

        let (video_result, audio_result) = tokio::join!(
            self.fetcher.fetch(video_ref, title, scratch, headers, token),
            self.fetcher.fetch(audio_ref, title, scratch, headers, token),
        );

        let mut failure: Option<(StreamKind, FetchError)> = None;
        for (kind, result) in [
            (StreamKind::Video, video_result),
            (StreamKind::Audio, audio_result),
        ] {
            match result {
                Ok(path) => self.emit(PipelineEvent::StreamFetched { kind, path }),
                Err(e) => {
                    self.emit(PipelineEvent::StreamFailed {
                        kind,
                        error: e.to_string(),
                    });
                    warn!(kind = %kind, error = %e, "stream download failed");
                    if failure.is_none() {
                        failure = Some((kind, e));
                    }
                }
            }
        }

        if let Some((kind, source)) = failure {
            return Err(match source {
                FetchError::Cancelled => PipelineError::Cancelled,
                source => PipelineError::PartialDownload { kind, source },
            });
        }

        // Both downloads succeeded, so both locations are recorded.
        let (Some(video_path), Some(audio_path)) =
            (video_ref.local_path.as_deref(), audio_ref.local_path.as_deref())
        else {
            return Err(PipelineError::InvalidStreamSet { count: 2 });
        };

        self.emit(PipelineEvent::StageStarted {
            stage: PipelineStage::Muxing,
        });

        let combined = scratch.join(format!("{title}_combined.mp4"));
        self.encoder
            .combine(video_path, audio_path, &combined, token)
            .await
            .map_err(|e| match e {
                EncoderError::Cancelled => PipelineError::Cancelled,
                source => PipelineError::Mux { source },
            })?;

        Ok(combined)
    }
}

fn is_split_pair(a: &StreamRef, b: &StreamRef) -> bool {
    matches!(
        (a.kind, b.kind),
        (StreamKind::Video, StreamKind::Audio) | (StreamKind::Audio, StreamKind::Video)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder_config() -> EncoderConfig {
        EncoderConfig {
            binary_path: PathBuf::from("/nonexistent/encoder"),
            threads: 4,
            crf: 30,
            audio_bit_rate: "128k".to_string(),
            overwrite: false,
        }
    }

    fn pipeline(root: &Path) -> Pipeline {
        Pipeline::new(crate::test_client(), encoder_config(), root)
    }

    #[test]
    fn stage_labels() {
        assert_eq!(PipelineStage::Resolving.as_str(), "resolving");
        assert_eq!(PipelineStage::Transcoding.to_string(), "transcoding");
    }

    #[tokio::test]
    async fn rejects_unusable_stream_sets() {
        let root = tempfile::tempdir().unwrap();
        let descriptor = MediaDescriptor::builder("https://example.com/post", "clip")
            .streams(vec![
                StreamRef::new(StreamKind::Video, "https://cdn.example/v.mp4"),
                StreamRef::new(StreamKind::Audio, "https://cdn.example/a.mp4"),
                StreamRef::new(StreamKind::Audio, "https://cdn.example/b.mp4"),
            ])
            .build();

        let err = pipeline(root.path())
            .run_resolved(descriptor, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::InvalidStreamSet { count: 3 }));
        // The scratch directory must not outlive the failed run.
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn existing_output_blocks_run_without_overwrite() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("clip.webm"), b"previous run").unwrap();

        let descriptor = MediaDescriptor::builder("https://example.com/watch", "clip")
            .stream(StreamRef::new(
                StreamKind::Combined,
                "https://cdn.example/c.mp4",
            ))
            .build();

        let err = pipeline(root.path())
            .run_resolved(descriptor, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::OutputExists { .. }));
        // Refused before any scratch or network activity.
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn pre_cancelled_token_short_circuits() {
        let root = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let err = pipeline(root.path())
            .run("https://www.youtube.com/watch?v=jNQXAC9IVRw", &token)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn unsupported_url_is_a_resolve_error() {
        let root = tempfile::tempdir().unwrap();
        let err = pipeline(root.path())
            .run("https://example.com/watch?v=abc", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Resolve { .. }));
    }
}
