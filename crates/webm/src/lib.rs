//! Turns a resolved media descriptor into a finished webm file.
//!
//! The engine downloads each stream into a per-run scratch directory, muxes
//! split audio/video with an external encoder, transcodes the result to
//! VP9/Opus, and moves the finished file into the output root in one step.
//! Everything in between lives in the scratch directory, which is removed on
//! every exit path.

pub mod encoder;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod workdir;

pub use encoder::{EncodeSpec, Encoder, EncoderConfig, probe_version};
pub use error::{EncoderError, FetchError, PipelineError};
pub use fetch::StreamFetcher;
pub use pipeline::{Pipeline, PipelineEvent, PipelineOutcome, PipelineStage};
pub use workdir::WorkingArea;

/// Plain client for test fixtures. `reqwest::Client::new()` needs a
/// process-wide rustls provider; production receives a preconfigured client
/// from the caller instead.
#[cfg(test)]
pub(crate) fn test_client() -> reqwest::Client {
    // Err means another test already installed it; that's fine.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    reqwest::Client::new()
}
