use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] webm_engine::PipelineError),

    #[error("Encoder error: {0}")]
    Encoder(#[from] webm_engine::EncoderError),

    #[error("Prompt error: {0}")]
    Prompt(#[from] inquire::InquireError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
