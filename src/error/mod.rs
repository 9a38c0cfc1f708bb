use std::path::PathBuf;

use crate::session::MissingInput;
use crate::transport::TransportError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("failed to read {path}: {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{side} image could not be loaded: {message}")]
    ImageUnavailable { side: String, message: String },
    #[error("composition request incomplete: {0}")]
    Incomplete(MissingInput),
    #[error("compositing failed: {message}")]
    CompositeFailed { message: String },
    #[error("timed out after {seconds}s waiting for {stage}")]
    Timeout { stage: &'static str, seconds: u64 },
}
