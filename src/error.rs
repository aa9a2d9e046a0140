//! Error type shared by the library and both binaries.
//!
//! The first three variants are the UI-local kinds: they never abort the
//! application, the front-end logs them and shows a status line instead.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReviewError>;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("directory {path} is unavailable: {source}")]
    DirectoryUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no image is loaded")]
    NoImageLoaded,

    #[error("failed to clean scratch directory {path}: {source}")]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("DICOM error: {0}")]
    Dicom(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("chart rendering failed: {0}")]
    Chart(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ReviewError {
    /// True for failures the front-end reports and then carries on from.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ReviewError::DirectoryUnavailable { .. }
                | ReviewError::NoImageLoaded
                | ReviewError::CleanupFailed { .. }
        )
    }
}
