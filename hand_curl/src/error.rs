//! Error type shared by the curl pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by `hand_curl`.
#[derive(Error, Debug)]
pub enum CurlError {
    /// The landmark set handed to the metrics stage is unusable.
    #[error("Invalid landmark input: {reason}")]
    InvalidInput { reason: String },

    #[error("Wrong landmark count: expected {expected}, got {actual}")]
    LandmarkCount { expected: usize, actual: usize },

    #[error("Non-finite coordinate at landmark {landmark}")]
    NonFinite { landmark: &'static str },

    #[error("Calibration file {path:?}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Calibration format error: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),
}

impl CurlError {
    /// True for the numeric-path failures a live loop should skip past.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            CurlError::InvalidInput { .. }
                | CurlError::LandmarkCount { .. }
                | CurlError::NonFinite { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CurlError>;
