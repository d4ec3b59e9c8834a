//! Error types for the landmark tracking library.

use serde::Serialize;
use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// A required landmark index is missing or the frame is too short
    #[error("Insufficient landmarks: {0}")]
    InsufficientLandmarks(String),

    /// A reference vector has near-zero length
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// Landmark frame length changed between calls
    #[error("Shape mismatch: expected {expected} landmarks, got {actual}")]
    ShapeMismatch {
        /// Length of the previously stored frame
        expected: usize,
        /// Length of the incoming frame
        actual: usize,
    },

    /// Calibration input outside the plausible human range
    #[error("Invalid calibration: {0}")]
    InvalidCalibration(String),

    /// Fewer iris ring points than required
    #[error("Insufficient iris points: need at least {required}, got {actual}")]
    InsufficientIrisPoints {
        /// Minimum ring points needed
        required: usize,
        /// Ring points supplied
        actual: usize,
    },

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Filter initialization or processing error
    #[error("Filter error: {0}")]
    FilterError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Malformed entry in a recorded landmark stream
    #[error("Recording error at line {line}: {message}")]
    Recording {
        /// 1-based line number in the recording
        line: usize,
        /// Parser message
        message: String,
    },

    /// Background tracking worker stopped abnormally
    #[error("Worker error: {0}")]
    Worker(String),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fieldless classification of [`Error`], cheap to copy into frame reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InsufficientLandmarks,
    DegenerateGeometry,
    ShapeMismatch,
    InvalidCalibration,
    InsufficientIrisPoints,
    InvalidInput,
    Filter,
    Config,
    Recording,
    Worker,
    Io,
}

impl Error {
    /// Classification of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientLandmarks(_) => ErrorKind::InsufficientLandmarks,
            Self::DegenerateGeometry(_) => ErrorKind::DegenerateGeometry,
            Self::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            Self::InvalidCalibration(_) => ErrorKind::InvalidCalibration,
            Self::InsufficientIrisPoints { .. } => ErrorKind::InsufficientIrisPoints,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::FilterError(_) => ErrorKind::Filter,
            Self::ConfigError(_) => ErrorKind::Config,
            Self::Recording { .. } => ErrorKind::Recording,
            Self::Worker(_) => ErrorKind::Worker,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether this error is a per-frame failure the pipeline recovers from
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientLandmarks(_)
                | Self::DegenerateGeometry(_)
                | Self::ShapeMismatch { .. }
                | Self::InsufficientIrisPoints { .. }
        )
    }
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
