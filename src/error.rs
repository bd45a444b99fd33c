use thiserror::Error;

/// Fatal tracker error types
///
/// Only malformed configuration and unreadable map assets are fatal; every
/// runtime degeneracy (too-short windows, empty stride intervals, positions
/// off the map) is recovered locally inside the pipeline.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid map calibration: {0}")]
    InvalidCalibration(String),

    #[error("Failed to load map asset: {0}")]
    MapLoad(String),

    #[error("Failed to load sensor log: {0}")]
    LogLoad(String),
}

/// Result type for tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;
