use std::io;
use thiserror::Error;

/// Failures of a single recorder operation
///
/// None of these end the recorder loop; each is reported to the caller of the
/// operation that produced it.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// The recording file could not be opened or its header written
    #[error("storage unavailable: {0}")]
    ResourceUnavailable(#[source] io::Error),

    /// Appending to or finalizing an open recording failed
    #[error("storage write failed: {0}")]
    Storage(#[source] io::Error),

    #[error("no recording in progress")]
    NotRecording,

    #[error("capture failed: {0}")]
    CaptureFailed(#[source] io::Error),

    #[error("invalid time: {0}")]
    InvalidTime(String),

    #[error("recorder loop is not running")]
    LoopStopped,
}
