use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of the recorder, served by `GET /status`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecorderStatus {
    /// Whether recording is currently active
    pub is_recording: bool,

    /// Name of the file being written
    pub file_name: Option<String>,

    /// When the current recording started
    pub started_at: Option<DateTime<Utc>>,

    /// Samples counted so far (payload bytes over the declared sample width)
    pub total_samples: u64,

    /// Data size the header will declare when finalized
    pub data_bytes: u64,

    /// Duration implied by the header (`data_bytes / byte_rate`)
    pub duration_secs: f64,
}

impl RecorderStatus {
    pub fn idle() -> Self {
        Self {
            is_recording: false,
            file_name: None,
            started_at: None,
            total_samples: 0,
            data_bytes: 0,
            duration_secs: 0.0,
        }
    }
}

/// Returned once a recording has been finalized and closed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordingSummary {
    pub file_name: String,
    pub started_at: DateTime<Utc>,
    pub total_samples: u64,
    /// Value written to the header's data size field
    pub data_byte_count: u32,
}
