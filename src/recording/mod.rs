//! Recording state machine and the loop that drives it
//!
//! - `RecordingController` - open → placeholder header → append → patch → close
//! - `RecorderLoop` - single owner of the controller, fed by channels
//! - `RecorderHandle` - what the HTTP layer uses to start/stop/query
//! - `Blinker` - status light while recording

mod clock;
mod controller;
mod error;
mod indicator;
mod runner;
mod stats;

pub use clock::{recording_file_name, DeviceClock};
pub use controller::{RecorderSettings, RecorderState, RecordingController};
pub use error::RecorderError;
pub use indicator::{Blinker, LedIndicator, LogIndicator, StatusIndicator};
pub use runner::{RecorderCommand, RecorderHandle, RecorderLoop};
pub use stats::{RecorderStatus, RecordingSummary};
