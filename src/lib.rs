pub mod audio;
pub mod config;
pub mod http;
pub mod recording;
pub mod storage;

pub use audio::{
    CaptureSource, RawStreamSource, SampleProcessor, WavContainerWriter, WavHeaderFields,
    WAV_HEADER_SIZE,
};
pub use config::Config;
pub use http::{create_router, AppState};
pub use recording::{
    Blinker, DeviceClock, RecorderError, RecorderHandle, RecorderLoop, RecorderSettings,
    RecorderState, RecorderStatus, RecordingController, RecordingSummary,
};
pub use storage::{DirStorage, MemoryStorage, Storage, StoredFile};
