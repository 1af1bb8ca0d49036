use crate::config::DeviceConfig;
use crate::recording::RecorderHandle;
use crate::storage::Storage;
use std::sync::Arc;

/// Shared application state for HTTP handlers
pub struct AppState<S: Storage> {
    /// Control channel into the recorder loop
    pub recorder: RecorderHandle,

    /// Recording directory, for listing and file management
    pub storage: Arc<S>,

    /// Identity reported by `GET /`
    pub device: Arc<DeviceConfig>,
}

impl<S: Storage> AppState<S> {
    pub fn new(recorder: RecorderHandle, storage: Arc<S>, device: DeviceConfig) -> Self {
        Self {
            recorder,
            storage,
            device: Arc::new(device),
        }
    }
}

// Derived Clone would require `S: Clone`
impl<S: Storage> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            recorder: self.recorder.clone(),
            storage: Arc::clone(&self.storage),
            device: Arc::clone(&self.device),
        }
    }
}
