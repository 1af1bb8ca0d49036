use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use super::clock::{recording_file_name, DeviceClock};
use super::error::RecorderError;
use super::stats::{RecorderStatus, RecordingSummary};
use crate::audio::{
    CaptureSource, SampleProcessor, WavContainerWriter, WavHeaderFields, MAX_DATA_BYTE_COUNT,
};
use crate::config::Config;
use crate::storage::Storage;

/// Fixed parameters of every recording
#[derive(Debug, Clone)]
pub struct RecorderSettings {
    /// Prefix of every recording's file name
    pub device_name: String,
    pub sample_rate: u32,
    /// Declared in the header and used as the sample-count divisor
    pub bits_per_sample: u16,
    /// Bytes pulled per `tick`
    pub block_size: usize,
    pub gain: f32,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for RecorderSettings {
    fn from(config: &Config) -> Self {
        Self {
            device_name: config.device.name.clone(),
            sample_rate: config.audio.sample_rate,
            bits_per_sample: config.audio.bits_per_sample,
            block_size: config.audio.block_size,
            gain: config.audio.gain,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
}

struct ActiveRecording<H: std::io::Write + std::io::Seek> {
    file_name: String,
    started_at: DateTime<Utc>,
    writer: WavContainerWriter<H>,
    total_samples: u64,
}

/// Owns the recording state machine
///
/// `Idle → start → Recording → tick* → stop → Idle`. At most one recording is
/// open at a time; `start` while recording and `stop` while idle do nothing.
pub struct RecordingController<S: Storage> {
    settings: RecorderSettings,
    storage: S,
    processor: SampleProcessor,
    clock: DeviceClock,
    active: Option<ActiveRecording<S::Handle>>,
}

impl<S: Storage> RecordingController<S> {
    pub fn new(settings: RecorderSettings, storage: S, clock: DeviceClock) -> Self {
        let processor = SampleProcessor::new(settings.gain);

        info!(
            "Recorder ready: {} ({} Hz, {}-bit header, gain {:.1})",
            settings.device_name, settings.sample_rate, settings.bits_per_sample, settings.gain
        );

        Self {
            settings,
            storage,
            processor,
            clock,
            active: None,
        }
    }

    pub fn state(&self) -> RecorderState {
        if self.active.is_some() {
            RecorderState::Recording
        } else {
            RecorderState::Idle
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Bytes per sample as declared by the header
    fn bytes_per_sample(&self) -> u64 {
        (self.settings.bits_per_sample as u64 / 8).max(1)
    }

    fn header_fields(&self) -> WavHeaderFields {
        WavHeaderFields::placeholder(self.settings.sample_rate, self.settings.bits_per_sample)
    }

    /// Open a new recording and write its placeholder header
    pub fn start(&mut self) -> Result<(), RecorderError> {
        if self.active.is_some() {
            warn!("Recording already started");
            return Ok(());
        }

        let file_name = recording_file_name(&self.settings.device_name, &self.clock.local_now());

        let handle = self.storage.create(&file_name).map_err(|e| {
            error!("Failed to open {} for writing: {}", file_name, e);
            RecorderError::ResourceUnavailable(e)
        })?;

        let writer = WavContainerWriter::create(handle, self.header_fields()).map_err(|e| {
            error!("Failed to write WAV header to {}: {}", file_name, e);
            RecorderError::ResourceUnavailable(e)
        })?;

        info!("Recording started: {}", file_name);

        self.active = Some(ActiveRecording {
            file_name,
            started_at: self.clock.now_utc(),
            writer,
            total_samples: 0,
        });

        Ok(())
    }

    /// Pull one block from `source` and append it to the open recording
    ///
    /// Blocks until the source delivers. Returns the bytes appended; an empty
    /// pull appends nothing.
    pub fn tick<C: CaptureSource + ?Sized>(&mut self, source: &mut C) -> Result<usize, RecorderError> {
        if self.active.is_none() {
            return Err(RecorderError::NotRecording);
        }

        let mut block = vec![0u8; self.settings.block_size];
        let n = source.pull(&mut block).map_err(RecorderError::CaptureFailed)?;
        block.truncate(n);

        self.append_block(&mut block)
    }

    /// Process an already-pulled block in place and append it
    ///
    /// Samples are counted in whole declared-width units. Bytes of a partial
    /// trailing sample are still written, so a short pull leaves the header
    /// declaring up to `bytes_per_sample - 1` bytes less than the payload.
    pub fn append_block(&mut self, block: &mut [u8]) -> Result<usize, RecorderError> {
        let bytes_per_sample = self.bytes_per_sample();
        let active = self.active.as_mut().ok_or(RecorderError::NotRecording)?;

        if block.is_empty() {
            return Ok(0);
        }

        self.processor.process(block);

        let written = active.writer.append(block).map_err(RecorderError::Storage)?;
        active.total_samples += written as u64 / bytes_per_sample;

        Ok(written)
    }

    /// Patch the header with the final data size and close the file
    ///
    /// The controller is idle afterwards even if patching fails.
    pub fn stop(&mut self) -> Result<Option<RecordingSummary>, RecorderError> {
        let Some(active) = self.active.take() else {
            warn!("Recording not active");
            return Ok(None);
        };

        let data_byte_count =
            header_data_byte_count(active.total_samples * self.bytes_per_sample());

        let sink = active.writer.finalize(data_byte_count).map_err(|e| {
            error!("Failed to finalize {}: {}", active.file_name, e);
            RecorderError::Storage(e)
        })?;
        drop(sink);

        info!(
            "Recording stopped: {} ({} samples, {} data bytes)",
            active.file_name, active.total_samples, data_byte_count
        );

        Ok(Some(RecordingSummary {
            file_name: active.file_name,
            started_at: active.started_at,
            total_samples: active.total_samples,
            data_byte_count,
        }))
    }

    pub fn status(&self) -> RecorderStatus {
        let Some(active) = &self.active else {
            return RecorderStatus::idle();
        };

        let data_bytes = active.total_samples * self.bytes_per_sample();
        let header = self
            .header_fields()
            .with_data_byte_count(header_data_byte_count(data_bytes));

        RecorderStatus {
            is_recording: true,
            file_name: Some(active.file_name.clone()),
            started_at: Some(active.started_at),
            total_samples: active.total_samples,
            data_bytes,
            duration_secs: header.duration_secs(),
        }
    }

    /// Set the clock that names new recordings
    pub fn set_time(&mut self, epoch_secs: i64) -> Result<(), RecorderError> {
        self.clock.set_epoch(epoch_secs)?;
        debug!("Device clock set to {}", self.clock.local_now());
        Ok(())
    }
}

/// Data size for the header, clamped so the RIFF chunk size stays valid
fn header_data_byte_count(data_bytes: u64) -> u32 {
    match u32::try_from(data_bytes) {
        Ok(count) if count <= MAX_DATA_BYTE_COUNT => count,
        _ => {
            warn!(
                "{} data bytes exceed the WAV size field, header will be clamped",
                data_bytes
            );
            MAX_DATA_BYTE_COUNT
        }
    }
}

impl<S: Storage> Drop for RecordingController<S> {
    fn drop(&mut self) {
        if self.active.is_some() {
            if let Err(e) = self.stop() {
                warn!("Failed to finalize recording on drop: {}", e);
            }
        }
    }
}
