use anyhow::{bail, Result};
use serde::Deserialize;

use crate::audio::{DEFAULT_BLOCK_SIZE, DEFAULT_GAIN};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub http: HttpConfig,
    pub audio: AudioConfig,
    pub capture: CaptureConfig,
    pub storage: StorageConfig,
    pub clock: ClockConfig,
    pub indicator: IndicatorConfig,
}

/// Identity reported by `GET /` and used to name recordings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub name: String,
    pub firmware_version: String,
    pub serial_number: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: "ESPREC-01".to_string(),
            firmware_version: concat!("field-recorder ", env!("CARGO_PKG_VERSION")).to_string(),
            serial_number: "000000011".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Bit depth declared in the WAV header. Also the divisor used when
    /// counting samples, independent of the 16-bit processing width.
    pub bits_per_sample: u16,
    /// Bytes pulled from the capture source per call
    pub block_size: usize,
    pub gain: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            bits_per_sample: 32,
            block_size: DEFAULT_BLOCK_SIZE,
            gain: DEFAULT_GAIN,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Raw PCM input: a device node, FIFO or file path, or "-" for stdin
    pub input: String,
    /// Capacity of the capture → recorder block channel
    pub queue_blocks: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            input: "-".to_string(),
            queue_blocks: 8,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub recordings_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            recordings_path: "recordings".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Fixed offset applied to UTC for recording names. Unset means the
    /// host's local time zone.
    pub utc_offset_hours: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub blink_interval_ms: u64,
    /// sysfs LED brightness file; unset logs indicator changes instead
    pub led_path: Option<String>,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            blink_interval_ms: 1000,
            led_path: None,
        }
    }
}

impl Config {
    /// Load from an optional config file, overridden by `RECORDER__*`
    /// environment variables (e.g. `RECORDER__AUDIO__GAIN=12`)
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("RECORDER").separator("__"))
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the capture and recording pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.audio.block_size == 0 {
            bail!("audio.block_size must be greater than zero");
        }
        if self.audio.sample_rate == 0 {
            bail!("audio.sample_rate must be greater than zero");
        }
        if self.audio.bits_per_sample == 0 || self.audio.bits_per_sample % 8 != 0 {
            bail!(
                "audio.bits_per_sample must be a non-zero multiple of 8, got {}",
                self.audio.bits_per_sample
            );
        }
        Ok(())
    }
}
