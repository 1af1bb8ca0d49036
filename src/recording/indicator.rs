// Recording status light
//
// Blinks while a recording is in progress and stays dark otherwise. The
// recorder loop calls `Blinker::on_tick` once per blink interval.

use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Something that can be switched on and off to show recorder state
pub trait StatusIndicator: Send {
    fn set(&mut self, on: bool);
}

/// Logs indicator changes instead of driving hardware
#[derive(Debug, Default)]
pub struct LogIndicator {
    lit: bool,
}

impl StatusIndicator for LogIndicator {
    fn set(&mut self, on: bool) {
        if on != self.lit {
            debug!("Status indicator {}", if on { "on" } else { "off" });
            self.lit = on;
        }
    }
}

/// Drives an LED through its sysfs `brightness` file
/// (e.g. `/sys/class/leds/led0/brightness`)
#[derive(Debug)]
pub struct LedIndicator {
    brightness_path: PathBuf,
    lit: Option<bool>,
}

impl LedIndicator {
    pub fn new(brightness_path: impl Into<PathBuf>) -> Self {
        Self {
            brightness_path: brightness_path.into(),
            lit: None,
        }
    }
}

impl StatusIndicator for LedIndicator {
    fn set(&mut self, on: bool) {
        if self.lit == Some(on) {
            return;
        }

        match fs::write(&self.brightness_path, if on { "1" } else { "0" }) {
            Ok(()) => self.lit = Some(on),
            Err(e) => warn!("Failed to set LED {}: {}", self.brightness_path.display(), e),
        }
    }
}

/// Toggles an indicator on every tick while recording
pub struct Blinker {
    indicator: Box<dyn StatusIndicator>,
    lit: bool,
}

impl Blinker {
    pub fn new(mut indicator: Box<dyn StatusIndicator>) -> Self {
        indicator.set(false);
        Self {
            indicator,
            lit: false,
        }
    }

    pub fn on_tick(&mut self, recording: bool) {
        self.lit = recording && !self.lit;
        self.indicator.set(self.lit);
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }
}
