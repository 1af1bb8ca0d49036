use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDateTime, Utc};

use super::error::RecorderError;

/// Wall clock used to name recordings
///
/// Starts at the host's time and can be moved by `/set_time`. Setting the
/// time only shifts this clock, never the host's.
#[derive(Debug, Clone)]
pub struct DeviceClock {
    skew: Duration,
    utc_offset: Option<FixedOffset>,
}

impl Default for DeviceClock {
    fn default() -> Self {
        Self {
            skew: Duration::zero(),
            utc_offset: None,
        }
    }
}

impl DeviceClock {
    /// Clock reporting local time at a fixed UTC offset, or the host's time
    /// zone when `utc_offset_hours` is `None`
    pub fn new(utc_offset_hours: Option<i32>) -> Result<Self, RecorderError> {
        let utc_offset = match utc_offset_hours {
            Some(hours) => Some(
                hours
                    .checked_mul(3600)
                    .and_then(FixedOffset::east_opt)
                    .ok_or_else(|| RecorderError::InvalidTime(format!("UTC offset {}h", hours)))?,
            ),
            None => None,
        };

        Ok(Self {
            skew: Duration::zero(),
            utc_offset,
        })
    }

    pub fn now_utc(&self) -> DateTime<Utc> {
        Utc::now() + self.skew
    }

    pub fn local_now(&self) -> NaiveDateTime {
        let now = self.now_utc();
        match self.utc_offset {
            Some(offset) => now.with_timezone(&offset).naive_local(),
            None => now.with_timezone(&Local).naive_local(),
        }
    }

    /// Move the clock so that it currently reads `epoch_secs`
    pub fn set_epoch(&mut self, epoch_secs: i64) -> Result<(), RecorderError> {
        let target = DateTime::from_timestamp(epoch_secs, 0)
            .ok_or_else(|| RecorderError::InvalidTime(format!("timestamp {}", epoch_secs)))?;

        self.skew = target - Utc::now();
        Ok(())
    }
}

/// `<device>_<MMDD>_<HHMM>.wav`
pub fn recording_file_name(device_name: &str, at: &NaiveDateTime) -> String {
    format!("{}_{}.wav", device_name, at.format("%m%d_%H%M"))
}
