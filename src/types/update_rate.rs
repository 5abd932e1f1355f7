//! Refresh-rate cap for telemetry consumers

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Maximum rate at which a consumer wants new records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpdateRate {
    /// Every tick the producer publishes (typically 60Hz)
    #[default]
    Native,

    /// At most this many records per second.
    /// A cap at or above the producer tick rate behaves like `Native`.
    Max(u32),
}

impl UpdateRate {
    /// Build from a frames-per-second cap where zero or negative means uncapped.
    pub fn from_max_fps(max_fps: i32) -> Self {
        match u32::try_from(max_fps) {
            Ok(0) | Err(_) => UpdateRate::Native,
            Ok(hz) => UpdateRate::Max(hz),
        }
    }

    /// Effective rate against the producer's tick rate.
    pub fn normalize(self, tick_rate_hz: f64) -> Self {
        match self {
            UpdateRate::Max(hz) if hz > 0 && f64::from(hz) < tick_rate_hz => UpdateRate::Max(hz),
            _ => UpdateRate::Native,
        }
    }

    /// Minimum spacing between records, if the cap is below the tick rate.
    pub fn throttle_interval(self, tick_rate_hz: f64) -> Option<Duration> {
        match self.normalize(tick_rate_hz) {
            UpdateRate::Native => None,
            UpdateRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / f64::from(hz))),
        }
    }
}
