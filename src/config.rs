//! Connection settings and the simulator's fixed object names.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::schema::IRSDK_VER;
use crate::types::UpdateRate;

/// Name of the shared memory file mapping
pub const IRSDK_MEMMAPFILENAME: &str = "Local\\IRSDKMemMapFileName";
/// Name of the event pulsed after each new row
pub const IRSDK_DATAVALIDEVENTNAME: &str = "Local\\IRSDKDataValidEvent";
/// Name of the registered remote-control window message
pub const IRSDK_BROADCASTMSGNAME: &str = "IRSDK_BROADCASTMSG";
/// Size of the shared memory mapping
pub const MEMMAPFILESIZE: usize = 780 * 1024;

/// One 60Hz tick rounded up, plus a millisecond
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(1000 / 60 + 2);
/// How long without a fresh row before the producer counts as gone
pub const DEFAULT_STALENESS_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for a [`Connection`](crate::connection::Connection).
///
/// ```rust
/// use irtelem::{ConnectionConfig, UpdateRate};
/// use std::time::Duration;
///
/// let config = ConnectionConfig::new()
///     .with_max_rate(UpdateRate::Max(20))
///     .with_staleness_timeout(Duration::from_secs(5));
/// assert_eq!(config.default_wait_timeout, Duration::from_millis(18));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub memory_map_name: String,
    pub data_event_name: String,
    pub broadcast_message_name: String,
    /// Bytes to map
    pub map_size: usize,
    /// Wait used by [`Connection::wait_for_data_default`](crate::connection::Connection::wait_for_data_default)
    pub default_wait_timeout: Duration,
    pub staleness_timeout: Duration,
    pub max_rate: UpdateRate,
    /// Header `ver` accepted at connect time
    pub expected_version: i32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            memory_map_name: IRSDK_MEMMAPFILENAME.to_string(),
            data_event_name: IRSDK_DATAVALIDEVENTNAME.to_string(),
            broadcast_message_name: IRSDK_BROADCASTMSGNAME.to_string(),
            map_size: MEMMAPFILESIZE,
            default_wait_timeout: DEFAULT_WAIT_TIMEOUT,
            staleness_timeout: DEFAULT_STALENESS_TIMEOUT,
            max_rate: UpdateRate::Native,
            expected_version: IRSDK_VER,
        }
    }
}

impl ConnectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_memory_map_name(mut self, name: impl Into<String>) -> Self {
        self.memory_map_name = name.into();
        self
    }

    pub fn with_data_event_name(mut self, name: impl Into<String>) -> Self {
        self.data_event_name = name.into();
        self
    }

    pub fn with_broadcast_message_name(mut self, name: impl Into<String>) -> Self {
        self.broadcast_message_name = name.into();
        self
    }

    pub fn with_map_size(mut self, size: usize) -> Self {
        self.map_size = size;
        self
    }

    pub fn with_default_wait_timeout(mut self, timeout: Duration) -> Self {
        self.default_wait_timeout = timeout;
        self
    }

    pub fn with_staleness_timeout(mut self, timeout: Duration) -> Self {
        self.staleness_timeout = timeout;
        self
    }

    pub fn with_max_rate(mut self, rate: UpdateRate) -> Self {
        self.max_rate = rate;
        self
    }

    pub fn with_expected_version(mut self, version: i32) -> Self {
        self.expected_version = version;
        self
    }
}
