//! Live connection lifecycle
//!
//! A [`Connection`] ties a [`Platform`] to the snapshot reader:
//!
//! ```text
//! Disconnected --connect()--> Connecting --ok--> Connected
//!      ^                          |                  |
//!      +-------- error -----------+   disconnect() --+
//! ```
//!
//! `connect()` opens and maps the shared region, opens the wake signal, and caches the
//! header and variable descriptors. Reads then go through [`SnapshotReader`], so every record
//! handed out comes from one consistent row.
//!
//! ```rust
//! use irtelem::{Connection, ConnectionConfig};
//! use irtelem::platform::MemoryPlatform;
//! use std::time::Duration;
//!
//! // no simulator running: the lazy connect fails and the error is returned
//! let mut connection = Connection::new(MemoryPlatform::new(), ConnectionConfig::default());
//! assert!(connection.wait_for_data(Duration::from_millis(1)).is_err());
//! assert!(!connection.is_connected());
//! ```

use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use crate::broadcast::Broadcaster;
use crate::config::ConnectionConfig;
use crate::extract::{TelemetryData, decode_row, decode_row_filtered};
use crate::platform::{Platform, WaitResult};
use crate::schema::{
    Header, SessionCache, SessionData, VAR_HEADER_SIZE, decode_var_descriptor_array,
    read_session_info,
};
use crate::snapshot::{ReadOutcome, Snapshot, SnapshotReader, read_live_header};
use crate::source::ByteSource;
use crate::types::{TelemetryRecord, UpdateRate, VarDescriptor, VariableSchema};
use crate::{Result, TelemetryError};

#[cfg(test)]
mod tests;

/// Where a [`Connection`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Handles and cached layout for one connect/disconnect cycle.
struct LiveSession<P: Platform> {
    region: P::Region,
    view: P::View,
    signal: P::Signal,
    header: Header,
    schema: VariableSchema,
    reader: SnapshotReader,
    connected_since: Instant,
    last_valid: Instant,
}

/// Connection to a producer's shared memory through platform `P`.
pub struct Connection<P: Platform> {
    platform: P,
    config: ConnectionConfig,
    state: ConnectionState,
    live: Option<LiveSession<P>>,
    sessions: SessionCache,
    last_update: Option<Instant>,
}

#[cfg(windows)]
impl Connection<crate::platform::WindowsPlatform> {
    /// Connection to the running simulator with default settings. Connects lazily.
    pub fn live() -> Self {
        Self::new(crate::platform::WindowsPlatform::new(), ConnectionConfig::default())
    }
}

impl<P: Platform> Connection<P> {
    pub fn new(platform: P, config: ConnectionConfig) -> Self {
        Self {
            platform,
            config,
            state: ConnectionState::Disconnected,
            live: None,
            sessions: SessionCache::new(),
            last_update: None,
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Cap the rate at which [`wait_for_data`](Self::wait_for_data) returns records.
    pub fn set_max_rate(&mut self, rate: UpdateRate) {
        self.config.max_rate = rate;
    }

    /// (Re)connect to the producer.
    ///
    /// Any previous session is torn down first. On failure every handle opened so far is
    /// released and the connection is left disconnected.
    pub fn connect(&mut self) -> Result<()> {
        if self.live.is_some() {
            debug!("Reconnecting, tearing down previous session");
            self.disconnect();
        }
        self.state = ConnectionState::Connecting;

        match self.open_session() {
            Ok(live) => {
                info!(
                    tick_rate = live.header.tick_rate,
                    num_vars = live.schema.len(),
                    num_buf = live.header.num_buf,
                    "Connected to telemetry producer"
                );
                self.live = Some(live);
                self.state = ConnectionState::Connected;
                Ok(())
            }
            Err(e) => {
                debug!(error = %e, "Connect failed");
                self.state = ConnectionState::Disconnected;
                Err(e)
            }
        }
    }

    fn open_session(&self) -> Result<LiveSession<P>> {
        let region = self.platform.open_shared_region(&self.config.memory_map_name)?;
        let view = match self.platform.map_region(&region, self.config.map_size) {
            Ok(view) => view,
            Err(e) => {
                self.platform.close_region(region, None);
                return Err(e);
            }
        };
        let signal = match self.platform.open_wake_signal(&self.config.data_event_name) {
            Ok(signal) => signal,
            Err(e) => {
                self.platform.close_region(region, Some(view));
                return Err(e);
            }
        };

        match load_layout(&view, self.config.expected_version) {
            Ok((header, schema)) => {
                let now = Instant::now();
                Ok(LiveSession {
                    region,
                    view,
                    signal,
                    header,
                    schema,
                    reader: SnapshotReader::new(),
                    connected_since: now,
                    last_valid: now,
                })
            }
            Err(e) => {
                self.platform.close_region(region, Some(view));
                self.platform.close_signal(signal);
                Err(e)
            }
        }
    }

    /// Producer is publishing and a fresh row arrived within the staleness timeout.
    ///
    /// Only observes state.
    pub fn is_connected(&self) -> bool {
        let Some(live) = &self.live else {
            return false;
        };
        let publishing = read_live_header(&live.view).is_ok_and(|header| header.is_connected());
        publishing && live.last_valid.elapsed() < self.config.staleness_timeout
    }

    /// Release every platform handle and forget cached layout and session data.
    pub fn disconnect(&mut self) {
        if let Some(live) = self.live.take() {
            self.platform.close_region(live.region, Some(live.view));
            self.platform.close_signal(live.signal);
            info!(
                connected_for = ?live.connected_since.elapsed(),
                "Disconnected from telemetry producer"
            );
        }
        self.sessions.clear();
        self.last_update = None;
        self.state = ConnectionState::Disconnected;
    }

    /// Next fresh record, waiting up to `timeout` for the producer to signal one.
    ///
    /// Connects first when disconnected. `None` means no new row arrived in time, or the
    /// producer restarted (see [`ReadOutcome::Reset`]).
    pub fn wait_for_data(&mut self, timeout: Duration) -> Result<Option<TelemetryRecord>> {
        let Some(snapshot) = self.wait_for_raw(timeout)? else {
            return Ok(None);
        };
        let schema = &self.live_ref()?.schema;
        Ok(Some(decode_row(schema.descriptors(), &snapshot.row, snapshot.tick)))
    }

    /// [`wait_for_data`](Self::wait_for_data) with the configured default timeout.
    pub fn wait_for_data_default(&mut self) -> Result<Option<TelemetryRecord>> {
        self.wait_for_data(self.config.default_wait_timeout)
    }

    /// Like [`wait_for_data`](Self::wait_for_data), decoding only `fields`.
    ///
    /// An empty list decodes every variable.
    pub fn wait_for_fields<S: AsRef<str>>(
        &mut self,
        timeout: Duration,
        fields: &[S],
    ) -> Result<Option<TelemetryRecord>> {
        let Some(snapshot) = self.wait_for_raw(timeout)? else {
            return Ok(None);
        };
        let schema = &self.live_ref()?.schema;
        Ok(Some(decode_row_filtered(schema.descriptors(), &snapshot.row, snapshot.tick, fields)))
    }

    /// Next fresh record mapped onto [`TelemetryData`].
    pub fn wait_for_telemetry(&mut self, timeout: Duration) -> Result<Option<TelemetryData>> {
        Ok(self.wait_for_data(timeout)?.map(|record| TelemetryData::from_record(&record).0))
    }

    /// Next fresh row, undecoded.
    pub fn wait_for_raw(&mut self, timeout: Duration) -> Result<Option<Snapshot>> {
        if self.live.is_none() {
            self.connect()?;
        }
        self.throttle();

        if let Some(snapshot) = self.try_read()? {
            return Ok(Some(snapshot));
        }

        let live = self.live_ref()?;
        if self.platform.wait_on_signal(&live.signal, timeout)? == WaitResult::TimedOut {
            trace!(?timeout, "No signal before timeout");
        }
        self.try_read()
    }

    fn try_read(&mut self) -> Result<Option<Snapshot>> {
        let live = self.live.as_mut().ok_or(TelemetryError::NotConnected)?;
        match live.reader.read_latest(&live.view)? {
            ReadOutcome::Fresh(snapshot) => {
                let now = Instant::now();
                live.last_valid = now;
                self.last_update = Some(now);
                Ok(Some(snapshot))
            }
            ReadOutcome::Stale => Ok(None),
            ReadOutcome::Reset { tick } => {
                warn!(tick, "Producer tick went backwards, treating as restart");
                Ok(None)
            }
        }
    }

    /// Sleep out the remainder of the rate cap's interval.
    fn throttle(&self) {
        let (Some(last), Some(live)) = (self.last_update, &self.live) else {
            return;
        };
        let rate = self.config.max_rate;
        if let Some(interval) = rate.throttle_interval(f64::from(live.header.tick_rate)) {
            if let Some(remaining) = interval.checked_sub(last.elapsed()) {
                trace!(?remaining, "Throttling");
                std::thread::sleep(remaining);
            }
        }
    }

    fn live_ref(&self) -> Result<&LiveSession<P>> {
        self.live.as_ref().ok_or(TelemetryError::NotConnected)
    }

    /// Header cached at connect time.
    pub fn header(&self) -> Option<&Header> {
        self.live.as_ref().map(|live| &live.header)
    }

    /// Header as the producer has it now.
    pub fn live_header(&self) -> Result<Header> {
        read_live_header(&self.live_ref()?.view)
    }

    /// Variable descriptors cached at connect time.
    pub fn schema(&self) -> Option<&VariableSchema> {
        self.live.as_ref().map(|live| &live.schema)
    }

    pub fn descriptors(&self) -> &[VarDescriptor] {
        self.schema().map(VariableSchema::descriptors).unwrap_or_default()
    }

    /// Position of the variable in the descriptor table.
    pub fn var_index(&self, name: &str) -> Option<usize> {
        self.schema()?.index_of(name)
    }

    /// Byte offset of the variable within a row.
    pub fn var_offset(&self, name: &str) -> Result<usize> {
        self.live_ref()?.schema.offset_of(name)
    }

    /// Framed session document, decoded to UTF-8.
    pub fn session_info(&mut self) -> Result<String> {
        if self.live.is_none() {
            self.connect()?;
        }
        let live = self.live_ref()?;
        read_session_info(&live.view, &read_live_header(&live.view)?)
    }

    /// Parsed session document, re-parsed only when `session_info_update` changes.
    pub fn session_data(&mut self) -> Result<&SessionData> {
        if self.live.is_none() {
            self.connect()?;
        }
        let live = self.live.as_ref().ok_or(TelemetryError::NotConnected)?;
        let header = read_live_header(&live.view)?;
        let view = &live.view;
        self.sessions
            .get_or_parse(header.session_info_update, || read_session_info(view, &header))
    }

    /// Command sender over this connection's platform.
    pub fn broadcaster(&self) -> Result<Broadcaster<'_, P>> {
        Broadcaster::register(&self.platform, &self.config.broadcast_message_name)
    }
}

impl<P: Platform> Drop for Connection<P> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Decode and validate the header and descriptor table of a freshly mapped view.
fn load_layout<S: ByteSource + ?Sized>(
    view: &S,
    expected_version: i32,
) -> Result<(Header, VariableSchema)> {
    let header = read_live_header(view)?;
    header.validate(expected_version)?;

    let start = usize::try_from(header.var_header_offset).unwrap_or_default();
    let count = usize::try_from(header.num_vars).unwrap_or_default();
    let table_len = count.saturating_mul(VAR_HEADER_SIZE);
    let table = view.read_vec(start, table_len, "variable descriptor array")?;
    let descriptors = decode_var_descriptor_array(&table, count)?;

    let schema = VariableSchema::new(descriptors, header.row_len()?);
    for descriptor in schema.out_of_bounds() {
        warn!(field = %descriptor.name, end = descriptor.end(), row_len = schema.row_len, "Variable extends past the row");
    }
    Ok((header, schema))
}
