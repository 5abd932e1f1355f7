//! Torn-read-safe reader for iRacing telemetry.
//!
//! irtelem reads the simulator's live shared-memory image and its recorded disk files, and
//! decodes rows into named, typed values.
//!
//! # Features
//!
//! - **Live Telemetry**: consistent snapshots of the rotating row buffers on Windows
//! - **Cross-platform disk files**: [`DiskReader`] reads recorded files on any OS
//! - **Session metadata**: the YAML session document, framed and parsed into [`SessionData`]
//! - **Remote control**: camera, replay, chat and pit commands through [`Broadcaster`]
//! - **Testable**: [`platform::MemoryPlatform`] stands in for the simulator in process
//!
//! # Layers
//!
//! - [`schema`] decodes the fixed binary layout: header, descriptors, session document
//! - [`snapshot`] copies the latest row and re-checks its tick
//! - [`extract`] turns a row into a [`TelemetryRecord`]
//! - [`connection`] drives a [`platform::Platform`] through connect, wait and disconnect
//! - [`ibt`] reads disk files; [`stream`] plays them back under `tokio`
//!
//! ## Example (disk file)
//!
//! ```rust,no_run
//! use irtelem::DiskReader;
//!
//! fn main() -> irtelem::Result<()> {
//!     let mut reader = DiskReader::open("/path/to/session.ibt")?;
//!     println!("Track: {}", reader.session_data()?.weekend_info.track_name);
//!
//!     for record in reader.records() {
//!         let record = record?;
//!         println!("{:>6} Speed: {:?}", record.tick(), record.f32("Speed"));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Example (live, Windows)
//!
//! ```rust,ignore
//! use irtelem::Connection;
//! use std::time::Duration;
//!
//! let mut connection = Connection::live();
//! loop {
//!     if let Some(record) = connection.wait_for_data(Duration::from_millis(20))? {
//!         println!("RPM: {:?}", record.f32("RPM"));
//!     }
//! }
//! ```

// Core types and error handling
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Binary layout and decoding
pub mod extract;
pub mod schema;
pub mod snapshot;
pub mod source;

// Live telemetry
pub mod broadcast;
pub mod config;
pub mod connection;
pub mod platform;

// Recorded telemetry
pub mod ibt;
pub mod stream;

// Core exports
pub use error::*;
pub use types::{
    DecodeWarning, SessionState, TelemetryRecord, TrackLocation, UpdateRate, Value,
    VarDescriptor, VariableSchema, VariableType,
};

pub use broadcast::{Broadcaster, BroadcastMsg, make_long, pad_car_num};
pub use config::ConnectionConfig;
pub use connection::{Connection, ConnectionState};
pub use extract::{DispatchReport, TelemetryData, decode_row, decode_row_filtered, extract};
pub use ibt::DiskReader;
pub use schema::{Header, SessionData};
pub use snapshot::{ReadOutcome, Snapshot, SnapshotReader};
pub use source::ByteSource;
