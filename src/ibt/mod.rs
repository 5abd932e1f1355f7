//! Recorded telemetry files
//!
//! Reads the simulator's disk telemetry format on any platform, decoding rows with the same
//! extractor the live connection uses.

pub mod reader;

pub use reader::{DiskReader, Records};
