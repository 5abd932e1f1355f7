//! # Session Information
//!
//! Alongside the variable rows the producer publishes a YAML document describing the
//! weekend: track, sessions and results, cameras, radios, drivers and split sectors.
//!
//! ## Framing
//!
//! The document lives at `session_info_offset` and is at most `session_info_len` bytes of
//! Windows-1252 text. The producer ends it with a `"\n..."` line and may leave stale bytes
//! behind it, so [`frame_session_info`] cuts at the first NUL, then at the end marker, and
//! re-encodes what is left as UTF-8.
//!
//! ```rust
//! use irtelem::schema::frame_session_info;
//!
//! let framed = frame_session_info(b"Foo: 1\n...\ntrailer").unwrap();
//! assert_eq!(framed, "Foo: 1");
//! ```
//!
//! ## Parsing
//!
//! The producer does not escape free-text values, so names such as `O'Connor` or a car
//! design string starting with a comma break strict YAML parsers. [`preprocess_session_yaml`]
//! strips control characters and single-quotes those values before `serde_yaml_ng` sees them.
//!
//! ```text
//! UserName: O'Connor, Mike          UserName: 'O''Connor, Mike'
//! CarDesignStr: ,FFFFFF,ED2129  ->  CarDesignStr: ',FFFFFF,ED2129'
//! ```
//!
//! Re-parsing is skipped while `session_info_update` stays the same; see [`SessionCache`].

use encoding_rs::WINDOWS_1252;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::trace;

use super::Header;
use crate::source::ByteSource;
use crate::{Result, TelemetryError};

pub mod cache;
pub mod camera;
pub mod driver;
pub mod radio;
pub mod sessions;
pub mod timing;
pub mod weekend;

pub use cache::SessionCache;
pub use camera::{Camera, CameraGroup, CameraInfo};
pub use driver::{Driver, DriverInfo};
pub use radio::{Frequency, Radio, RadioInfo};
pub use sessions::{ResultFastestLap, ResultPosition, Session, SessionList};
pub use timing::{Sector, SplitTimeInfo};
pub use weekend::{TelemetryOptions, WeekendInfo, WeekendOptions, quantity};

/// Line that ends the session document
pub const SESSION_END_MARKER: &[u8] = b"\n...";

/// Keys whose values are free text written without YAML escaping
const FREE_TEXT_KEYS: &[&str] = &[
    "AbbrevName:",
    "TeamName:",
    "UserName:",
    "Initials:",
    "CarScreenName:",
    "CarScreenNameShort:",
    "TrackDisplayName:",
    "TrackDisplayShortName:",
    "TrackConfigName:",
    "ClubName:",
    "DivisionName:",
    "DriverSetupName:",
    "CarDesignStr:",
    "HelmetDesignStr:",
    "SuitDesignStr:",
];

/// The parsed session document.
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct SessionData {
    pub weekend_info: WeekendInfo,
    /// Session list (the document's `SessionInfo` key)
    pub session_info: SessionList,
    pub camera_info: CameraInfo,
    pub radio_info: RadioInfo,
    pub driver_info: DriverInfo,
    pub split_time_info: SplitTimeInfo,
    /// Car setup tree, kept untyped since its shape depends on the car
    pub car_setup: Option<serde_yaml_ng::Value>,
}

impl SessionData {
    /// Preprocess and parse a framed session document.
    pub fn parse(yaml: &str) -> Result<Self> {
        let cleaned = preprocess_session_yaml(yaml);
        if cleaned.trim().is_empty() {
            return Err(TelemetryError::SessionInfoMissing);
        }
        serde_yaml_ng::from_str(&cleaned)
            .map_err(|e| TelemetryError::parse("session YAML", e.to_string()))
    }
}

/// Isolate the session document from its raw bytes and decode it to UTF-8.
///
/// An empty document is [`TelemetryError::SessionInfoMissing`].
pub fn frame_session_info(bytes: &[u8]) -> Result<String> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let mut text = &bytes[..end];
    if let Some(marker) = text.windows(SESSION_END_MARKER.len()).position(|w| w == SESSION_END_MARKER)
    {
        text = &text[..marker];
    }
    if text.iter().all(u8::is_ascii_whitespace) {
        return Err(TelemetryError::SessionInfoMissing);
    }

    let (decoded, had_errors) = WINDOWS_1252.decode_without_bom_handling(text);
    trace!(len = text.len(), had_errors, "Framed session info");
    Ok(decoded.into_owned())
}

/// Read and frame the session document described by `header`.
pub fn read_session_info<S: ByteSource + ?Sized>(source: &S, header: &Header) -> Result<String> {
    let range = header.session_info_range()?;
    let bytes = source.read_vec(range.start, range.len(), "session info")?;
    frame_session_info(&bytes)
}

/// Make the producer's YAML acceptable to a strict parser.
///
/// Drops control characters other than `\n`, `\r` and `\t`, and single-quotes unescaped
/// free-text values.
pub fn preprocess_session_yaml(yaml: &str) -> String {
    let cleaned: String = yaml
        .chars()
        .filter(|&ch| !ch.is_control() || matches!(ch, '\n' | '\r' | '\t'))
        .collect();

    let mut out = String::with_capacity(cleaned.len() + 64);
    for (i, line) in cleaned.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        match quote_free_text(line) {
            Some(quoted) => out.push_str(&quoted),
            None => out.push_str(line),
        }
    }
    out
}

fn quote_free_text(line: &str) -> Option<String> {
    let body = line.trim_start_matches([' ', '-']);
    let indent = &line[..line.len() - body.len()];
    let key = FREE_TEXT_KEYS.iter().find(|key| body.starts_with(**key))?;
    let value = body[key.len()..].trim();
    if value.is_empty() || is_quoted(value) {
        return None;
    }
    Some(format!("{indent}{key} '{}'", value.replace('\'', "''")))
}

fn is_quoted(value: &str) -> bool {
    value.len() >= 2
        && ((value.starts_with('\'') && value.ends_with('\''))
            || (value.starts_with('"') && value.ends_with('"')))
}

/// Deserialize a 0/1 integer (or a YAML bool) into `bool`; any positive integer is true.
pub(crate) fn int_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrBool {
        Int(i64),
        Bool(bool),
    }

    Ok(match IntOrBool::deserialize(deserializer)? {
        IntOrBool::Int(value) => value > 0,
        IntOrBool::Bool(value) => value,
    })
}
