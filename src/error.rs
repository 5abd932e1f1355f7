//! Error types for telemetry processing.
//!
//! All fallible operations in irtelem return [`TelemetryError`]. The variants carry
//! structured context so callers can decide between retrying, reconnecting, or giving up.
//!
//! ## Error Categories
//!
//! - **Producer state**: [`TelemetryError::NotConnected`] when the simulator is not publishing
//! - **Read consistency**: [`TelemetryError::TornRead`] when every copy attempt was overwritten
//! - **Layout**: [`TelemetryError::Truncated`] and [`TelemetryError::Parse`] for malformed images
//! - **Per-field**: [`TelemetryError::FieldOutOfBounds`], surfaced as a record warning
//! - **Platform**: [`TelemetryError::Platform`] for mapping, event and messaging failures
//!
//! A tick that did not advance is not an error; see [`crate::ReadOutcome::Stale`].
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use irtelem::TelemetryError;
//!
//! let error = TelemetryError::NotConnected;
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```
//!
//! ## Helper Constructors
//!
//! ```rust
//! use irtelem::TelemetryError;
//! use std::path::PathBuf;
//!
//! let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
//! let file_error = TelemetryError::file_error(PathBuf::from("/path/to/file.ibt"), io_err);
//!
//! let short = TelemetryError::truncated("header", 112, 40);
//! let open = TelemetryError::platform_failure("open_shared_region", "mapping not found");
//! ```

use std::path::PathBuf;
use thiserror::Error;

#[cfg(windows)]
use windows_core as core;

/// Result type alias for telemetry operations.
pub type Result<T, E = TelemetryError> = std::result::Result<T, E>;

/// Main error type for telemetry operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TelemetryError {
    #[error("Simulator is not publishing telemetry (status connected bit clear)")]
    NotConnected,

    #[error("Row was overwritten during all {attempts} copy attempts")]
    TornRead { attempts: u32 },

    #[error("Field '{field}' at offset {offset} with width {width} exceeds row of {row_len} bytes")]
    FieldOutOfBounds { field: String, offset: usize, width: usize, row_len: usize },

    #[error("Truncated {what}: need {needed} bytes, have {available}")]
    Truncated { what: &'static str, needed: usize, available: usize },

    #[error("SDK version mismatch: expected {expected}, found {found}")]
    Version { expected: i32, found: i32 },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Session info string is empty or missing")]
    SessionInfoMissing,

    #[error("Platform operation '{operation}' failed")]
    Platform {
        operation: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Telemetry file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Variable '{field}' not found in telemetry schema")]
    FieldNotFound { field: String },

    #[error("Windows API error: {operation}")]
    #[cfg(windows)]
    WindowsApi {
        operation: String,
        #[source]
        source: core::Error,
    },
}

impl TelemetryError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TelemetryError::NotConnected => true,
            TelemetryError::TornRead { .. } => true,
            TelemetryError::Platform { .. } => true,
            TelemetryError::SessionInfoMissing => true,
            TelemetryError::FieldOutOfBounds { .. } => false,
            TelemetryError::Truncated { .. } => false,
            TelemetryError::Version { .. } => false,
            TelemetryError::Parse { .. } => false,
            TelemetryError::File { .. } => false,
            TelemetryError::FieldNotFound { .. } => false,
            #[cfg(windows)]
            TelemetryError::WindowsApi { .. } => true,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TelemetryError::NotConnected => vec![
                "Ensure iRacing is running and a session is loaded",
                "Retry after the next wait timeout",
            ],
            TelemetryError::TornRead { .. } => vec![
                "Retry the read on the next tick",
                "Check system load if torn reads repeat",
            ],
            TelemetryError::FieldOutOfBounds { .. } => vec![
                "Verify the variable descriptor against the row length",
                "Skip the field and keep decoding the rest of the record",
            ],
            TelemetryError::Truncated { .. } => vec![
                "Verify the source holds a complete header and descriptor table",
                "Check the telemetry file is not partially written",
            ],
            TelemetryError::Version { .. } => vec![
                "Update iRacing to latest version",
                "Update library to compatible version",
            ],
            TelemetryError::Parse { .. } => vec![
                "Check data format compatibility",
                "Verify source data integrity",
            ],
            TelemetryError::SessionInfoMissing => vec![
                "Wait for the simulator to publish session info",
                "Check the session info update counter",
            ],
            TelemetryError::Platform { .. } => vec![
                "Ensure iRacing is running",
                "Check permissions for shared memory access",
                "Call connect() again",
            ],
            TelemetryError::File { .. } => vec![
                "Check file exists and is readable",
                "Verify IBT file format and version",
                "Check file permissions",
            ],
            TelemetryError::FieldNotFound { .. } => vec![
                "Check field name spelling",
                "Verify field exists in current iRacing version",
            ],
            #[cfg(windows)]
            TelemetryError::WindowsApi { .. } => vec![
                "Check Windows API permissions",
                "Verify system resources availability",
            ],
        }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        TelemetryError::File { path, source }
    }

    /// Helper constructor for short inputs.
    pub fn truncated(what: &'static str, needed: usize, available: usize) -> Self {
        TelemetryError::Truncated { what, needed, available }
    }

    /// Helper constructor for platform primitive failures.
    pub fn platform_failure(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        let reason: String = reason.into();
        TelemetryError::Platform { operation: operation.into(), source: Some(reason.into()) }
    }

    /// Helper constructor for parse failures.
    pub fn parse(context: impl Into<String>, details: impl Into<String>) -> Self {
        TelemetryError::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for Windows API errors.
    #[cfg(windows)]
    pub fn windows_api_error(operation: impl Into<String>, source: core::Error) -> Self {
        TelemetryError::WindowsApi { operation: operation.into(), source }
    }
}

impl From<std::io::Error> for TelemetryError {
    fn from(err: std::io::Error) -> Self {
        TelemetryError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

#[cfg(windows)]
impl From<core::Error> for TelemetryError {
    fn from(err: core::Error) -> Self {
        TelemetryError::WindowsApi {
            operation: "Unknown Windows operation".to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn messages_carry_their_context(
            field in "[A-Za-z][A-Za-z0-9_]{0,31}",
            offset in 0usize..0x10000,
            width in 1usize..9,
            row_len in 0usize..0x10000,
            expected in 1i32..10,
            found in 1i32..10,
        ) {
            let oob = TelemetryError::FieldOutOfBounds {
                field: field.clone(),
                offset,
                width,
                row_len,
            };
            let msg = oob.to_string();
            prop_assert!(msg.contains(&field));
            prop_assert!(msg.contains(&offset.to_string()));
            prop_assert!(msg.contains(&row_len.to_string()));

            let version = TelemetryError::Version { expected, found };
            let msg = version.to_string();
            prop_assert!(msg.contains(&expected.to_string()));
            prop_assert!(msg.contains(&found.to_string()));
        }

        #[test]
        fn platform_failures_keep_their_source(operation in "\\w+", reason in ".+") {
            let err = TelemetryError::platform_failure(operation.clone(), reason.clone());
            prop_assert!(err.to_string().contains(&operation));
            let source = std::error::Error::source(&err);
            prop_assert!(source.is_some());
            prop_assert_eq!(source.map(|s| s.to_string()), Some(reason));
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<TelemetryError>();

        let error = TelemetryError::NotConnected;
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn retry_classification() {
        assert!(TelemetryError::NotConnected.is_retryable());
        assert!(TelemetryError::TornRead { attempts: 2 }.is_retryable());
        assert!(TelemetryError::platform_failure("map_region", "denied").is_retryable());
        assert!(!TelemetryError::truncated("header", 112, 3).is_retryable());
        assert!(!TelemetryError::Version { expected: 2, found: 1 }.is_retryable());

        assert!(!TelemetryError::FieldNotFound { field: "RPM".to_string() }.is_retryable());
    }

    #[test]
    fn every_variant_has_recovery_suggestions() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        for error in [
            TelemetryError::NotConnected,
            TelemetryError::TornRead { attempts: 2 },
            TelemetryError::FieldOutOfBounds {
                field: "Speed".to_string(),
                offset: 8,
                width: 4,
                row_len: 10,
            },
            TelemetryError::truncated("header", 112, 3),
            TelemetryError::Version { expected: 2, found: 1 },
            TelemetryError::parse("session YAML", "bad indent"),
            TelemetryError::SessionInfoMissing,
            TelemetryError::platform_failure("map_region", "denied"),
            TelemetryError::file_error(PathBuf::from("lap.ibt"), io_err),
            TelemetryError::FieldNotFound { field: "RPM".to_string() },
        ] {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty());
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn io_errors_become_file_errors() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test file");
        match TelemetryError::from(io_err) {
            TelemetryError::File { source, .. } => assert_eq!(source.to_string(), "test file"),
            other => panic!("Expected File error variant, got {other:?}"),
        }
    }

    #[test]
    fn truncated_reports_sizes() {
        let err = TelemetryError::truncated("variable descriptor", 144, 100);
        assert_eq!(err.to_string(), "Truncated variable descriptor: need 144 bytes, have 100");
    }
}
