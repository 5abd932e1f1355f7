//! Session data caching keyed on the producer's update counter

use tracing::debug;

use super::SessionData;
use crate::{Result, TelemetryError};

/// Parsed session data together with the `session_info_update` it was parsed at.
#[derive(Debug, Clone)]
struct CachedSession {
    update: i32,
    data: SessionData,
}

/// Re-parses session YAML only when the header's update counter moves.
#[derive(Debug, Clone, Default)]
pub struct SessionCache {
    entry: Option<CachedSession>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a parse for `update` is already held.
    pub fn is_valid(&self, update: i32) -> bool {
        self.entry.as_ref().is_some_and(|entry| entry.update == update)
    }

    /// Return the cached data for `update`, calling `load` for fresh YAML otherwise.
    ///
    /// A failed load or parse leaves the previous entry in place.
    pub fn get_or_parse<F>(&mut self, update: i32, load: F) -> Result<&SessionData>
    where
        F: FnOnce() -> Result<String>,
    {
        if self.is_valid(update) {
            debug!(update, "Using cached session data");
        } else {
            debug!(update, "Parsing session data");
            let data = SessionData::parse(&load()?)?;
            self.entry = Some(CachedSession { update, data });
        }
        self.entry.as_ref().map(|entry| &entry.data).ok_or(TelemetryError::SessionInfoMissing)
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}
