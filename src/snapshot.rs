//! Consistent reads of the producer's rotating row buffers.
//!
//! The producer writes a row into one of `num_buf` slots, then bumps that slot's tick count.
//! No lock is shared with it, so a reader can only detect overwrites after the fact:
//!
//! 1. re-read the header and pick the slot with the highest tick,
//! 2. copy its row,
//! 3. re-read the slot's tick. If it moved, the copy may mix two rows; pick again and retry
//!    once before giving up with [`TelemetryError::TornRead`].
//!
//! The reader also tracks the last tick it returned, so callers can tell fresh data from a
//! repeat ([`ReadOutcome::Stale`]) or a producer restart ([`ReadOutcome::Reset`]).

use std::sync::atomic::{Ordering, fence};
use std::time::Instant;
use tracing::{debug, trace, warn};

use crate::schema::{HEADER_SIZE, Header};
use crate::source::ByteSource;
use crate::{Result, TelemetryError};

/// Copy attempts before a read is reported as torn
pub const MAX_READ_ATTEMPTS: u32 = 2;

/// A row copied out while its slot's tick held still.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Tick observed before and after the copy
    pub tick: i32,
    /// Slot the row came from
    pub slot: usize,
    /// `buf_len` bytes of row data
    pub row: Vec<u8>,
}

/// Result of one [`SnapshotReader::read_latest`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A new row.
    Fresh(Snapshot),
    /// The latest tick is the one already returned.
    Stale,
    /// The latest tick went backwards; the producer restarted. The tick is recorded and the
    /// next newer tick reads as fresh.
    Reset { tick: i32 },
}

impl ReadOutcome {
    pub fn is_fresh(&self) -> bool {
        matches!(self, ReadOutcome::Fresh(_))
    }

    pub fn into_snapshot(self) -> Option<Snapshot> {
        match self {
            ReadOutcome::Fresh(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

/// Tick bookkeeping for consistent reads from one image.
#[derive(Debug, Clone, Default)]
pub struct SnapshotReader {
    last_tick: Option<i32>,
    last_fresh_at: Option<Instant>,
}

impl SnapshotReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tick of the last fresh or reset read; `None` until one happens.
    pub fn last_tick(&self) -> Option<i32> {
        self.last_tick
    }

    /// When the last fresh row was returned.
    pub fn last_fresh_at(&self) -> Option<Instant> {
        self.last_fresh_at
    }

    /// Forget the last tick so the next read is fresh.
    pub fn reset(&mut self) {
        self.last_tick = None;
    }

    /// Read the latest row if it is newer than the last one returned.
    pub fn read_latest<S: ByteSource + ?Sized>(&mut self, source: &S) -> Result<ReadOutcome> {
        let mut header = read_live_header(source)?;
        if !header.is_connected() {
            self.last_tick = None;
            return Err(TelemetryError::NotConnected);
        }

        for attempt in 1..=MAX_READ_ATTEMPTS {
            let slot = header.latest_slot();
            let observed = header.var_buf[slot].tick_count;
            if let Some(outcome) = self.classify(observed) {
                return Ok(outcome);
            }

            let range = header.row_range(slot)?;
            let row = source.read_vec(range.start, range.len(), "telemetry row")?;
            // the row copy must complete before the tick is re-read
            fence(Ordering::Acquire);
            let after = source.read_i32(Header::tick_count_offset(slot))?;
            if after == observed {
                trace!(tick = observed, slot, attempt, "Copied row");
                self.last_tick = Some(observed);
                self.last_fresh_at = Some(Instant::now());
                return Ok(ReadOutcome::Fresh(Snapshot { tick: observed, slot, row }));
            }

            debug!(slot, expected = observed, found = after, attempt, "Row overwritten during copy");
            header = read_live_header(source)?;
        }

        warn!(attempts = MAX_READ_ATTEMPTS, "Torn read");
        Err(TelemetryError::TornRead { attempts: MAX_READ_ATTEMPTS })
    }

    /// Stale or reset outcome for `observed`, or `None` if the tick is new.
    fn classify(&mut self, observed: i32) -> Option<ReadOutcome> {
        match self.last_tick {
            Some(last) if observed == last => {
                trace!(tick = observed, "No new tick");
                Some(ReadOutcome::Stale)
            }
            Some(last) if observed < last => {
                debug!(last, tick = observed, "Tick went backwards");
                self.last_tick = Some(observed);
                Some(ReadOutcome::Reset { tick: observed })
            }
            _ => None,
        }
    }
}

/// Decode the header currently in `source`.
pub fn read_live_header<S: ByteSource + ?Sized>(source: &S) -> Result<Header> {
    let mut bytes = [0u8; HEADER_SIZE];
    source.read_into(0, &mut bytes)?;
    Header::decode(&bytes)
}
