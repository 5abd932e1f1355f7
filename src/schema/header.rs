//! iRacing header and disk sub-header decoding
//!
//! The header follows the C structure layout from the iRacing SDK:
//! ```c
//! typedef struct irsdk_varBuf
//! {
//!     int tickCount;              // used to detect changes in data
//!     int bufOffset;              // offset from header
//!     int pad[2];                 // (16 byte align)
//! } irsdk_varBuf;
//!
//! typedef struct irsdk_header
//! {
//!     int ver;                    // api version, 2 for current clients
//!     int status;                 // bitfield using irsdk_StatusField
//!     int tickRate;               // ticks per second (60 or 360 etc)
//!     int sessionInfoUpdate;      // incremented when session info changes
//!     int sessionInfoLen;         // length in bytes of session info string
//!     int sessionInfoOffset;      // session info, encoded in YAML format
//!     int numVars;                // length of array pointed to by varHeaderOffset
//!     int varHeaderOffset;        // offset to irsdk_varHeader[numVars] array
//!     int numBuf;                 // <= IRSDK_MAX_BUFS (3 for now)
//!     int bufLen;                 // length in bytes for one line
//!     int pad1[2];                // (16 byte align)
//!     irsdk_varBuf varBuf[IRSDK_MAX_BUFS];
//! } irsdk_header;
//!
//! typedef struct irsdk_diskSubHeader
//! {
//!     time_t sessionStartDate;
//!     double sessionStartTime;
//!     double sessionEndTime;
//!     int sessionLapCount;
//!     int sessionRecordCount;
//! } irsdk_diskSubHeader;
//! ```
//!
//! The header is 112 bytes. Disk logs place the 32-byte sub-header directly after it.
//!
//! # Buffer rotation
//!
//! The producer rotates through `numBuf` row buffers and publishes each by bumping that
//! slot's tick count. The latest row is the slot with the highest tick; ties go to the lowest
//! index, the same scan the producer and the SDK use.

use serde::Serialize;
use std::ops::Range;
use tracing::{debug, trace};

use super::{non_negative, parse_f64_le, parse_i32_le, parse_i64_le};
use crate::{Result, TelemetryError};

/// The expected iRacing SDK version
pub const IRSDK_VER: i32 = 2;

/// Status flag indicating that the simulator is actively publishing telemetry
pub const IRSDK_STATUS_CONNECTED: i32 = 0x1;

/// Maximum number of rotating row buffers
pub const IRSDK_MAX_BUFS: usize = 4;

/// Size of `irsdk_header` in bytes
pub const HEADER_SIZE: usize = 112;

/// Size of `irsdk_diskSubHeader` in bytes
pub const DISK_SUB_HEADER_SIZE: usize = 32;

const VAR_BUF_OFFSET: usize = 48;
const VAR_BUF_SIZE: usize = 16;

/// One rotating row buffer descriptor (irsdk_varBuf).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BufferSlot {
    /// Tick at which the slot was last published
    pub tick_count: i32,
    /// Byte offset of the slot's row from the start of the image
    pub buf_offset: i32,
}

/// Decoded irsdk_header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Header {
    pub ver: i32,
    pub status: i32,
    pub tick_rate: i32,
    pub session_info_update: i32,
    pub session_info_len: i32,
    pub session_info_offset: i32,
    pub num_vars: i32,
    pub var_header_offset: i32,
    pub num_buf: i32,
    pub buf_len: i32,
    pub var_buf: [BufferSlot; IRSDK_MAX_BUFS],
}

/// Decode the fixed header at the start of `bytes`.
pub fn decode_header(bytes: &[u8]) -> Result<Header> {
    Header::decode(bytes)
}

impl Header {
    /// Decode the fixed header at the start of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(TelemetryError::truncated("header", HEADER_SIZE, bytes.len()));
        }

        let int = |offset| parse_i32_le(bytes, offset, "header");
        let mut var_buf = [BufferSlot::default(); IRSDK_MAX_BUFS];
        for (i, slot) in var_buf.iter_mut().enumerate() {
            let base = VAR_BUF_OFFSET + i * VAR_BUF_SIZE;
            *slot = BufferSlot { tick_count: int(base)?, buf_offset: int(base + 4)? };
        }

        let header = Header {
            ver: int(0)?,
            status: int(4)?,
            tick_rate: int(8)?,
            session_info_update: int(12)?,
            session_info_len: int(16)?,
            session_info_offset: int(20)?,
            num_vars: int(24)?,
            var_header_offset: int(28)?,
            num_buf: int(32)?,
            buf_len: int(36)?,
            var_buf,
        };
        trace!(?header, "Decoded header");
        Ok(header)
    }

    /// Encode into the on-wire layout. Reserved fields are written as zero.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        let fields = [
            self.ver,
            self.status,
            self.tick_rate,
            self.session_info_update,
            self.session_info_len,
            self.session_info_offset,
            self.num_vars,
            self.var_header_offset,
            self.num_buf,
            self.buf_len,
        ];
        for (i, value) in fields.iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(&value.to_le_bytes());
        }
        for (i, slot) in self.var_buf.iter().enumerate() {
            let base = VAR_BUF_OFFSET + i * VAR_BUF_SIZE;
            out[base..base + 4].copy_from_slice(&slot.tick_count.to_le_bytes());
            out[base + 4..base + 8].copy_from_slice(&slot.buf_offset.to_le_bytes());
        }
        out
    }

    /// Status bit 0: the simulator is publishing.
    pub fn is_connected(&self) -> bool {
        self.status & IRSDK_STATUS_CONNECTED != 0
    }

    /// Number of slots in use, clamped to the array size.
    pub fn active_slots(&self) -> usize {
        usize::try_from(self.num_buf).unwrap_or(0).clamp(1, IRSDK_MAX_BUFS)
    }

    /// Index of the slot with the highest tick count, lowest index on ties.
    pub fn latest_slot(&self) -> usize {
        let mut latest = 0;
        for i in 1..self.active_slots() {
            if self.var_buf[latest].tick_count < self.var_buf[i].tick_count {
                latest = i;
            }
        }
        latest
    }

    /// Byte offset of a slot's tick count within the header.
    pub fn tick_count_offset(slot: usize) -> usize {
        VAR_BUF_OFFSET + slot * VAR_BUF_SIZE
    }

    /// Length of one row in bytes.
    pub fn row_len(&self) -> Result<usize> {
        non_negative(self.buf_len, "header buf_len")
    }

    /// Byte range of the row held by `slot`.
    pub fn row_range(&self, slot: usize) -> Result<Range<usize>> {
        let slot = self.var_buf.get(slot).ok_or_else(|| {
            TelemetryError::parse("header", format!("buffer slot {slot} out of range"))
        })?;
        let start = non_negative(slot.buf_offset, "header buf_offset")?;
        Ok(start..start.saturating_add(self.row_len()?))
    }

    /// Byte range of the session info string.
    pub fn session_info_range(&self) -> Result<Range<usize>> {
        let start = non_negative(self.session_info_offset, "header session_info_offset")?;
        let len = non_negative(self.session_info_len, "header session_info_len")?;
        Ok(start..start.saturating_add(len))
    }

    /// Check the header describes a readable image.
    ///
    /// Used once at connect time; per-tick reads only look at status and slot ticks.
    pub fn validate(&self, expected_version: i32) -> Result<()> {
        if self.ver != expected_version {
            return Err(TelemetryError::Version { expected: expected_version, found: self.ver });
        }
        non_negative(self.num_vars, "header num_vars")?;
        non_negative(self.var_header_offset, "header var_header_offset")?;
        self.session_info_range()?;
        self.row_len()?;
        if !(1..=IRSDK_MAX_BUFS as i32).contains(&self.num_buf) {
            return Err(TelemetryError::parse(
                "header",
                format!("num_buf {} outside 1..={}", self.num_buf, IRSDK_MAX_BUFS),
            ));
        }
        for slot in 0..self.active_slots() {
            self.row_range(slot)?;
        }

        debug!(
            ver = self.ver,
            tick_rate = self.tick_rate,
            num_vars = self.num_vars,
            num_buf = self.num_buf,
            buf_len = self.buf_len,
            "Validated header"
        );
        Ok(())
    }
}

/// Decoded irsdk_diskSubHeader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DiskSubHeader {
    /// Session start as a Unix timestamp
    pub session_start_date: i64,
    /// Session time at the first sample, in seconds
    pub session_start_time: f64,
    /// Session time at the last sample, in seconds
    pub session_end_time: f64,
    pub session_lap_count: i32,
    /// Sample count as written by the producer. Not trusted for iteration.
    pub session_record_count: i32,
}

/// Decode the disk sub-header from the 32 bytes following the header.
pub fn decode_disk_sub_header(bytes: &[u8]) -> Result<DiskSubHeader> {
    DiskSubHeader::decode(bytes)
}

impl DiskSubHeader {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < DISK_SUB_HEADER_SIZE {
            return Err(TelemetryError::truncated(
                "disk sub-header",
                DISK_SUB_HEADER_SIZE,
                bytes.len(),
            ));
        }
        Ok(DiskSubHeader {
            session_start_date: parse_i64_le(bytes, 0, "disk sub-header")?,
            session_start_time: parse_f64_le(bytes, 8, "disk sub-header")?,
            session_end_time: parse_f64_le(bytes, 16, "disk sub-header")?,
            session_lap_count: parse_i32_le(bytes, 24, "disk sub-header")?,
            session_record_count: parse_i32_le(bytes, 28, "disk sub-header")?,
        })
    }

    pub fn to_bytes(&self) -> [u8; DISK_SUB_HEADER_SIZE] {
        let mut out = [0u8; DISK_SUB_HEADER_SIZE];
        out[0..8].copy_from_slice(&self.session_start_date.to_le_bytes());
        out[8..16].copy_from_slice(&self.session_start_time.to_le_bytes());
        out[16..24].copy_from_slice(&self.session_end_time.to_le_bytes());
        out[24..28].copy_from_slice(&self.session_lap_count.to_le_bytes());
        out[28..32].copy_from_slice(&self.session_record_count.to_le_bytes());
        out
    }
}
