//! Fixed binary layout of the iRacing telemetry image.
//!
//! Live shared memory and `.ibt` disk logs share one byte layout:
//!
//! ```text
//! 0        112        144                var_header_offset     session_info_offset  buf_offset
//! | header | disk sub | ...              | varHeader[num_vars] | session YAML ...   | rows ...
//!            (disk only)
//! ```
//!
//! Everything here is pure decoding over byte slices. Records are decoded field by field
//! from little-endian bytes; nothing is reinterpreted in place, and every short input is a
//! [`TelemetryError::Truncated`] error.

pub mod header;
pub mod session;
pub mod variables;

pub use header::{
    BufferSlot, DISK_SUB_HEADER_SIZE, DiskSubHeader, HEADER_SIZE, Header, IRSDK_MAX_BUFS,
    IRSDK_STATUS_CONNECTED, IRSDK_VER, decode_disk_sub_header, decode_header,
};
pub use session::{
    SESSION_END_MARKER, SessionCache, SessionData, frame_session_info, preprocess_session_yaml,
    read_session_info,
};
pub use variables::{VAR_HEADER_SIZE, decode_var_descriptor_array, decode_var_descriptors};

use crate::{Result, TelemetryError};

fn field<const N: usize>(data: &[u8], offset: usize, what: &'static str) -> Result<[u8; N]> {
    data.get(offset..offset.saturating_add(N))
        .and_then(|bytes| <[u8; N]>::try_from(bytes).ok())
        .ok_or_else(|| TelemetryError::truncated(what, offset.saturating_add(N), data.len()))
}

pub(crate) fn parse_i32_le(data: &[u8], offset: usize, what: &'static str) -> Result<i32> {
    field::<4>(data, offset, what).map(i32::from_le_bytes)
}

pub(crate) fn parse_i64_le(data: &[u8], offset: usize, what: &'static str) -> Result<i64> {
    field::<8>(data, offset, what).map(i64::from_le_bytes)
}

pub(crate) fn parse_f64_le(data: &[u8], offset: usize, what: &'static str) -> Result<f64> {
    field::<8>(data, offset, what).map(f64::from_le_bytes)
}

/// Fixed-width, zero-terminated string field. Stops at the first NUL.
pub(crate) fn extract_null_terminated_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Copy `value` into a fixed-width field, truncating and zero-filling.
pub(crate) fn write_fixed_string(dst: &mut [u8], value: &str) {
    dst.fill(0);
    let bytes = value.as_bytes();
    // keep a terminating NUL
    let len = bytes.len().min(dst.len().saturating_sub(1));
    dst[..len].copy_from_slice(&bytes[..len]);
}

/// Convert a non-negative header field to a byte count.
pub(crate) fn non_negative(value: i32, context: &'static str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| TelemetryError::parse(context, format!("negative value {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_stop_at_first_nul() {
        assert_eq!(extract_null_terminated_string(b"RPM\0garbage\0"), "RPM");
        assert_eq!(extract_null_terminated_string(b"full"), "full");
        assert_eq!(extract_null_terminated_string(b"\0hidden"), "");
    }

    #[test]
    fn fixed_strings_keep_a_terminator() {
        let mut field = [0xAAu8; 4];
        write_fixed_string(&mut field, "Speed");
        assert_eq!(&field, b"Spe\0");
        assert_eq!(extract_null_terminated_string(&field), "Spe");
    }

    #[test]
    fn short_reads_are_truncated_errors() {
        let data = [1u8, 0, 0];
        assert!(matches!(
            parse_i32_le(&data, 0, "test"),
            Err(TelemetryError::Truncated { needed: 4, available: 3, .. })
        ));
        assert!(parse_i32_le(&data, usize::MAX, "test").is_err());
        assert_eq!(parse_i32_le(&[7, 0, 0, 0], 0, "test").ok(), Some(7));
    }

    #[test]
    fn negative_header_values_are_rejected() {
        assert!(non_negative(-1, "num_vars").is_err());
        assert_eq!(non_negative(12, "num_vars").ok(), Some(12));
    }
}
