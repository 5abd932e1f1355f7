//! Variable descriptor (irsdk_varHeader) decoding
//!
//! ```c
//! typedef struct irsdk_varHeader
//! {
//!     int type;                       // irsdk_VarType
//!     int offset;                     // offset from start of buffer row
//!     int count;                      // number of entries (array)
//!     bool countAsTime;
//!     char pad[3];                    // (16 byte align)
//!     char name[IRSDK_MAX_STRING];            // 32
//!     char desc[IRSDK_MAX_DESC];              // 64
//!     char unit[IRSDK_MAX_STRING];            // 32
//! } irsdk_varHeader;
//! ```
//!
//! Each record is 144 bytes; descriptor *i* starts at `varHeaderOffset + i * 144`.

use std::collections::HashSet;
use tracing::{debug, warn};

use super::{
    Header, extract_null_terminated_string, non_negative, parse_i32_le, write_fixed_string,
};
use crate::types::{VarDescriptor, VariableType};
use crate::{Result, TelemetryError};

/// Size of one irsdk_varHeader record in bytes
pub const VAR_HEADER_SIZE: usize = 144;

const NAME_OFFSET: usize = 16;
const NAME_LEN: usize = 32;
const DESC_OFFSET: usize = 48;
const DESC_LEN: usize = 64;
const UNIT_OFFSET: usize = 112;
const UNIT_LEN: usize = 32;

impl VarDescriptor {
    /// Decode one descriptor record from the start of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let record = bytes.get(..VAR_HEADER_SIZE).ok_or_else(|| {
            TelemetryError::truncated("variable descriptor", VAR_HEADER_SIZE, bytes.len())
        })?;

        let var_type = VariableType::from_tag(parse_i32_le(record, 0, "variable descriptor")?)?;
        let offset = parse_i32_le(record, 4, "variable descriptor")?;
        let count = parse_i32_le(record, 8, "variable descriptor")?;

        Ok(VarDescriptor {
            name: extract_null_terminated_string(&record[NAME_OFFSET..NAME_OFFSET + NAME_LEN]),
            var_type,
            offset: non_negative(offset, "variable descriptor offset")?,
            count: non_negative(count, "variable descriptor count")?,
            count_as_time: record[12] != 0,
            description: extract_null_terminated_string(
                &record[DESC_OFFSET..DESC_OFFSET + DESC_LEN],
            ),
            unit: extract_null_terminated_string(&record[UNIT_OFFSET..UNIT_OFFSET + UNIT_LEN]),
        })
    }

    /// Encode into an irsdk_varHeader record. Strings longer than their field are cut.
    pub fn to_bytes(&self) -> Result<[u8; VAR_HEADER_SIZE]> {
        let offset = i32::try_from(self.offset)
            .map_err(|_| TelemetryError::parse("variable descriptor", "offset exceeds i32"))?;
        let count = i32::try_from(self.count)
            .map_err(|_| TelemetryError::parse("variable descriptor", "count exceeds i32"))?;

        let mut out = [0u8; VAR_HEADER_SIZE];
        out[0..4].copy_from_slice(&self.var_type.tag().to_le_bytes());
        out[4..8].copy_from_slice(&offset.to_le_bytes());
        out[8..12].copy_from_slice(&count.to_le_bytes());
        out[12] = u8::from(self.count_as_time);
        write_fixed_string(&mut out[NAME_OFFSET..NAME_OFFSET + NAME_LEN], &self.name);
        write_fixed_string(&mut out[DESC_OFFSET..DESC_OFFSET + DESC_LEN], &self.description);
        write_fixed_string(&mut out[UNIT_OFFSET..UNIT_OFFSET + UNIT_LEN], &self.unit);
        Ok(out)
    }
}

/// Decode the descriptor array described by `header` out of a full telemetry image.
pub fn decode_var_descriptors(bytes: &[u8], header: &Header) -> Result<Vec<VarDescriptor>> {
    let start = non_negative(header.var_header_offset, "header var_header_offset")?;
    let count = non_negative(header.num_vars, "header num_vars")?;
    let table = bytes.get(start..).unwrap_or_default();
    decode_var_descriptor_array(table, count)
}

/// Decode `count` consecutive descriptor records from the start of `table`.
pub fn decode_var_descriptor_array(table: &[u8], count: usize) -> Result<Vec<VarDescriptor>> {
    let needed = count.saturating_mul(VAR_HEADER_SIZE);
    if table.len() < needed {
        return Err(TelemetryError::truncated("variable descriptor array", needed, table.len()));
    }

    debug!(count, "Decoding variable descriptors");

    let mut seen = HashSet::with_capacity(count);
    let mut descriptors = Vec::with_capacity(count);
    for record in table[..needed].chunks_exact(VAR_HEADER_SIZE) {
        let descriptor = VarDescriptor::decode(record)?;
        if !seen.insert(descriptor.name.clone()) {
            warn!(name = %descriptor.name, "Duplicate variable name found");
        }
        descriptors.push(descriptor);
    }

    Ok(descriptors)
}
