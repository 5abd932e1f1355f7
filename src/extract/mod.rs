//! Typed extraction of variables from a copied row.
//!
//! [`extract`] decodes one variable and fails if its descriptor points past the row.
//! [`decode_row`] decodes a whole row and never fails: a bad field is skipped and reported as
//! a [`DecodeWarning`] on the record.
//!
//! ```rust
//! use irtelem::extract::extract;
//! use irtelem::types::{Value, VarDescriptor, VariableType};
//!
//! let gear = VarDescriptor {
//!     name: "Gear".to_string(),
//!     var_type: VariableType::Int32,
//!     offset: 4,
//!     count: 1,
//!     count_as_time: false,
//!     description: String::new(),
//!     unit: String::new(),
//! };
//! let row = [0, 0, 0, 0, 3, 0, 0, 0];
//! assert_eq!(extract(&gear, &row).unwrap(), Value::Int(3));
//! ```

mod telemetry_data;

pub use telemetry_data::{DispatchReport, TelemetryData};

use tracing::{trace, warn};

use crate::types::{
    DecodeWarning, TelemetryRecord, Value, VarDescriptor, VariableType, flag_table,
};
use crate::{Result, TelemetryError};

/// Decode one variable from `row`.
///
/// Variables with `count > 1` become [`Value::Array`]. Bitfields with a known flag table
/// become [`Value::Flags`], others stay [`Value::BitField`].
pub fn extract(descriptor: &VarDescriptor, row: &[u8]) -> Result<Value> {
    let width = descriptor.width();
    let end = descriptor.offset.checked_add(width).filter(|&end| end <= row.len()).ok_or_else(|| {
        TelemetryError::FieldOutOfBounds {
            field: descriptor.name.clone(),
            offset: descriptor.offset,
            width,
            row_len: row.len(),
        }
    })?;

    let bytes = &row[descriptor.offset..end];
    let element_size = descriptor.var_type.size();
    if descriptor.count == 1 {
        return Ok(decode_element(descriptor, bytes));
    }
    Ok(Value::Array(
        bytes.chunks_exact(element_size).map(|chunk| decode_element(descriptor, chunk)).collect(),
    ))
}

fn decode_element(descriptor: &VarDescriptor, bytes: &[u8]) -> Value {
    match descriptor.var_type {
        VariableType::Char => Value::Char(bytes[0]),
        VariableType::Bool => Value::Bool(bytes[0] != 0),
        VariableType::Int32 => Value::Int(i32::from_le_bytes(word(bytes))),
        VariableType::BitField => {
            let raw = u32::from_le_bytes(word(bytes));
            match flag_table(&descriptor.name) {
                Some(table) => Value::Flags(table.decode(raw)),
                None => Value::BitField(raw),
            }
        }
        VariableType::Float32 => Value::Float(f32::from_le_bytes(word(bytes))),
        VariableType::Float64 => {
            let mut double = [0u8; 8];
            double.copy_from_slice(&bytes[..8]);
            Value::Double(f64::from_le_bytes(double))
        }
    }
}

fn word(bytes: &[u8]) -> [u8; 4] {
    [bytes[0], bytes[1], bytes[2], bytes[3]]
}

/// Decode every variable in `row` into a record stamped with `tick`.
pub fn decode_row(descriptors: &[VarDescriptor], row: &[u8], tick: i32) -> TelemetryRecord {
    let mut record = TelemetryRecord::with_capacity(tick, descriptors.len());
    for descriptor in descriptors {
        decode_into(&mut record, descriptor, row);
    }
    trace!(tick, fields = record.len(), warnings = record.warnings().len(), "Decoded row");
    record
}

/// Decode only the named variables. An empty filter decodes every variable.
///
/// Names with no descriptor are ignored.
pub fn decode_row_filtered<S: AsRef<str>>(
    descriptors: &[VarDescriptor],
    row: &[u8],
    tick: i32,
    fields: &[S],
) -> TelemetryRecord {
    if fields.is_empty() {
        return decode_row(descriptors, row, tick);
    }

    let mut record = TelemetryRecord::with_capacity(tick, fields.len());
    for descriptor in descriptors {
        if fields.iter().any(|field| field.as_ref() == descriptor.name) {
            decode_into(&mut record, descriptor, row);
        }
    }
    record
}

fn decode_into(record: &mut TelemetryRecord, descriptor: &VarDescriptor, row: &[u8]) {
    match extract(descriptor, row) {
        Ok(value) => {
            if descriptor.var_type == VariableType::BitField {
                if let Value::BitField(raw) = value {
                    record.warn(DecodeWarning::UnknownBitfield {
                        field: descriptor.name.clone(),
                        raw,
                    });
                }
            }
            record.insert(descriptor.name.clone(), value);
        }
        Err(TelemetryError::FieldOutOfBounds { field, offset, width, row_len }) => {
            warn!(%field, offset, width, row_len, "Variable outside row, skipped");
            record.warn(DecodeWarning::FieldOutOfBounds { field, offset, width, row_len });
        }
        Err(e) => {
            warn!(field = %descriptor.name, error = %e, "Failed to decode variable");
        }
    }
}
