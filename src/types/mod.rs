//! Core types for telemetry data representation.
//!
//! These map to iRacing SDK structures:
//! - [`VariableType`] maps to `irsdk_VarType` with size information
//! - [`VarDescriptor`] and [`VariableSchema`] describe the variables in a row
//! - [`Value`] and [`TelemetryRecord`] hold decoded data
//! - [`BitField`], [`FlagTable`] and [`NamedFlags`] handle bitfield variables
//!
//! ## Usage Example
//!
//! ```rust
//! use irtelem::types::{irsdk_flags, Value};
//!
//! let flags = irsdk_flags::ENGINE_WARNINGS.decode(0x0000_0011);
//! assert_eq!(flags.get("PitSpeedLimiter"), Some(true));
//! assert_eq!(flags.get("EngineStalled"), Some(false));
//!
//! let value = Value::Flags(flags);
//! assert_eq!(value.as_bits(), Some(0x11));
//! ```

mod bitfield;
pub mod irsdk_flags;
mod record;
mod schema;
mod update_rate;
mod variable_type;

pub use bitfield::{
    BitField, FlagTable, NamedFlags, engine_mandatory_repair_needed,
    engine_optional_repair_needed, session_checkered,
};
pub use irsdk_flags::{SessionState, TrackLocation, flag_table};
pub use record::{DecodeWarning, TelemetryRecord};
pub use schema::{VarDescriptor, VariableSchema};
pub use update_rate::UpdateRate;
pub use variable_type::{Value, VariableType};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn bitfield_flag_operations(value in any::<u32>(), bit_index in 0..32u32) {
            let bitfield = BitField::new(value);
            let expected = (value & (1 << bit_index)) != 0;
            prop_assert_eq!(bitfield.is_set(bit_index), expected);
            prop_assert_eq!(bitfield.has_flag(1 << bit_index), expected);
        }

        #[test]
        fn named_flags_agree_with_raw_bits(raw in any::<u32>()) {
            for table in irsdk_flags::FLAG_TABLES {
                let flags = table.decode(raw);
                prop_assert_eq!(flags.raw(), raw);
                prop_assert_eq!(flags.len(), table.entries.len());
                for (name, set) in flags.iter() {
                    let mask = table.mask(name).unwrap_or_default();
                    prop_assert_eq!(set, raw & mask != 0);
                }
            }
        }

        #[test]
        fn descriptor_end_never_overflows(
            offset in any::<usize>(),
            count in any::<usize>(),
        ) {
            let descriptor = VarDescriptor {
                name: "Any".to_string(),
                var_type: VariableType::Float64,
                offset,
                count,
                count_as_time: false,
                description: String::new(),
                unit: String::new(),
            };
            prop_assert!(descriptor.end() >= descriptor.offset);
        }
    }

    #[test]
    fn record_accessors_are_type_checked() {
        let mut record = TelemetryRecord::new(42);
        record.insert("Speed", Value::Float(31.5));
        record.insert("Gear", Value::Int(3));
        record.insert("IsOnTrack", Value::Bool(true));
        record.insert("SessionFlags", Value::Flags(irsdk_flags::SESSION_FLAGS.decode(0x4)));

        assert_eq!(record.tick(), 42);
        assert_eq!(record.f32("Speed"), Some(31.5));
        assert_eq!(record.i32("Speed"), None);
        assert_eq!(record.i32("Gear"), Some(3));
        assert_eq!(record.bool("IsOnTrack"), Some(true));
        assert_eq!(record.flags("SessionFlags").and_then(|f| f.get("Green")), Some(true));
        assert!(record.warnings().is_empty());
        assert_eq!(record.len(), 4);
    }
}
