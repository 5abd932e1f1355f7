//! Telemetry variable type definitions

use serde::{Deserialize, Serialize};

use super::NamedFlags;
use crate::{Result, TelemetryError};

/// Supported telemetry data types.
/// Maps to iRacing SDK's irsdk_VarType enum; the discriminant is the on-wire tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableType {
    /// 8-bit character (irsdk_char)
    Char = 0,
    /// Boolean stored in one byte (irsdk_bool)
    Bool = 1,
    /// 32-bit signed integer (irsdk_int)
    Int32 = 2,
    /// 32-bit bitfield (irsdk_bitField)
    BitField = 3,
    /// 32-bit floating point (irsdk_float)
    Float32 = 4,
    /// 64-bit floating point (irsdk_double)
    Float64 = 5,
}

impl VariableType {
    /// Decode a descriptor type tag.
    pub fn from_tag(tag: i32) -> Result<Self> {
        match tag {
            0 => Ok(VariableType::Char),
            1 => Ok(VariableType::Bool),
            2 => Ok(VariableType::Int32),
            3 => Ok(VariableType::BitField),
            4 => Ok(VariableType::Float32),
            5 => Ok(VariableType::Float64),
            other => Err(TelemetryError::parse(
                "variable descriptor",
                format!("unknown variable type tag {other}"),
            )),
        }
    }

    /// On-wire tag for this type.
    pub const fn tag(self) -> i32 {
        self as i32
    }

    /// Returns the size in bytes of this data type.
    /// Matches the irsdk_VarTypeBytes array from the iRacing SDK.
    pub const fn size(&self) -> usize {
        match self {
            VariableType::Char | VariableType::Bool => 1,
            VariableType::Int32 | VariableType::BitField | VariableType::Float32 => 4,
            VariableType::Float64 => 8,
        }
    }
}

/// A decoded telemetry value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    Char(u8),
    Bool(bool),
    Int(i32),
    /// Raw bitfield for variables without a known flag table.
    BitField(u32),
    /// Bitfield decoded against a known flag table.
    Flags(NamedFlags),
    Float(f32),
    Double(f64),
    /// One element per index for variables with `count > 1`.
    Array(Vec<Value>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Raw bits of a bitfield, decoded or not.
    pub fn as_bits(&self) -> Option<u32> {
        match self {
            Value::BitField(v) => Some(*v),
            Value::Flags(flags) => Some(flags.raw()),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Float(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    pub fn as_flags(&self) -> Option<&NamedFlags> {
        match self {
            Value::Flags(flags) => Some(flags),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }
}
