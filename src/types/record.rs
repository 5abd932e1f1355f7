//! Decoded telemetry records

use serde::Serialize;
use std::collections::HashMap;

use super::{NamedFlags, Value};

/// Non-fatal problem found while decoding one field of a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DecodeWarning {
    /// The descriptor points past the end of the row; the field was skipped.
    FieldOutOfBounds { field: String, offset: usize, width: usize, row_len: usize },
    /// A bitfield variable with no flag table; the raw value was kept.
    UnknownBitfield { field: String, raw: u32 },
}

impl DecodeWarning {
    pub fn field(&self) -> &str {
        match self {
            DecodeWarning::FieldOutOfBounds { field, .. } => field,
            DecodeWarning::UnknownBitfield { field, .. } => field,
        }
    }
}

/// One decoded row: variable name to typed value, plus any per-field warnings.
///
/// `tick` is the producer tick for live reads and the sample index for disk logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryRecord {
    tick: i32,
    values: HashMap<String, Value>,
    warnings: Vec<DecodeWarning>,
}

impl TelemetryRecord {
    pub fn new(tick: i32) -> Self {
        Self { tick, values: HashMap::new(), warnings: Vec::new() }
    }

    pub fn with_capacity(tick: i32, capacity: usize) -> Self {
        Self { tick, values: HashMap::with_capacity(capacity), warnings: Vec::new() }
    }

    pub fn tick(&self) -> i32 {
        self.tick
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn warn(&mut self, warning: DecodeWarning) {
        self.warnings.push(warning);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn f32(&self, name: &str) -> Option<f32> {
        self.get(name).and_then(Value::as_f32)
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn i32(&self, name: &str) -> Option<i32> {
        self.get(name).and_then(Value::as_i32)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn flags(&self, name: &str) -> Option<&NamedFlags> {
        self.get(name).and_then(Value::as_flags)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn warnings(&self) -> &[DecodeWarning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
