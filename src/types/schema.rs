//! Variable descriptors and the per-connection schema built from them

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::VariableType;
use crate::{Result, TelemetryError};

/// Metadata for one telemetry variable, decoded from an irsdk_varHeader record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarDescriptor {
    /// Variable name as defined by iRacing
    pub name: String,
    /// Data type of each element
    pub var_type: VariableType,
    /// Byte offset within a row
    pub offset: usize,
    /// Number of elements (1 for scalar, >1 for arrays)
    pub count: usize,
    /// Whether array entries are a time series rather than per-car values
    pub count_as_time: bool,
    /// Human-readable description
    pub description: String,
    /// Units of measurement (e.g., "m/s", "C", "N*m")
    pub unit: String,
}

impl VarDescriptor {
    /// Bytes the variable occupies in a row.
    pub fn width(&self) -> usize {
        self.var_type.size().saturating_mul(self.count)
    }

    /// First byte past the variable.
    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.width())
    }
}

/// Ordered descriptor table with O(1) lookup by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VariableSchema {
    descriptors: Vec<VarDescriptor>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    /// Length in bytes of one row
    pub row_len: usize,
}

impl VariableSchema {
    /// Build a schema from descriptors in header order.
    ///
    /// Duplicate names keep the first descriptor for lookups, like the SDK's linear search.
    pub fn new(descriptors: Vec<VarDescriptor>, row_len: usize) -> Self {
        let mut index = HashMap::with_capacity(descriptors.len());
        for (i, descriptor) in descriptors.iter().enumerate() {
            index.entry(descriptor.name.clone()).or_insert(i);
        }
        Self { descriptors, index, row_len }
    }

    pub fn descriptors(&self) -> &[VarDescriptor] {
        &self.descriptors
    }

    /// Get a descriptor by name.
    pub fn get(&self, name: &str) -> Option<&VarDescriptor> {
        self.index_of(name).and_then(|i| self.descriptors.get(i))
    }

    /// Position of a variable in the descriptor table.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Row offset of a variable.
    pub fn offset_of(&self, name: &str) -> Result<usize> {
        self.get(name)
            .map(|d| d.offset)
            .ok_or_else(|| TelemetryError::FieldNotFound { field: name.to_string() })
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Descriptors that do not fit inside a row.
    pub fn out_of_bounds(&self) -> impl Iterator<Item = &VarDescriptor> {
        self.descriptors.iter().filter(move |d| d.end() > self.row_len)
    }
}
