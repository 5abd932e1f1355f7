//! Bitfield types for iRacing flag variables

use serde::{Deserialize, Serialize};

use super::irsdk_flags::{engine_warnings, session_flags};

/// Raw 32-bit bitfield value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitField(pub u32);

impl BitField {
    /// Create a new BitField from a u32 value.
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// Check if a specific bit is set.
    pub fn is_set(&self, bit: u32) -> bool {
        bit < 32 && (self.0 & (1 << bit)) != 0
    }

    /// Check if a specific flag is set using a bitmask.
    pub fn has_flag(&self, flag: u32) -> bool {
        (self.0 & flag) != 0
    }

    /// Get the raw u32 value.
    pub fn value(&self) -> u32 {
        self.0
    }
}

/// Static name to bitmask table for one bitfield variable.
#[derive(Debug)]
pub struct FlagTable {
    /// Variable name the table applies to (e.g. `SessionFlags`).
    pub variable: &'static str,
    /// Flag names and their masks, in SDK declaration order.
    pub entries: &'static [(&'static str, u32)],
}

impl FlagTable {
    /// Decode `raw` against this table.
    pub fn decode(&self, raw: u32) -> NamedFlags {
        let flags = self
            .entries
            .iter()
            .map(|&(name, mask)| (name, BitField(raw).has_flag(mask)))
            .collect();
        NamedFlags { raw, flags }
    }

    /// Mask for a flag name.
    pub fn mask(&self, name: &str) -> Option<u32> {
        self.entries.iter().find(|(flag, _)| *flag == name).map(|&(_, mask)| mask)
    }
}

/// A bitfield decoded into named booleans.
///
/// Every entry of the table is present, set or not. Bits with no table entry are kept
/// in [`NamedFlags::raw`] only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedFlags {
    raw: u32,
    flags: Vec<(&'static str, bool)>,
}

impl NamedFlags {
    pub fn raw(&self) -> u32 {
        self.raw
    }

    /// State of a named flag, or `None` if the table has no such flag.
    pub fn get(&self, name: &str) -> Option<bool> {
        self.flags.iter().find(|(flag, _)| *flag == name).map(|&(_, set)| set)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        self.flags.iter().copied()
    }

    /// Names of the flags that are set.
    pub fn active(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.flags.iter().filter(|(_, set)| *set).map(|&(name, _)| name)
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

/// Check if EngineWarnings indicate mandatory repair needed
pub fn engine_mandatory_repair_needed(bits: BitField) -> bool {
    bits.has_flag(engine_warnings::MAND_REP_NEEDED)
}

/// Check if EngineWarnings indicate optional repair needed
pub fn engine_optional_repair_needed(bits: BitField) -> bool {
    bits.has_flag(engine_warnings::OPT_REP_NEEDED)
}

/// Check if SessionFlags carry the checkered flag
pub fn session_checkered(flags: BitField) -> bool {
    flags.has_flag(session_flags::CHECKERED)
}

#[cfg(test)]
mod tests {
    use super::*;

    static ABC: FlagTable =
        FlagTable { variable: "Test", entries: &[("A", 1 << 0), ("B", 1 << 2), ("C", 1 << 1)] };

    #[test]
    fn decodes_named_bits_independently() {
        let flags = ABC.decode(0x0000_0005);
        assert_eq!(flags.get("A"), Some(true));
        assert_eq!(flags.get("C"), Some(false));
        assert_eq!(flags.get("B"), Some(true));
        assert_eq!(flags.get("D"), None);
        assert_eq!(flags.active().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(flags.raw(), 5);
    }

    #[test]
    fn unnamed_bits_stay_in_raw() {
        let flags = ABC.decode(0x8000_0000);
        assert_eq!(flags.active().count(), 0);
        assert_eq!(flags.len(), 3);
        assert_eq!(flags.raw(), 0x8000_0000);
    }

    #[test]
    fn bit_helpers() {
        let bits = BitField::new(0x0000_0180);
        assert!(engine_mandatory_repair_needed(bits));
        assert!(engine_optional_repair_needed(bits));
        assert!(!bits.is_set(0));
        assert!(bits.is_set(7));
        assert!(!bits.is_set(40));
        assert!(session_checkered(BitField(1)));
    }
}
