//! Split timing sectors

use serde::{Deserialize, Serialize};

/// Split timing information (`SplitTimeInfo`)
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct SplitTimeInfo {
    pub sectors: Vec<Sector>,
}

impl SplitTimeInfo {
    /// Sector containing a lap-distance fraction in `0.0..1.0`.
    pub fn sector_at(&self, lap_dist_pct: f32) -> Option<&Sector> {
        self.sectors.iter().rev().find(|s| s.sector_start_pct <= lap_dist_pct)
    }
}

/// Individual sector
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct Sector {
    pub sector_num: i32,
    /// Start of the sector as a fraction of the lap
    pub sector_start_pct: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sector_lookup_by_lap_fraction() {
        let info = SplitTimeInfo {
            sectors: vec![
                Sector { sector_num: 0, sector_start_pct: 0.0 },
                Sector { sector_num: 1, sector_start_pct: 0.35 },
                Sector { sector_num: 2, sector_start_pct: 0.7 },
            ],
        };
        assert_eq!(info.sector_at(0.1).map(|s| s.sector_num), Some(0));
        assert_eq!(info.sector_at(0.35).map(|s| s.sector_num), Some(1));
        assert_eq!(info.sector_at(0.99).map(|s| s.sector_num), Some(2));
        assert!(SplitTimeInfo::default().sector_at(0.5).is_none());
    }
}
