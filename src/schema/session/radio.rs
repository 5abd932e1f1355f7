//! Radio and frequency information

use serde::{Deserialize, Serialize};

use super::int_bool;

/// Radio information (`RadioInfo`)
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct RadioInfo {
    pub selected_radio_num: i32,
    pub radios: Vec<Radio>,
}

/// One radio
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct Radio {
    pub radio_num: i32,
    pub hop_count: i32,
    pub num_frequencies: i32,
    pub tuned_to_frequency_num: i32,
    #[serde(deserialize_with = "int_bool")]
    pub scanning_is_on: bool,
    pub frequencies: Vec<Frequency>,
}

impl Radio {
    /// The frequency the radio is tuned to.
    pub fn tuned(&self) -> Option<&Frequency> {
        self.frequencies.iter().find(|f| f.frequency_num == self.tuned_to_frequency_num)
    }
}

/// Radio frequency (channel)
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct Frequency {
    pub frequency_num: i32,
    /// Channel name, e.g. `"@ALLTEAMS"`
    pub frequency_name: String,
    pub priority: i32,
    pub car_idx: i32,
    pub entry_idx: i32,
    #[serde(rename = "ClubID")]
    pub club_id: i32,
    #[serde(deserialize_with = "int_bool")]
    pub can_scan: bool,
    #[serde(deserialize_with = "int_bool")]
    pub can_squawk: bool,
    #[serde(deserialize_with = "int_bool")]
    pub muted: bool,
    #[serde(deserialize_with = "int_bool")]
    pub is_mutable: bool,
    #[serde(deserialize_with = "int_bool")]
    pub is_deletable: bool,
}
