//! Session list and results

use serde::{Deserialize, Serialize};

/// Session list (`SessionInfo`)
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct SessionList {
    pub sessions: Vec<Session>,
}

impl SessionList {
    /// Session with the given `SessionNum`.
    pub fn by_num(&self, session_num: i32) -> Option<&Session> {
        self.sessions.iter().find(|s| s.session_num == session_num)
    }
}

/// One session of the weekend (practice, qualify, race)
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct Session {
    pub session_num: i32,
    /// Lap count, or `"unlimited"`
    pub session_laps: String,
    /// Duration with unit, or `"unlimited"`
    pub session_time: String,
    pub session_num_laps_to_avg: i32,
    pub session_type: String,
    /// Null until the session has results
    #[serde(deserialize_with = "nullable_list")]
    pub results_positions: Vec<ResultPosition>,
    #[serde(deserialize_with = "nullable_list")]
    pub results_fastest_lap: Vec<ResultFastestLap>,
    pub results_average_lap_time: f32,
    pub results_num_caution_flags: i32,
    pub results_num_caution_laps: i32,
    pub results_num_lead_changes: i32,
    pub results_laps_complete: i32,
    pub results_official: i32,
}

impl Session {
    /// Classified position of a car in this session's results.
    pub fn position_of(&self, car_idx: i32) -> Option<&ResultPosition> {
        self.results_positions.iter().find(|p| p.car_idx == car_idx)
    }
}

/// One row of `ResultsPositions`
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct ResultPosition {
    pub car_idx: i32,
    pub position: i32,
    pub class_position: i32,
    pub fastest_time: f32,
    pub lap: i32,
    pub last_time: f32,
    pub laps_complete: i32,
    pub laps_driven: i32,
    pub reason_out_id: i32,
}

/// One row of `ResultsFastestLap`
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct ResultFastestLap {
    pub car_idx: i32,
    pub fastest_lap: i32,
    pub fastest_time: f32,
}

fn nullable_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
