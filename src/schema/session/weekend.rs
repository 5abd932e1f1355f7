//! Weekend and track information
//!
//! Values the simulator reports with units (`"3.70 km"`, `"25.56 C"`) are kept as text;
//! [`quantity`] pulls out the leading number.

use serde::{Deserialize, Serialize};

use super::int_bool;

/// Weekend and track information (`WeekendInfo`)
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct WeekendInfo {
    pub track_name: String,
    #[serde(rename = "TrackID")]
    pub track_id: i32,
    /// Track length with unit, e.g. `"5.51 km"`
    pub track_length: String,
    pub track_display_name: String,
    pub track_display_short_name: String,
    pub track_config_name: String,
    pub track_city: String,
    pub track_country: String,
    pub track_altitude: String,
    pub track_latitude: String,
    pub track_longitude: String,
    pub track_num_turns: i32,
    pub track_pit_speed_limit: String,
    /// Road course, oval, etc.
    pub track_type: String,
    pub track_weather_type: String,
    pub track_skies: String,
    pub track_surface_temp: String,
    pub track_air_temp: String,
    pub track_air_pressure: String,
    pub track_wind_vel: String,
    pub track_wind_dir: String,
    pub track_relative_humidity: String,
    pub track_fog_level: String,
    #[serde(rename = "SeriesID")]
    pub series_id: i32,
    #[serde(rename = "SeasonID")]
    pub season_id: i32,
    #[serde(rename = "SessionID")]
    pub session_id: i32,
    #[serde(rename = "SubSessionID")]
    pub sub_session_id: i32,
    #[serde(rename = "LeagueID")]
    pub league_id: i32,
    pub official: i32,
    pub race_week: i32,
    pub event_type: String,
    pub category: String,
    pub sim_mode: String,
    pub team_racing: i32,
    pub min_drivers: i32,
    pub max_drivers: i32,
    #[serde(rename = "DCRuleSet")]
    pub dc_rule_set: String,
    #[serde(deserialize_with = "int_bool")]
    pub qualifier_must_start_race: bool,
    pub num_car_classes: i32,
    pub num_car_types: i32,
    pub weekend_options: WeekendOptions,
    pub telemetry_options: TelemetryOptions,
}

impl WeekendInfo {
    /// Track length in kilometres, if the reported value has a leading number.
    pub fn track_length_km(&self) -> Option<f64> {
        quantity(&self.track_length)
    }
}

/// Weekend options (`WeekendInfo.WeekendOptions`)
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct WeekendOptions {
    pub num_starters: i32,
    pub starting_grid: String,
    pub qualify_scoring: String,
    pub course_cautions: String,
    #[serde(deserialize_with = "int_bool")]
    pub standing_start: bool,
    pub restarts: String,
    pub weather_type: String,
    pub skies: String,
    pub wind_direction: String,
    pub wind_speed: String,
    pub weather_temp: String,
    pub relative_humidity: String,
    pub fog_level: String,
    #[serde(deserialize_with = "int_bool")]
    pub unofficial: bool,
    pub commercial_mode: String,
    #[serde(deserialize_with = "int_bool")]
    pub night_mode: bool,
    #[serde(deserialize_with = "int_bool")]
    pub is_fixed_setup: bool,
    pub strict_laps_checking: String,
    #[serde(deserialize_with = "int_bool")]
    pub has_open_registration: bool,
    pub hardcore_level: i32,
}

/// Telemetry options (`WeekendInfo.TelemetryOptions`)
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct TelemetryOptions {
    /// Path of the disk log being written, if any
    pub telemetry_disk_file: String,
}

/// Leading number of a `"<value> <unit>"` string.
///
/// ```rust
/// use irtelem::schema::session::quantity;
///
/// assert_eq!(quantity("3.70 km"), Some(3.70));
/// assert_eq!(quantity("-12.5 C"), Some(-12.5));
/// assert_eq!(quantity("unlimited"), None);
/// ```
pub fn quantity(text: &str) -> Option<f64> {
    text.split_whitespace().next()?.parse().ok()
}
