//! Driver information
//!
//! `DriverInfo` describes the player's car (head position, shift lights, fuel density) and
//! lists every entry in the session, indexed by `CarIdx` like the `CarIdx*` telemetry arrays.

use serde::{Deserialize, Serialize};

use super::{int_bool, quantity};

/// Player car and entry list (`DriverInfo`)
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct DriverInfo {
    /// `CarIdx` of the player's car
    pub driver_car_idx: i32,
    pub driver_head_pos_x: f32,
    pub driver_head_pos_y: f32,
    pub driver_head_pos_z: f32,
    #[serde(rename = "DriverCarIdleRPM")]
    pub driver_car_idle_rpm: f32,
    pub driver_car_red_line: f32,
    pub driver_car_fuel_kg_per_ltr: f32,
    #[serde(rename = "DriverCarSLFirstRPM")]
    pub driver_car_sl_first_rpm: f32,
    #[serde(rename = "DriverCarSLShiftRPM")]
    pub driver_car_sl_shift_rpm: f32,
    #[serde(rename = "DriverCarSLLastRPM")]
    pub driver_car_sl_last_rpm: f32,
    #[serde(rename = "DriverCarSLBlinkRPM")]
    pub driver_car_sl_blink_rpm: f32,
    pub driver_pit_trk_pct: f32,
    pub drivers: Vec<Driver>,
}

impl DriverInfo {
    /// Entry for a `CarIdx`.
    pub fn driver(&self, car_idx: i32) -> Option<&Driver> {
        self.drivers.iter().find(|d| d.car_idx == car_idx)
    }

    /// The player's own entry.
    pub fn player(&self) -> Option<&Driver> {
        self.driver(self.driver_car_idx)
    }
}

/// One entry in the session
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct Driver {
    pub car_idx: i32,
    pub user_name: String,
    pub abbrev_name: String,
    pub initials: String,
    #[serde(rename = "UserID")]
    pub user_id: i32,
    #[serde(rename = "TeamID")]
    pub team_id: i32,
    pub team_name: String,
    /// Displayed number; may carry leading zeros (`"007"`)
    pub car_number: String,
    /// Padded numeric form, see [`crate::pad_car_num`]
    pub car_number_raw: i32,
    pub car_path: String,
    #[serde(rename = "CarClassID")]
    pub car_class_id: i32,
    #[serde(rename = "CarID")]
    pub car_id: i32,
    pub car_screen_name: String,
    pub car_screen_name_short: String,
    pub car_class_short_name: String,
    pub car_class_rel_speed: i32,
    pub car_class_license_level: i32,
    pub car_class_max_fuel: String,
    pub car_class_weight_penalty: String,
    #[serde(rename = "IRating")]
    pub irating: i32,
    pub lic_level: i32,
    pub lic_sub_level: i32,
    pub lic_string: String,
    #[serde(deserialize_with = "int_bool")]
    pub is_spectator: bool,
    #[serde(rename = "CarIsPaceCar", deserialize_with = "int_bool")]
    pub is_pace_car: bool,
    #[serde(rename = "CarSponsor_1")]
    pub car_sponsor_1: i32,
    #[serde(rename = "CarSponsor_2")]
    pub car_sponsor_2: i32,
}

impl Driver {
    /// Class weight penalty in kilograms, if reported.
    pub fn weight_penalty_kg(&self) -> Option<f64> {
        quantity(&self.car_class_weight_penalty)
    }
}
