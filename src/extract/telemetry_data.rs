//! Typed view over a decoded record.
//!
//! [`TelemetryData`] holds the commonly used variables as plain fields. A record is applied
//! through a `match` on the variable name generated by [`telemetry_data!`]; names with no
//! field, and values whose type does not fit the field, are reported rather than dropped
//! silently.

use serde::Serialize;
use tracing::debug;

use crate::types::{NamedFlags, SessionState, TelemetryRecord, TrackLocation, Value};

/// Conversion from a decoded [`Value`] into a field type.
trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;

    #[cfg(test)]
    fn sample() -> Value;
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }

    #[cfg(test)]
    fn sample() -> Value {
        Value::Bool(true)
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_i32()
    }

    #[cfg(test)]
    fn sample() -> Value {
        Value::Int(7)
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_f32()
    }

    #[cfg(test)]
    fn sample() -> Value {
        Value::Float(1.5)
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }

    #[cfg(test)]
    fn sample() -> Value {
        Value::Double(2.5)
    }
}

impl FromValue for Option<NamedFlags> {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_flags().cloned().map(Some)
    }

    #[cfg(test)]
    fn sample() -> Value {
        Value::Flags(crate::types::irsdk_flags::SESSION_FLAGS.decode(0x1))
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_array()?.iter().map(T::from_value).collect()
    }

    #[cfg(test)]
    fn sample() -> Value {
        Value::Array(vec![T::sample(), T::sample()])
    }
}

/// Variables in a record that [`TelemetryData`] could not take.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Names with no field
    pub unmapped: Vec<String>,
    /// Names whose value had the wrong type or shape for the field
    pub mismatched: Vec<String>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.unmapped.is_empty() && self.mismatched.is_empty()
    }
}

enum Assign {
    Set,
    Mismatch,
    Unknown,
}

macro_rules! telemetry_data {
    ($( $(#[$meta:meta])* $field:ident : $ty:ty = $name:literal, )*) => {
        /// Commonly used telemetry variables.
        ///
        /// Fields keep their default until a record carrying the variable is applied.
        /// Bitfields with a flag table are `Some` once seen; `CarIdx*` arrays hold one entry
        /// per car index.
        #[derive(Debug, Clone, Default, PartialEq, Serialize)]
        pub struct TelemetryData {
            $( $(#[$meta])* pub $field: $ty, )*
        }

        impl TelemetryData {
            /// Variable names with a field, in declaration order.
            pub const FIELD_NAMES: &'static [&'static str] = &[$($name),*];

            fn assign(&mut self, name: &str, value: &Value) -> Assign {
                match name {
                    $(
                        $name => match <$ty as FromValue>::from_value(value) {
                            Some(v) => {
                                self.$field = v;
                                Assign::Set
                            }
                            None => Assign::Mismatch,
                        },
                    )*
                    _ => Assign::Unknown,
                }
            }

            #[cfg(test)]
            fn sample_for(name: &str) -> Option<Value> {
                match name {
                    $( $name => Some(<$ty as FromValue>::sample()), )*
                    _ => None,
                }
            }

            #[cfg(test)]
            fn changed_fields(&self, other: &Self) -> Vec<&'static str> {
                let mut changed = Vec::new();
                $(
                    if self.$field != other.$field {
                        changed.push($name);
                    }
                )*
                changed
            }
        }
    };
}

telemetry_data! {
    // bools
    driver_marker: bool = "DriverMarker",
    is_on_track: bool = "IsOnTrack",
    is_replay_playing: bool = "IsReplayPlaying",
    is_disk_logging_enabled: bool = "IsDiskLoggingEnabled",
    is_disk_logging_active: bool = "IsDiskLoggingActive",
    on_pit_road: bool = "OnPitRoad",
    lap_delta_to_best_lap_ok: bool = "LapDeltaToBestLap_OK",
    lap_delta_to_optimal_lap_ok: bool = "LapDeltaToOptimalLap_OK",
    lap_delta_to_session_best_lap_ok: bool = "LapDeltaToSessionBestLap_OK",
    lap_delta_to_session_optimal_lap_ok: bool = "LapDeltaToSessionOptimalLap_OK",
    lap_delta_to_session_last_lap_ok: bool = "LapDeltaToSessionLastlLap_OK",
    is_on_track_car: bool = "IsOnTrackCar",
    is_in_garage: bool = "IsInGarage",
    replay_play_slow_motion: bool = "ReplayPlaySlowMotion",

    // ints
    session_num: i32 = "SessionNum",
    /// See [`TelemetryData::session_state`]
    session_state: i32 = "SessionState",
    session_unique_id: i32 = "SessionUniqueID",
    session_laps_remain: i32 = "SessionLapsRemain",
    radio_transmit_car_idx: i32 = "RadioTransmitCarIdx",
    radio_transmit_radio_idx: i32 = "RadioTransmitRadioIdx",
    radio_transmit_frequency_idx: i32 = "RadioTransmitFrequencyIdx",
    replay_frame_num: i32 = "ReplayFrameNum",
    replay_frame_num_end: i32 = "ReplayFrameNumEnd",
    /// -1 reverse, 0 neutral, 1.. forward gears
    gear: i32 = "Gear",
    lap: i32 = "Lap",
    race_laps: i32 = "RaceLaps",
    lap_best_lap: i32 = "LapBestLap",
    cam_car_idx: i32 = "CamCarIdx",
    cam_camera_number: i32 = "CamCameraNumber",
    cam_group_number: i32 = "CamGroupNumber",
    replay_play_speed: i32 = "ReplayPlaySpeed",
    replay_session_num: i32 = "ReplaySessionNum",
    /// 0 English, 1 metric
    display_units: i32 = "DisplayUnits",
    player_car_position: i32 = "PlayerCarPosition",
    player_car_class_position: i32 = "PlayerCarClassPosition",
    lap_las_n_lap_seq: i32 = "LapLasNLapSeq",
    lap_best_n_lap_lap: i32 = "LapBestNLapLap",
    enter_exit_reset: i32 = "EnterExitReset",
    dc_lap_status: i32 = "DCLapStatus",
    dc_drivers_so_far: i32 = "DCDriversSoFar",
    weather_type: i32 = "WeatherType",
    skies: i32 = "Skies",

    // bitfields
    session_flags: Option<NamedFlags> = "SessionFlags",
    cam_camera_state: Option<NamedFlags> = "CamCameraState",
    engine_warnings: Option<NamedFlags> = "EngineWarnings",
    pit_sv_flags: Option<NamedFlags> = "PitSvFlags",

    // per-car arrays
    car_idx_on_pit_road: Vec<bool> = "CarIdxOnPitRoad",
    car_idx_lap: Vec<i32> = "CarIdxLap",
    /// See [`TelemetryData::track_surface`]
    car_idx_track_surface: Vec<i32> = "CarIdxTrackSurface",
    car_idx_gear: Vec<i32> = "CarIdxGear",
    car_idx_position: Vec<i32> = "CarIdxPosition",
    car_idx_class_position: Vec<i32> = "CarIdxClassPosition",
    car_idx_lap_dist_pct: Vec<f32> = "CarIdxLapDistPct",
    car_idx_steer: Vec<f32> = "CarIdxSteer",
    car_idx_rpm: Vec<f32> = "CarIdxRPM",
    car_idx_f2_time: Vec<f32> = "CarIdxF2Time",
    car_idx_est_time: Vec<f32> = "CarIdxEstTime",

    // floats
    frame_rate: f32 = "FrameRate",
    cpu_usage_bg: f32 = "CpuUsageBG",
    steering_wheel_angle: f32 = "SteeringWheelAngle",
    throttle: f32 = "Throttle",
    brake: f32 = "Brake",
    clutch: f32 = "Clutch",
    rpm: f32 = "RPM",
    lap_dist: f32 = "LapDist",
    lap_dist_pct: f32 = "LapDistPct",
    lap_best_lap_time: f32 = "LapBestLapTime",
    lap_last_lap_time: f32 = "LapLastLapTime",
    lap_current_lap_time: f32 = "LapCurrentLapTime",
    lap_delta_to_best_lap: f32 = "LapDeltaToBestLap",
    lap_delta_to_best_lap_dd: f32 = "LapDeltaToBestLap_DD",
    lap_delta_to_optimal_lap: f32 = "LapDeltaToOptimalLap",
    lap_delta_to_optimal_lap_dd: f32 = "LapDeltaToOptimalLap_DD",
    lap_delta_to_session_best_lap: f32 = "LapDeltaToSessionBestLap",
    lap_delta_to_session_best_lap_dd: f32 = "LapDeltaToSessionBestLap_DD",
    lap_delta_to_session_optimal_lap: f32 = "LapDeltaToSessionOptimalLap",
    lap_delta_to_session_optimal_lap_dd: f32 = "LapDeltaToSessionOptimalLap_DD",
    lap_delta_to_session_last_lap: f32 = "LapDeltaToSessionLastlLap",
    lap_delta_to_session_last_lap_dd: f32 = "LapDeltaToSessionLastlLap_DD",
    lap_last_n_lap_time: f32 = "LapLastNLapTime",
    lap_best_n_lap_time: f32 = "LapBestNLapTime",
    long_accel: f32 = "LongAccel",
    lat_accel: f32 = "LatAccel",
    vert_accel: f32 = "VertAccel",
    roll_rate: f32 = "RollRate",
    pitch_rate: f32 = "PitchRate",
    yaw_rate: f32 = "YawRate",
    /// m/s
    speed: f32 = "Speed",
    velocity_x: f32 = "VelocityX",
    velocity_y: f32 = "VelocityY",
    velocity_z: f32 = "VelocityZ",
    yaw: f32 = "Yaw",
    pitch: f32 = "Pitch",
    roll: f32 = "Roll",
    pit_repair_left: f32 = "PitRepairLeft",
    pit_opt_repair_left: f32 = "PitOptRepairLeft",
    steering_wheel_torque: f32 = "SteeringWheelTorque",
    steering_wheel_pct_torque: f32 = "SteeringWheelPctTorque",
    steering_wheel_pct_torque_sign: f32 = "SteeringWheelPctTorqueSign",
    steering_wheel_pct_torque_sign_stops: f32 = "SteeringWheelPctTorqueSignStops",
    steering_wheel_pct_damper: f32 = "SteeringWheelPctDamper",
    steering_wheel_angle_max: f32 = "SteeringWheelAngleMax",
    steering_wheel_peak_force_nm: f32 = "SteeringWheelPeakForceNm",
    shift_indicator_pct: f32 = "ShiftIndicatorPct",
    shift_power_pct: f32 = "ShiftPowerPct",
    shift_grind_rpm: f32 = "ShiftGrindRPM",
    throttle_raw: f32 = "ThrottleRaw",
    brake_raw: f32 = "BrakeRaw",
    /// litres
    fuel_level: f32 = "FuelLevel",
    fuel_level_pct: f32 = "FuelLevelPct",
    water_temp: f32 = "WaterTemp",
    water_level: f32 = "WaterLevel",
    fuel_press: f32 = "FuelPress",
    oil_temp: f32 = "OilTemp",
    oil_press: f32 = "OilPress",
    oil_level: f32 = "OilLevel",
    voltage: f32 = "Voltage",
    manifold_press: f32 = "ManifoldPress",
    dc_brake_bias: f32 = "DcBrakeBias",
    rr_brake_line_press: f32 = "RRbrakeLinePress",
    rr_cold_pressure: f32 = "RRcoldPressure",
    rr_temp_cl: f32 = "RRtempCL",
    rr_temp_cm: f32 = "RRtempCM",
    rr_temp_cr: f32 = "RRtempCR",
    rr_wear_l: f32 = "RRwearL",
    rr_wear_m: f32 = "RRwearM",
    rr_wear_r: f32 = "RRwearR",
    lr_brake_line_press: f32 = "LRbrakeLinePress",
    lr_cold_pressure: f32 = "LRcoldPressure",
    lr_temp_cl: f32 = "LRtempCL",
    lr_temp_cm: f32 = "LRtempCM",
    lr_temp_cr: f32 = "LRtempCR",
    lr_wear_l: f32 = "LRwearL",
    lr_wear_m: f32 = "LRwearM",
    lr_wear_r: f32 = "LRwearR",
    rf_brake_line_press: f32 = "RFbrakeLinePress",
    rf_cold_pressure: f32 = "RFcoldPressure",
    rf_temp_cl: f32 = "RFtempCL",
    rf_temp_cm: f32 = "RFtempCM",
    rf_temp_cr: f32 = "RFtempCR",
    rf_wear_l: f32 = "RFwearL",
    rf_wear_m: f32 = "RFwearM",
    rf_wear_r: f32 = "RFwearR",
    lf_brake_line_press: f32 = "LFbrakeLinePress",
    lf_cold_pressure: f32 = "LFcoldPressure",
    lf_temp_cl: f32 = "LFtempCL",
    lf_temp_cm: f32 = "LFtempCM",
    lf_temp_cr: f32 = "LFtempCR",
    lf_wear_l: f32 = "LFwearL",
    lf_wear_m: f32 = "LFwearM",
    lf_wear_r: f32 = "LFwearR",
    rr_shock_defl: f32 = "RRshockDefl",
    rr_shock_vel: f32 = "RRshockVel",
    lr_shock_defl: f32 = "LRshockDefl",
    lr_shock_vel: f32 = "LRshockVel",
    rf_shock_defl: f32 = "RFshockDefl",
    rf_shock_vel: f32 = "RFshockVel",
    lf_shock_defl: f32 = "LFshockDefl",
    lf_shock_vel: f32 = "LFshockVel",

    // disk-log only
    alt: f32 = "Alt",
    track_temp: f32 = "TrackTemp",
    air_temp: f32 = "AirTemp",
    air_density: f32 = "AirDensity",
    air_pressure: f32 = "AirPressure",
    wind_vel: f32 = "WindVel",
    wind_dir: f32 = "WindDir",
    relative_humidity: f32 = "RelativeHumidity",
    fog_level: f32 = "FogLevel",
    lf_ride_height: f32 = "LFrideHeight",
    rf_ride_height: f32 = "RFrideHeight",
    lr_ride_height: f32 = "LRrideHeight",
    rr_ride_height: f32 = "RRrideHeight",
    cfsr_ride_height: f32 = "CFSRrideHeight",
    lf_speed: f32 = "LFspeed",
    rf_speed: f32 = "RFspeed",
    lr_speed: f32 = "LRspeed",
    rr_speed: f32 = "RRspeed",
    lf_pressure: f32 = "LFpressure",
    rf_pressure: f32 = "RFpressure",
    lr_pressure: f32 = "LRpressure",
    rr_pressure: f32 = "RRpressure",
    lf_temp_l: f32 = "LFtempL",
    lf_temp_m: f32 = "LFtempM",
    lf_temp_r: f32 = "LFtempR",
    rf_temp_l: f32 = "RFtempL",
    rf_temp_m: f32 = "RFtempM",
    rf_temp_r: f32 = "RFtempR",
    lr_temp_l: f32 = "LRtempL",
    lr_temp_m: f32 = "LRtempM",
    lr_temp_r: f32 = "LRtempR",
    rr_temp_l: f32 = "RRtempL",
    rr_temp_m: f32 = "RRtempM",
    rr_temp_r: f32 = "RRtempR",
    dc_abs: f32 = "DcABS",
    dc_throttle_shape: f32 = "DcThrottleShape",
    dc_fuel_mixture: f32 = "DcFuelMixture",
    dc_traction_control: f32 = "DcTractionControl",
    pit_sv_lfp: f32 = "PitSvLFP",
    pit_sv_rfp: f32 = "PitSvRFP",
    pit_sv_lrp: f32 = "PitSvLRP",
    pit_sv_rrp: f32 = "PitSvRRP",
    pit_sv_fuel: f32 = "PitSvFuel",

    // doubles
    /// Seconds since the session started
    session_time: f64 = "SessionTime",
    session_time_remain: f64 = "SessionTimeRemain",
    replay_session_time: f64 = "ReplaySessionTime",
    lat: f64 = "Lat",
    lon: f64 = "Lon",
}

impl TelemetryData {
    /// Build from one record.
    pub fn from_record(record: &TelemetryRecord) -> (Self, DispatchReport) {
        let mut data = Self::default();
        let report = data.apply(record);
        (data, report)
    }

    /// Overwrite the fields present in `record`, leaving the others as they were.
    pub fn apply(&mut self, record: &TelemetryRecord) -> DispatchReport {
        let mut report = DispatchReport::default();
        for (name, value) in record.iter() {
            match self.assign(name, value) {
                Assign::Set => {}
                Assign::Mismatch => report.mismatched.push(name.to_string()),
                Assign::Unknown => report.unmapped.push(name.to_string()),
            }
        }
        report.unmapped.sort_unstable();
        report.mismatched.sort_unstable();
        if !report.is_clean() {
            debug!(
                tick = record.tick(),
                unmapped = report.unmapped.len(),
                mismatched = ?report.mismatched,
                "Variables without a typed field"
            );
        }
        report
    }

    pub fn session_state(&self) -> Option<SessionState> {
        SessionState::from_raw(self.session_state)
    }

    /// Track location of a car, if the car index is in range.
    pub fn track_surface(&self, car_idx: usize) -> Option<TrackLocation> {
        self.car_idx_track_surface.get(car_idx).copied().and_then(TrackLocation::from_raw)
    }
}
