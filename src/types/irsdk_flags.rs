//! Constants and helpers for interpreting IRSDK bitfields and enumerations
//!
//! Masks follow the iRacing SDK headers. Each bitfield variable that the extractor decodes
//! into named flags has a [`FlagTable`] here; [`flag_table`] maps a variable name to it.

use serde::{Deserialize, Serialize};

use super::FlagTable;

/// `SessionFlags` masks (irsdk_Flags)
pub mod session_flags {
    // global flags
    pub const CHECKERED: u32 = 0x0000_0001;
    pub const WHITE: u32 = 0x0000_0002;
    pub const GREEN: u32 = 0x0000_0004;
    pub const YELLOW: u32 = 0x0000_0008;
    pub const RED: u32 = 0x0000_0010;
    pub const BLUE: u32 = 0x0000_0020;
    pub const DEBRIS: u32 = 0x0000_0040;
    pub const CROSSED: u32 = 0x0000_0080;
    pub const YELLOW_WAVING: u32 = 0x0000_0100;
    pub const ONE_LAP_TO_GREEN: u32 = 0x0000_0200;
    pub const GREEN_HELD: u32 = 0x0000_0400;
    pub const TEN_TO_GO: u32 = 0x0000_0800;
    pub const FIVE_TO_GO: u32 = 0x0000_1000;
    pub const RANDOM_WAVING: u32 = 0x0000_2000;
    pub const CAUTION: u32 = 0x0000_4000;
    pub const CAUTION_WAVING: u32 = 0x0000_8000;

    // drivers black flags
    pub const BLACK: u32 = 0x0001_0000;
    pub const DISQUALIFY: u32 = 0x0002_0000;
    pub const SERVICIBLE: u32 = 0x0004_0000; // car is allowed service (not a flag)
    pub const FURLED: u32 = 0x0008_0000;
    pub const REPAIR: u32 = 0x0010_0000;
    pub const DQ_SCORING_INVALID: u32 = 0x0020_0000;

    // start lights
    pub const START_HIDDEN: u32 = 0x1000_0000;
    pub const START_READY: u32 = 0x2000_0000;
    pub const START_SET: u32 = 0x4000_0000;
    pub const START_GO: u32 = 0x8000_0000;
}

/// `EngineWarnings` masks (irsdk_EngineWarnings)
pub mod engine_warnings {
    pub const WATER_TEMP_WARNING: u32 = 0x0001;
    pub const FUEL_PRESSURE_WARNING: u32 = 0x0002;
    pub const OIL_PRESSURE_WARNING: u32 = 0x0004;
    pub const ENGINE_STALLED: u32 = 0x0008;
    pub const PIT_SPEED_LIMITER: u32 = 0x0010;
    pub const REV_LIMITER_ACTIVE: u32 = 0x0020;
    pub const MAND_REP_NEEDED: u32 = 0x0080;
    pub const OPT_REP_NEEDED: u32 = 0x0100;
}

/// `CamCameraState` masks (irsdk_CameraState)
pub mod camera_state {
    pub const IS_SESSION_SCREEN: u32 = 0x0001;
    pub const IS_SCENIC_ACTIVE: u32 = 0x0002;
    pub const CAM_TOOL_ACTIVE: u32 = 0x0004;
    pub const UI_HIDDEN: u32 = 0x0008;
    pub const USE_AUTO_SHOT_SELECTION: u32 = 0x0010;
    pub const USE_TEMPORARY_EDITS: u32 = 0x0020;
    pub const USE_KEY_ACCELERATION: u32 = 0x0040;
    pub const USE_KEY_10X_ACCELERATION: u32 = 0x0080;
    pub const USE_MOUSE_AIM_MODE: u32 = 0x0100;
}

/// `PitSvFlags` masks (irsdk_PitSvFlags)
pub mod pit_service {
    pub const LF_TIRE_CHANGE: u32 = 0x0001;
    pub const RF_TIRE_CHANGE: u32 = 0x0002;
    pub const LR_TIRE_CHANGE: u32 = 0x0004;
    pub const RR_TIRE_CHANGE: u32 = 0x0008;
    pub const FUEL_FILL: u32 = 0x0010;
    pub const WINDSHIELD_TEAROFF: u32 = 0x0020;
    pub const FAST_REPAIR: u32 = 0x0040;
}

pub static SESSION_FLAGS: FlagTable = FlagTable {
    variable: "SessionFlags",
    entries: &[
        ("Checkered", session_flags::CHECKERED),
        ("White", session_flags::WHITE),
        ("Green", session_flags::GREEN),
        ("Yellow", session_flags::YELLOW),
        ("Red", session_flags::RED),
        ("Blue", session_flags::BLUE),
        ("Debris", session_flags::DEBRIS),
        ("Crossed", session_flags::CROSSED),
        ("YellowWaving", session_flags::YELLOW_WAVING),
        ("OneLapToGreen", session_flags::ONE_LAP_TO_GREEN),
        ("GreenHeld", session_flags::GREEN_HELD),
        ("TenToGo", session_flags::TEN_TO_GO),
        ("FiveToGo", session_flags::FIVE_TO_GO),
        ("RandomWaving", session_flags::RANDOM_WAVING),
        ("Caution", session_flags::CAUTION),
        ("CautionWaving", session_flags::CAUTION_WAVING),
        ("Black", session_flags::BLACK),
        ("Disqualify", session_flags::DISQUALIFY),
        ("Servicible", session_flags::SERVICIBLE),
        ("Furled", session_flags::FURLED),
        ("Repair", session_flags::REPAIR),
        ("DqScoringInvalid", session_flags::DQ_SCORING_INVALID),
        ("StartHidden", session_flags::START_HIDDEN),
        ("StartReady", session_flags::START_READY),
        ("StartSet", session_flags::START_SET),
        ("StartGo", session_flags::START_GO),
    ],
};

pub static ENGINE_WARNINGS: FlagTable = FlagTable {
    variable: "EngineWarnings",
    entries: &[
        ("WaterTempWarning", engine_warnings::WATER_TEMP_WARNING),
        ("FuelPressureWarning", engine_warnings::FUEL_PRESSURE_WARNING),
        ("OilPressureWarning", engine_warnings::OIL_PRESSURE_WARNING),
        ("EngineStalled", engine_warnings::ENGINE_STALLED),
        ("PitSpeedLimiter", engine_warnings::PIT_SPEED_LIMITER),
        ("RevLimiterActive", engine_warnings::REV_LIMITER_ACTIVE),
        ("MandatoryRepairNeeded", engine_warnings::MAND_REP_NEEDED),
        ("OptionalRepairNeeded", engine_warnings::OPT_REP_NEEDED),
    ],
};

pub static CAMERA_STATE: FlagTable = FlagTable {
    variable: "CamCameraState",
    entries: &[
        ("IsSessionScreen", camera_state::IS_SESSION_SCREEN),
        ("IsScenicActive", camera_state::IS_SCENIC_ACTIVE),
        ("CamToolActive", camera_state::CAM_TOOL_ACTIVE),
        ("UIHidden", camera_state::UI_HIDDEN),
        ("UseAutoShotSelection", camera_state::USE_AUTO_SHOT_SELECTION),
        ("UseTemporaryEdits", camera_state::USE_TEMPORARY_EDITS),
        ("UseKeyAcceleration", camera_state::USE_KEY_ACCELERATION),
        ("UseKey10xAcceleration", camera_state::USE_KEY_10X_ACCELERATION),
        ("UseMouseAimMode", camera_state::USE_MOUSE_AIM_MODE),
    ],
};

pub static PIT_SERVICE_FLAGS: FlagTable = FlagTable {
    variable: "PitSvFlags",
    entries: &[
        ("LFTireChange", pit_service::LF_TIRE_CHANGE),
        ("RFTireChange", pit_service::RF_TIRE_CHANGE),
        ("LRTireChange", pit_service::LR_TIRE_CHANGE),
        ("RRTireChange", pit_service::RR_TIRE_CHANGE),
        ("FuelFill", pit_service::FUEL_FILL),
        ("WindshieldTearoff", pit_service::WINDSHIELD_TEAROFF),
        ("FastRepair", pit_service::FAST_REPAIR),
    ],
};

/// Every known flag table.
pub static FLAG_TABLES: [&FlagTable; 4] =
    [&SESSION_FLAGS, &CAMERA_STATE, &ENGINE_WARNINGS, &PIT_SERVICE_FLAGS];

/// Look up the flag table for a bitfield variable by name.
pub fn flag_table(variable: &str) -> Option<&'static FlagTable> {
    FLAG_TABLES.iter().copied().find(|table| table.variable == variable)
}

/// Session state (irsdk_SessionState), carried by the `SessionState` int variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Invalid,
    GetInCar,
    Warmup,
    ParadeLaps,
    Racing,
    Checkered,
    CoolDown,
}

impl SessionState {
    pub fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            0 => SessionState::Invalid,
            1 => SessionState::GetInCar,
            2 => SessionState::Warmup,
            3 => SessionState::ParadeLaps,
            4 => SessionState::Racing,
            5 => SessionState::Checkered,
            6 => SessionState::CoolDown,
            _ => return None,
        })
    }
}

/// Track location (irsdk_TrkLoc), carried by `CarIdxTrackSurface` and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackLocation {
    NotInWorld,
    OffTrack,
    InPitStall,
    ApproachingPits,
    OnTrack,
}

impl TrackLocation {
    pub fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            -1 => TrackLocation::NotInWorld,
            0 => TrackLocation::OffTrack,
            1 => TrackLocation::InPitStall,
            2 => TrackLocation::ApproachingPits,
            3 => TrackLocation::OnTrack,
            _ => return None,
        })
    }
}
