//! Remote control of the simulator through its registered window message.
//!
//! Every command is one `IRSDK_BROADCASTMSG` message posted to all top-level windows. The
//! command and its three 16-bit arguments are packed into the two message parameters:
//!
//! ```text
//! wparam = make_long(msg, var1)
//! lparam = make_long(var2, var3)
//! ```
//!
//! ```rust
//! use irtelem::broadcast::{Broadcaster, PitCommand};
//! use irtelem::platform::MemoryPlatform;
//!
//! let platform = MemoryPlatform::new();
//! let broadcaster = Broadcaster::register(&platform, "IRSDK_BROADCASTMSG").unwrap();
//! broadcaster.pit_command(PitCommand::Fuel, 20).unwrap();
//!
//! let sent = platform.sent_broadcasts();
//! assert_eq!(sent[0].wparam, 9 | 2 << 16);
//! assert_eq!(sent[0].lparam, 20);
//! ```

use std::ops::BitOr;
use tracing::debug;

use crate::platform::Platform;
use crate::{Result, TelemetryError};

/// Pack two 16-bit words into one 32-bit parameter, `lo` in the low half.
pub const fn make_long(lo: u16, hi: u16) -> u32 {
    lo as u32 | (hi as u32) << 16
}

/// Numeric car number with its leading zeros encoded in the thousands.
///
/// `zero` is the count of leading zeros shown on the car; `"007"` is `pad_car_num(7, 2)`,
/// which is `3007`. Without leading zeros the number is returned unchanged.
pub fn pad_car_num(num: i32, zero: i32) -> i32 {
    if zero == 0 {
        return num;
    }
    let digits = if num > 99 {
        3
    } else if num > 9 {
        2
    } else {
        1
    };
    num + 1000 * (digits + zero)
}

/// Commands understood by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum BroadcastMsg {
    /// car position, group, camera
    CamSwitchPos = 0,
    /// driver number, group, camera
    CamSwitchNum = 1,
    /// [`CameraState`], unused, unused
    CamSetState = 2,
    /// speed, slow motion, unused
    ReplaySetPlaySpeed = 3,
    /// [`ReplayPositionMode`], frame number (low, high)
    ReplaySetPlayPosition = 4,
    /// [`ReplaySearchMode`], unused, unused
    ReplaySearch = 5,
    /// [`ReplayStateMode`], unused, unused
    ReplaySetState = 6,
    /// [`ReloadTexturesMode`], car index, unused
    ReloadTextures = 7,
    /// [`ChatCommand`], sub command, unused
    ChatCommand = 8,
    /// [`PitCommand`], parameter
    PitCommand = 9,
    /// [`TelemetryCommand`], unused, unused
    TelemCommand = 10,
}

impl BroadcastMsg {
    /// One past the highest command.
    pub const LAST: u16 = 11;

    pub fn from_raw(raw: u16) -> Option<Self> {
        Some(match raw {
            0 => BroadcastMsg::CamSwitchPos,
            1 => BroadcastMsg::CamSwitchNum,
            2 => BroadcastMsg::CamSetState,
            3 => BroadcastMsg::ReplaySetPlaySpeed,
            4 => BroadcastMsg::ReplaySetPlayPosition,
            5 => BroadcastMsg::ReplaySearch,
            6 => BroadcastMsg::ReplaySetState,
            7 => BroadcastMsg::ReloadTextures,
            8 => BroadcastMsg::ChatCommand,
            9 => BroadcastMsg::PitCommand,
            10 => BroadcastMsg::TelemCommand,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ChatCommand {
    /// Launch the chat macro given as the sub command (1-15)
    Macro = 0,
    BeginChat = 1,
    /// Reply to the last private chat
    Reply = 2,
    Cancel = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum PitCommand {
    /// Clear all pit checkboxes
    Clear = 0,
    /// Windshield tear-off
    Windshield = 1,
    /// Add fuel in liters; 0 keeps the current amount
    Fuel = 2,
    /// Tire changes take a pressure in kPa; 0 keeps the current pressure
    LeftFront = 3,
    RightFront = 4,
    LeftRear = 5,
    RightRear = 6,
    ClearTires = 7,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum TelemetryCommand {
    Stop = 0,
    Start = 1,
    /// Write the current file and start a new one
    Restart = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ReplayStateMode {
    EraseTape = 0,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ReloadTexturesMode {
    All = 0,
    CarIdx = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ReplaySearchMode {
    ToStart = 0,
    ToEnd = 1,
    PrevSession = 2,
    NextSession = 3,
    PrevLap = 4,
    NextLap = 5,
    PrevFrame = 6,
    NextFrame = 7,
    PrevIncident = 8,
    NextIncident = 9,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ReplayPositionMode {
    Begin = 0,
    Current = 1,
    End = 2,
}

/// What a camera switch focuses on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraFocus {
    Incident,
    Leader,
    Exiting,
    /// A car position or a padded car number, depending on the command
    Car(u16),
}

impl CameraFocus {
    fn to_raw(self) -> u16 {
        match self {
            CameraFocus::Incident => -3i16 as u16,
            CameraFocus::Leader => -2i16 as u16,
            CameraFocus::Exiting => -1i16 as u16,
            CameraFocus::Car(value) => value,
        }
    }
}

/// Camera tool state bits for [`BroadcastMsg::CamSetState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CameraState(pub u16);

impl CameraState {
    pub const IS_SESSION_SCREEN: Self = Self(0x0001);
    pub const IS_SCENIC_ACTIVE: Self = Self(0x0002);
    pub const CAM_TOOL_ACTIVE: Self = Self(0x0004);
    pub const UI_HIDDEN: Self = Self(0x0008);
    pub const USE_AUTO_SHOT_SELECTION: Self = Self(0x0010);
    pub const USE_TEMPORARY_EDITS: Self = Self(0x0020);
    pub const USE_KEY_ACCELERATION: Self = Self(0x0040);
    pub const USE_KEY_10X_ACCELERATION: Self = Self(0x0080);
    pub const USE_MOUSE_AIM_MODE: Self = Self(0x0100);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for CameraState {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Sends commands through a platform's broadcast channel.
///
/// The message id is registered once, when the broadcaster is created.
#[derive(Debug)]
pub struct Broadcaster<'a, P: Platform> {
    platform: &'a P,
    message_id: u32,
}

impl<'a, P: Platform> Broadcaster<'a, P> {
    pub fn register(platform: &'a P, name: &str) -> Result<Self> {
        let message_id = platform.register_broadcast_message(name)?;
        if message_id == 0 {
            return Err(TelemetryError::platform_failure(
                "register_broadcast_message",
                format!("no message id for {name}"),
            ));
        }
        debug!(name, message_id, "Registered broadcast message");
        Ok(Self { platform, message_id })
    }

    pub fn message_id(&self) -> u32 {
        self.message_id
    }

    pub fn send(&self, msg: BroadcastMsg, var1: u16, var2: u16, var3: u16) -> Result<()> {
        let wparam = make_long(msg as u16, var1);
        let lparam = make_long(var2, var3);
        debug!(?msg, var1, var2, var3, wparam, lparam, "Sending broadcast");
        self.platform.send_broadcast(self.message_id, wparam, lparam)
    }

    /// Send a command by number, rejecting numbers outside the command table.
    pub fn send_raw(&self, msg: u16, var1: u16, var2: u16, var3: u16) -> Result<()> {
        let msg = BroadcastMsg::from_raw(msg).ok_or_else(|| {
            TelemetryError::parse(
                "broadcast message",
                format!("{msg} outside 0..{}", BroadcastMsg::LAST),
            )
        })?;
        self.send(msg, var1, var2, var3)
    }

    /// Focus the camera on a race position.
    pub fn cam_switch_pos(&self, focus: CameraFocus, group: u16, camera: u16) -> Result<()> {
        self.send(BroadcastMsg::CamSwitchPos, focus.to_raw(), group, camera)
    }

    /// Focus the camera on a car number, padded with [`pad_car_num`].
    pub fn cam_switch_num(&self, focus: CameraFocus, group: u16, camera: u16) -> Result<()> {
        self.send(BroadcastMsg::CamSwitchNum, focus.to_raw(), group, camera)
    }

    pub fn cam_set_state(&self, state: CameraState) -> Result<()> {
        self.send(BroadcastMsg::CamSetState, state.0, 0, 0)
    }

    pub fn replay_set_play_speed(&self, speed: u16, slow_motion: bool) -> Result<()> {
        self.send(BroadcastMsg::ReplaySetPlaySpeed, speed, u16::from(slow_motion), 0)
    }

    pub fn replay_set_play_position(&self, mode: ReplayPositionMode, frame: u32) -> Result<()> {
        self.send(
            BroadcastMsg::ReplaySetPlayPosition,
            mode as u16,
            (frame & 0xFFFF) as u16,
            (frame >> 16) as u16,
        )
    }

    pub fn replay_search(&self, mode: ReplaySearchMode) -> Result<()> {
        self.send(BroadcastMsg::ReplaySearch, mode as u16, 0, 0)
    }

    pub fn replay_set_state(&self, mode: ReplayStateMode) -> Result<()> {
        self.send(BroadcastMsg::ReplaySetState, mode as u16, 0, 0)
    }

    /// Reload every car's textures, or only `car_idx`'s.
    pub fn reload_textures(&self, car_idx: Option<u16>) -> Result<()> {
        match car_idx {
            Some(idx) => self.send(BroadcastMsg::ReloadTextures, ReloadTexturesMode::CarIdx as u16, idx, 0),
            None => self.send(BroadcastMsg::ReloadTextures, ReloadTexturesMode::All as u16, 0, 0),
        }
    }

    pub fn chat_command(&self, command: ChatCommand) -> Result<()> {
        self.send(BroadcastMsg::ChatCommand, command as u16, 0, 0)
    }

    /// Launch chat macro `number` (1-15).
    pub fn chat_macro(&self, number: u16) -> Result<()> {
        self.send(BroadcastMsg::ChatCommand, ChatCommand::Macro as u16, number, 0)
    }

    pub fn pit_command(&self, command: PitCommand, parameter: u16) -> Result<()> {
        self.send(BroadcastMsg::PitCommand, command as u16, parameter, 0)
    }

    pub fn telem_command(&self, command: TelemetryCommand) -> Result<()> {
        self.send(BroadcastMsg::TelemCommand, command as u16, 0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{MemoryPlatform, SentBroadcast};
    use proptest::prelude::*;

    fn sent_one(platform: &MemoryPlatform) -> anyhow::Result<SentBroadcast> {
        let sent = platform.sent_broadcasts();
        anyhow::ensure!(sent.len() == 1, "expected one broadcast, got {}", sent.len());
        Ok(sent[0])
    }

    #[test]
    fn pad_car_num_encodes_leading_zeros() {
        assert_eq!(pad_car_num(7, 0), 7);
        assert_eq!(pad_car_num(7, 2), 3007);
        assert_eq!(pad_car_num(42, 1), 3042);
        assert_eq!(pad_car_num(5, 1), 2005);
        assert_eq!(pad_car_num(123, 0), 123);
    }

    #[test]
    fn each_command_is_sent_exactly_once() -> anyhow::Result<()> {
        let platform = MemoryPlatform::new();
        let broadcaster = Broadcaster::register(&platform, "IRSDK_BROADCASTMSG")?;
        broadcaster.telem_command(TelemetryCommand::Restart)?;

        let sent = sent_one(&platform)?;
        assert_eq!(sent.message_id, broadcaster.message_id());
        assert_eq!(sent.wparam, make_long(10, 2));
        assert_eq!(sent.lparam, 0);
        Ok(())
    }

    #[test]
    fn replay_position_splits_the_frame_number() -> anyhow::Result<()> {
        let platform = MemoryPlatform::new();
        let broadcaster = Broadcaster::register(&platform, "IRSDK_BROADCASTMSG")?;
        broadcaster.replay_set_play_position(ReplayPositionMode::Current, 0x0012_3456)?;

        let sent = sent_one(&platform)?;
        assert_eq!(sent.wparam, make_long(4, 1));
        assert_eq!(sent.lparam, 0x0012_3456);
        Ok(())
    }

    #[test]
    fn camera_focus_uses_negative_codes() -> anyhow::Result<()> {
        let platform = MemoryPlatform::new();
        let broadcaster = Broadcaster::register(&platform, "IRSDK_BROADCASTMSG")?;
        broadcaster.cam_switch_pos(CameraFocus::Leader, 3, 1)?;

        let sent = sent_one(&platform)?;
        assert_eq!(sent.wparam, 0xFFFE_0000);
        assert_eq!(sent.lparam, make_long(3, 1));
        Ok(())
    }

    #[test]
    fn camera_state_bits_combine() {
        let state = CameraState::CAM_TOOL_ACTIVE | CameraState::UI_HIDDEN;
        assert_eq!(state.0, 0x000C);
        assert!(state.contains(CameraState::UI_HIDDEN));
        assert!(!state.contains(CameraState::IS_SCENIC_ACTIVE));
    }

    #[test]
    fn out_of_range_messages_are_rejected() -> anyhow::Result<()> {
        let platform = MemoryPlatform::new();
        let broadcaster = Broadcaster::register(&platform, "IRSDK_BROADCASTMSG")?;
        assert!(matches!(
            broadcaster.send_raw(BroadcastMsg::LAST, 0, 0, 0),
            Err(TelemetryError::Parse { .. })
        ));
        assert!(platform.sent_broadcasts().is_empty());

        broadcaster.send_raw(8, 1, 0, 0)?;
        assert_eq!(sent_one(&platform)?.wparam, make_long(8, 1));
        Ok(())
    }

    proptest! {
        #[test]
        fn make_long_keeps_both_halves(lo in any::<u16>(), hi in any::<u16>()) {
            let packed = make_long(lo, hi);
            prop_assert_eq!(packed & 0xFFFF, u32::from(lo));
            prop_assert_eq!(packed >> 16, u32::from(hi));
        }
    }
}
