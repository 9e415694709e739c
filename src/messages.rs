// Message types for the remote surface

use serde::{Deserialize, Serialize};

use crate::base::GaitState;
use crate::behavior::BehaviorAction;
use crate::sensors::BatteryReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Walk,
    #[default]
    Rest,
}

impl Mode {
    pub fn toggled(self) -> Self {
        match self {
            Mode::Walk => Mode::Rest,
            Mode::Rest => Mode::Walk,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkSpeed {
    #[default]
    Slow,
    Fast,
}

impl WalkSpeed {
    pub fn toggled(self) -> Self {
        match self {
            WalkSpeed::Slow => WalkSpeed::Fast,
            WalkSpeed::Fast => WalkSpeed::Slow,
        }
    }
}

// Command from buttons or remote -> runtime
// The toggles are what the physical buttons send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum BehaviorCommand {
    ToggleMode,
    ToggleWalkSpeed,
    SetMode { mode: Mode },
    SetWalkSpeed { walk_speed: WalkSpeed },
}

/// Status published by the runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotStatus {
    pub mode: Mode,
    pub walk_speed: WalkSpeed,
    pub gait: GaitState,
    /// What the driver loop did last, `None` before its first tick
    pub last_action: Option<BehaviorAction>,
    /// Last battery poll, `None` until one succeeds
    pub battery: Option<BatteryReport>,
}

impl Default for RobotStatus {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            walk_speed: WalkSpeed::default(),
            gait: GaitState::Disabled,
            last_action: None,
            battery: None,
        }
    }
}
