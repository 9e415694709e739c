// Walk/rest behavior
//
// Decides what the base does on each driver loop iteration from the current
// mode, walking speed, light heading and motor battery. Mode and speed only
// change through `apply`, between ticks.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::base::{self, Base};
use crate::config::RuntimeConfig;
use crate::messages::{BehaviorCommand, Mode, WalkSpeed};
use crate::sensors::{Batteries, HeadingSensor};

/// Outcome of one behavior tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorAction {
    /// Took a step
    Walked,
    /// Parked and disabled the legs
    Rested,
    /// Already resting
    Idle,
    /// Slow walk waiting out its cooldown
    CoolingDown,
    /// Slow walk found enough light and stayed put
    TooBright,
}

impl BehaviorAction {
    /// Whether the base stood still this tick
    pub fn is_idle(self) -> bool {
        !matches!(self, BehaviorAction::Walked | BehaviorAction::Rested)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BehaviorSettings {
    pub fast_walk_speed: f64,
    pub slow_walk_speed: f64,
    pub rest_speed: f64,
    pub brightness_ceiling: f64,
    pub slow_walk_cooldown: Duration,
}

impl From<&RuntimeConfig> for BehaviorSettings {
    fn from(config: &RuntimeConfig) -> Self {
        Self {
            fast_walk_speed: config.fast_walk_speed,
            slow_walk_speed: config.slow_walk_speed,
            rest_speed: config.rest_speed,
            brightness_ceiling: config.brightness_ceiling,
            slow_walk_cooldown: config.slow_walk_cooldown(),
        }
    }
}

#[derive(Debug)]
pub struct Behavior {
    settings: BehaviorSettings,
    mode: Mode,
    walk_speed: WalkSpeed,
    /// Set once the base has been parked, cleared when it moves again
    rested: bool,
    cooldown_until: Option<Instant>,
}

impl Behavior {
    pub fn new(settings: BehaviorSettings, mode: Mode) -> Self {
        Self {
            settings,
            mode,
            walk_speed: WalkSpeed::Slow,
            rested: false,
            cooldown_until: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn walk_speed(&self) -> WalkSpeed {
        self.walk_speed
    }

    pub fn rested(&self) -> bool {
        self.rested
    }

    pub fn settings(&self) -> &BehaviorSettings {
        &self.settings
    }

    pub fn apply(&mut self, command: BehaviorCommand) {
        debug!("Applying {:?}", command);
        match command {
            BehaviorCommand::ToggleMode => self.set_mode(self.mode.toggled()),
            BehaviorCommand::SetMode { mode } => self.set_mode(mode),
            BehaviorCommand::ToggleWalkSpeed => self.set_walk_speed(self.walk_speed.toggled()),
            BehaviorCommand::SetWalkSpeed { walk_speed } => self.set_walk_speed(walk_speed),
        }
    }

    fn set_mode(&mut self, mode: Mode) {
        if mode == self.mode {
            return;
        }
        info!("Mode: {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        match mode {
            Mode::Rest => self.rested = false,
            Mode::Walk => self.cooldown_until = None,
        }
    }

    fn set_walk_speed(&mut self, walk_speed: WalkSpeed) {
        if walk_speed == self.walk_speed {
            return;
        }
        info!("Walk speed: {:?} -> {:?}", self.walk_speed, walk_speed);
        self.walk_speed = walk_speed;
        if walk_speed == WalkSpeed::Slow {
            self.cooldown_until = None;
        }
    }

    /// One driver loop iteration
    pub async fn tick(
        &mut self,
        base: &mut Base,
        heading: &dyn HeadingSensor,
        batteries: &Batteries,
    ) -> base::Result<BehaviorAction> {
        let motor_ok = match batteries.read() {
            Ok(report) => !report.motor_low,
            Err(e) => {
                warn!("Battery read failed, not walking: {}", e);
                false
            }
        };

        if self.mode == Mode::Walk && motor_ok {
            self.walk(base, heading).await
        } else {
            self.rest_once(base).await
        }
    }

    async fn walk(&mut self, base: &mut Base, heading: &dyn HeadingSensor) -> base::Result<BehaviorAction> {
        match self.walk_speed {
            WalkSpeed::Fast => {
                let direction = heading.read().brightest_direction;
                self.rested = false;
                base.step(self.settings.fast_walk_speed, direction).await?;
                Ok(BehaviorAction::Walked)
            }
            WalkSpeed::Slow => {
                if self.cooldown_until.is_some_and(|until| Instant::now() < until) {
                    return Ok(BehaviorAction::CoolingDown);
                }

                let light = heading.read();
                if light.light_level >= self.settings.brightness_ceiling {
                    debug!("Light level {:.2}, staying put", light.light_level);
                    return Ok(BehaviorAction::TooBright);
                }

                self.rested = false;
                base.step(self.settings.slow_walk_speed, light.brightest_direction).await?;
                self.rested = true;
                base.rest(self.settings.rest_speed).await?;
                self.cooldown_until = Some(Instant::now() + self.settings.slow_walk_cooldown);
                Ok(BehaviorAction::Walked)
            }
        }
    }

    async fn rest_once(&mut self, base: &mut Base) -> base::Result<BehaviorAction> {
        if self.rested {
            return Ok(BehaviorAction::Idle);
        }
        self.rested = true;
        base.rest(self.settings.rest_speed).await?;
        Ok(BehaviorAction::Rested)
    }
}
