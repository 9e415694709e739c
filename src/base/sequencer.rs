// Tripod gait sequencer
//
// Legs are stored left front to back, then right front to back. The two
// tripods each take one middle leg and the opposite side's front and back
// legs, so three feet are always on the ground.

use std::f64::consts::PI;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use super::leg::Leg;
use super::stride::{self, WAYPOINTS_PER_STRIDE};
use super::{GaitError, Result};
use crate::config::{CONVERGENCE_TIMEOUT, GAIT_LOOP_HZ, LEG_SETTLE_TIME, LegSpec, REST_POSITION, RuntimeConfig};
use crate::geometry::Point3D;
use crate::kinematics::LegSolver;
use crate::servo::{self, ChannelSpace};

/// Left front, right middle, left back
pub const TRIPOD_A: [usize; 3] = [0, 4, 2];
/// Right front, left middle, right back
pub const TRIPOD_B: [usize; 3] = [3, 1, 5];

const TRIPODS: [[usize; 3]; 2] = [TRIPOD_A, TRIPOD_B];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GaitState {
    Idle,
    Stepping,
    Resting,
    Standing,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaitConfig {
    /// Pause between convergence polls
    pub tick: Duration,
    /// Longest a single convergence wait may take
    pub convergence_timeout: Duration,
    pub rest_position: Point3D,
}

impl Default for GaitConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(1000 / GAIT_LOOP_HZ),
            convergence_timeout: CONVERGENCE_TIMEOUT,
            rest_position: REST_POSITION,
        }
    }
}

impl From<&RuntimeConfig> for GaitConfig {
    fn from(config: &RuntimeConfig) -> Self {
        Self {
            tick: config.gait_tick(),
            convergence_timeout: config.convergence_timeout(),
            rest_position: config.rest_position,
        }
    }
}

/// What one motion did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StrideSummary {
    /// Waypoints all legs converged on
    pub waypoints: usize,
    /// Leg updates dropped because of a solver or servo failure
    pub skipped_updates: usize,
}

impl StrideSummary {
    fn absorb(&mut self, other: StrideSummary) {
        self.waypoints += other.waypoints;
        self.skipped_updates += other.skipped_updates;
    }
}

pub struct Base {
    legs: [Leg; 6],
    config: GaitConfig,
    state: GaitState,
}

impl Base {
    pub fn new(left: [Leg; 3], right: [Leg; 3], config: GaitConfig) -> Self {
        let [left_front, left_middle, left_back] = left;
        let [right_front, right_middle, right_back] = right;
        Self {
            legs: [left_front, left_middle, left_back, right_front, right_middle, right_back],
            config,
            state: GaitState::Disabled,
        }
    }

    /// Build all six legs from their wiring on the channel space
    ///
    /// Feet start out assumed at the rest position.
    pub fn from_layout(
        space: &ChannelSpace,
        left: &[LegSpec; 3],
        right: &[LegSpec; 3],
        solver: LegSolver,
        config: GaitConfig,
    ) -> servo::Result<Self> {
        let build = |spec: &LegSpec| Leg::from_spec(spec, space, solver, config.rest_position);
        let [l0, l1, l2] = left;
        let [r0, r1, r2] = right;
        let left = [build(l0)?, build(l1)?, build(l2)?];
        let right = [build(r0)?, build(r1)?, build(r2)?];
        Ok(Self::new(left, right, config))
    }

    pub fn legs(&self) -> &[Leg; 6] {
        &self.legs
    }

    pub fn left_legs(&self) -> &[Leg] {
        &self.legs[..3]
    }

    pub fn right_legs(&self) -> &[Leg] {
        &self.legs[3..]
    }

    /// Both tripods, A then B
    pub fn tripods(&self) -> [[&Leg; 3]; 2] {
        TRIPODS.map(|group| group.map(|index| &self.legs[index]))
    }

    pub fn leg(&self, id: &str) -> Option<&Leg> {
        self.legs.iter().find(|leg| leg.id() == id)
    }

    pub fn state(&self) -> GaitState {
        self.state
    }

    pub fn config(&self) -> &GaitConfig {
        &self.config
    }

    pub fn all_at_target(&self) -> bool {
        self.legs.iter().all(Leg::at_target)
    }

    /// Walk one full stride toward `direction` (radians, 0 is straight ahead)
    pub async fn step(&mut self, speed: f64, direction: f64) -> Result<StrideSummary> {
        check_speed(speed)?;
        check_direction(direction)?;

        self.state = GaitState::Stepping;
        let result = self.stride(speed, direction).await;
        self.state = GaitState::Idle;
        result
    }

    /// Walk `steps` strides; zero steps does nothing
    pub async fn walk(&mut self, speed: f64, direction: f64, steps: usize) -> Result<StrideSummary> {
        check_speed(speed)?;
        check_direction(direction)?;

        let mut summary = StrideSummary::default();
        if steps == 0 {
            return Ok(summary);
        }

        info!("Walking {} steps at {} m/s toward {:.3} rad", steps, speed, direction);
        for _ in 0..steps {
            summary.absorb(self.step(speed, direction).await?);
        }
        Ok(summary)
    }

    async fn stride(&mut self, speed: f64, direction: f64) -> Result<StrideSummary> {
        let cycle = stride::waypoints(speed);
        let mut summary = StrideSummary::default();

        for index in 0..WAYPOINTS_PER_STRIDE {
            for (tripod, group) in TRIPODS.iter().enumerate() {
                let waypoint = stride::tripod_waypoint(&cycle, tripod, index);
                for (slot, &leg_index) in group.iter().enumerate() {
                    let turn = stride::turn_angle(tripod, slot, direction);
                    let leg = &mut self.legs[leg_index];
                    let target = stride::leg_target(waypoint.position, leg.angle_from_base(), turn);
                    leg.set_target(target, waypoint.speed);
                }
            }

            debug!("Waypoint {}/{}", index + 1, WAYPOINTS_PER_STRIDE);
            summary.skipped_updates += self.wait_for_targets().await?;
            summary.waypoints += 1;
        }

        Ok(summary)
    }

    /// Park every foot at the rest position, settle, then go limp
    pub async fn rest(&mut self, speed: f64) -> Result<()> {
        let rest_position = self.config.rest_position;
        self.rest_at(speed, rest_position).await
    }

    pub async fn rest_at(&mut self, speed: f64, rest_position: Point3D) -> Result<()> {
        check_speed(speed)?;

        info!("Resting legs at {}", rest_position);
        self.state = GaitState::Resting;
        for leg in &mut self.legs {
            leg.set_target(rest_position, speed);
        }

        let waited = self.wait_for_targets().await;
        if waited.is_ok() {
            sleep(LEG_SETTLE_TIME).await;
        }
        self.disable();
        waited.map(|_| ())
    }

    /// Drive every foot to `foot` and hold it there powered
    pub async fn stand(&mut self, speed: f64, foot: Point3D) -> Result<StrideSummary> {
        check_speed(speed)?;

        info!("Standing with feet at {}", foot);
        self.state = GaitState::Standing;
        for leg in &mut self.legs {
            leg.set_target(foot, speed);
        }

        let skipped_updates = self.wait_for_targets().await?;
        Ok(StrideSummary {
            waypoints: 1,
            skipped_updates,
        })
    }

    /// Unpower every leg right away
    pub fn disable(&mut self) {
        for leg in &self.legs {
            if let Err(e) = leg.disable() {
                warn!("{}", e);
            }
        }
        self.state = GaitState::Disabled;
        info!("Legs disabled");
    }

    /// Advance every moving leg each tick until all have converged
    ///
    /// Returns how many leg updates were skipped. Legs still moving when the
    /// timeout expires are stopped where they are.
    async fn wait_for_targets(&mut self) -> Result<usize> {
        let started = Instant::now();
        let mut skipped = 0;

        loop {
            for leg in self.legs.iter_mut().filter(|leg| !leg.at_target()) {
                if let Err(e) = leg.advance() {
                    warn!("Skipping update: {}", e);
                    skipped += 1;
                }
            }

            if self.all_at_target() {
                return Ok(skipped);
            }

            if started.elapsed() >= self.config.convergence_timeout {
                let mut stalled = Vec::new();
                for leg in self.legs.iter_mut().filter(|leg| !leg.at_target()) {
                    leg.freeze();
                    stalled.push(leg.id().to_string());
                }
                warn!("Legs {:?} stalled, holding them in place", stalled);
                return Err(GaitError::ConvergenceTimeout {
                    legs: stalled,
                    timeout: self.config.convergence_timeout,
                });
            }

            sleep(self.config.tick).await;
        }
    }
}

fn check_speed(speed: f64) -> Result<()> {
    if speed > 0.0 {
        Ok(())
    } else {
        Err(GaitError::InvalidSpeed(speed))
    }
}

fn check_direction(direction: f64) -> Result<()> {
    if (-PI..=PI).contains(&direction) {
        Ok(())
    } else {
        Err(GaitError::InvalidDirection(direction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LEFT_LEGS, RIGHT_LEGS};
    use crate::sim::SimHardware;

    fn base_with(config: GaitConfig) -> (Base, ChannelSpace, SimHardware) {
        let hardware = SimHardware::new();
        let space = hardware.channel_space().unwrap();
        let base = Base::from_layout(&space, &LEFT_LEGS, &RIGHT_LEGS, LegSolver::default(), config).unwrap();
        (base, space, hardware)
    }

    fn base() -> (Base, ChannelSpace, SimHardware) {
        base_with(GaitConfig::default())
    }

    fn is_left(id: &str) -> bool {
        id.starts_with("left")
    }

    #[test]
    fn test_tripods_partition_legs() {
        let (base, _space, _hw) = base();

        let tripods = base.tripods();
        let mut seen: Vec<&str> = tripods.iter().flatten().map(|leg| leg.id()).collect();
        seen.sort_unstable();
        let mut all: Vec<&str> = base.legs().iter().map(|leg| leg.id()).collect();
        all.sort_unstable();
        assert_eq!(seen, all);

        // Each tripod alternates sides
        let [a, b] = base.tripods();
        let sides_a: Vec<bool> = a.iter().map(|leg| is_left(leg.id())).collect();
        let sides_b: Vec<bool> = b.iter().map(|leg| is_left(leg.id())).collect();
        assert_eq!(sides_a, vec![true, false, true]);
        assert_eq!(sides_b, vec![false, true, false]);
    }

    #[test]
    fn test_left_right_halves() {
        let (base, _space, _hw) = base();
        assert!(base.left_legs().iter().all(|leg| is_left(leg.id())));
        assert!(base.right_legs().iter().all(|leg| !is_left(leg.id())));
        assert!(base.leg("right_middle").is_some());
        assert!(base.leg("tail").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_walk_visits_every_waypoint() {
        let (mut base, _space, hw) = base();

        let summary = base.walk(0.1, 0.0, 2).await.unwrap();

        assert_eq!(
            summary,
            StrideSummary {
                waypoints: 12,
                skipped_updates: 0
            }
        );
        assert!(base.all_at_target());
        assert_eq!(base.state(), GaitState::Idle);
        assert!(hw.any_servo_powered());

        // Tripod A ends on the last waypoint, tripod B half a cycle later
        let cycle = stride::waypoints(0.1);
        let right_middle = base.leg("right_middle").unwrap();
        assert!(right_middle.target().almost_equal(cycle[5].position, 1e-9));
        let right_front = base.leg("right_front").unwrap();
        let expected = stride::leg_target(cycle[2].position, right_front.angle_from_base(), 0.0);
        assert!(right_front.target().almost_equal(expected, 1e-9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_steps_is_noop() {
        let (mut base, _space, hw) = base();

        let summary = base.walk(0.1, 0.0, 0).await.unwrap();

        assert_eq!(summary, StrideSummary::default());
        assert!(!hw.any_servo_powered());
        assert_eq!(base.state(), GaitState::Disabled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejects_bad_arguments() {
        let (mut base, _space, hw) = base();

        assert_eq!(base.step(0.0, 0.0).await, Err(GaitError::InvalidSpeed(0.0)));
        assert_eq!(base.step(-0.1, 0.0).await, Err(GaitError::InvalidSpeed(-0.1)));
        assert_eq!(base.step(0.1, 4.0).await, Err(GaitError::InvalidDirection(4.0)));
        assert!(matches!(base.walk(0.1, f64::NAN, 1).await, Err(GaitError::InvalidDirection(_))));
        assert!(matches!(base.rest(f64::NAN).await, Err(GaitError::InvalidSpeed(_))));
        assert!(!hw.any_servo_powered());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rest_parks_and_disables() {
        let (mut base, _space, hw) = base();
        base.walk(0.1, 0.5, 1).await.unwrap();
        assert!(hw.any_servo_powered());

        base.rest(0.1).await.unwrap();

        assert_eq!(base.state(), GaitState::Disabled);
        assert!(!hw.any_servo_powered());
        for leg in base.legs() {
            assert!(leg.target().almost_equal(REST_POSITION, 1e-12));
            assert!(leg.at_target());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stand_holds_feet_powered() {
        let (mut base, _space, hw) = base();
        let foot = Point3D::new(0.1, 0.0, -0.08);

        let summary = base.stand(0.05, foot).await.unwrap();

        assert_eq!(summary.skipped_updates, 0);
        assert_eq!(base.state(), GaitState::Standing);
        assert!(base.all_at_target());
        assert!(base.legs().iter().all(|leg| leg.angles().iter().all(Option::is_some)));
        assert!(hw.any_servo_powered());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_foot_skips_legs() {
        let (mut base, _space, hw) = base();

        let summary = base.stand(f64::INFINITY, Point3D::new(0.5, 0.0, 0.0)).await.unwrap();

        assert_eq!(summary.skipped_updates, 6);
        assert!(!hw.any_servo_powered());
    }

    #[tokio::test(start_paused = true)]
    async fn test_convergence_timeout_freezes_legs() {
        let config = GaitConfig {
            convergence_timeout: Duration::from_secs(1),
            ..GaitConfig::default()
        };
        let (mut base, _space, _hw) = base_with(config);

        let err = base.stand(0.001, Point3D::new(0.1, 0.0, -0.08)).await.unwrap_err();

        match err {
            GaitError::ConvergenceTimeout { legs, timeout } => {
                assert_eq!(legs.len(), 6);
                assert_eq!(timeout, Duration::from_secs(1));
            }
            other => panic!("unexpected error: {other}"),
        }
        // Frozen legs count as arrived, so the next motion starts cleanly
        assert!(base.all_at_target());
        base.rest(0.1).await.unwrap();
    }
}
