// Behavior coordinator: the robot's top-level control loop
//
// Four activities share one task for the lifetime of the process:
// 1. Battery monitor (chirps and warnings on low voltage)
// 2. Mode button watcher
// 3. Speed button watcher
// 4. Base driver loop
//
// Button watchers and remote clients only send commands. The driver drains
// them between ticks, so behavior state never changes mid-stride.

use std::future::Future;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::base::{self, Base};
use crate::behavior::{Behavior, BehaviorAction, BehaviorSettings};
use crate::config::{IDLE_INTERVAL, RuntimeConfig};
use crate::messages::{BehaviorCommand, Mode, RobotStatus};
use crate::sensors::{Batteries, Buzzer, DebouncedButton, HeadingSensor, chirp};

pub struct Coordinator {
    base: Base,
    heading: Box<dyn HeadingSensor>,
    batteries: Batteries,
    buzzer: Box<dyn Buzzer>,
    mode_button: DebouncedButton,
    speed_button: DebouncedButton,
    behavior: Behavior,
    battery_poll: Duration,
    low_logic_battery_poll: Duration,
    command_tx: mpsc::UnboundedSender<BehaviorCommand>,
    command_rx: mpsc::UnboundedReceiver<BehaviorCommand>,
    status_tx: watch::Sender<RobotStatus>,
}

impl Coordinator {
    pub fn new(
        base: Base,
        heading: Box<dyn HeadingSensor>,
        batteries: Batteries,
        buzzer: Box<dyn Buzzer>,
        (mode_button, speed_button): (DebouncedButton, DebouncedButton),
        config: &RuntimeConfig,
        initial_mode: Mode,
    ) -> Self {
        let behavior = Behavior::new(BehaviorSettings::from(config), initial_mode);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (status_tx, _) = watch::channel(RobotStatus {
            mode: behavior.mode(),
            walk_speed: behavior.walk_speed(),
            gait: base.state(),
            ..RobotStatus::default()
        });

        Self {
            base,
            heading,
            batteries,
            buzzer,
            mode_button,
            speed_button,
            behavior,
            battery_poll: config.battery_poll_interval(),
            low_logic_battery_poll: config.low_logic_battery_poll_interval(),
            command_tx,
            command_rx,
            status_tx,
        }
    }

    /// Handle for sending commands from outside the control loop
    pub fn command_sender(&self) -> mpsc::UnboundedSender<BehaviorCommand> {
        self.command_tx.clone()
    }

    pub fn status(&self) -> watch::Receiver<RobotStatus> {
        self.status_tx.subscribe()
    }

    /// Run until `shutdown` completes, then rest and disable the legs
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> base::Result<()> {
        let Self {
            mut base,
            heading,
            batteries,
            buzzer,
            mut mode_button,
            mut speed_button,
            mut behavior,
            battery_poll,
            low_logic_battery_poll,
            command_tx,
            mut command_rx,
            status_tx,
        } = self;

        info!(
            "Coordinator started in {:?} mode, {:?} walk",
            behavior.mode(),
            behavior.walk_speed()
        );

        tokio::select! {
            _ = monitor_batteries(&batteries, buzzer.as_ref(), &status_tx, battery_poll, low_logic_battery_poll) => {}
            _ = watch_button(&mut mode_button, BehaviorCommand::ToggleMode, &command_tx) => {}
            _ = watch_button(&mut speed_button, BehaviorCommand::ToggleWalkSpeed, &command_tx) => {}
            _ = drive(&mut base, &mut behavior, heading.as_ref(), &batteries, &mut command_rx, &status_tx) => {}
            _ = shutdown => {
                info!("Shutdown requested");
            }
        }

        info!("Resting legs before exit");
        let rested = base.rest(behavior.settings().rest_speed).await;
        if let Err(e) = &rested {
            warn!("Rest before exit failed: {}", e);
            base.disable();
        }
        let gait = base.state();
        status_tx.send_modify(|status| status.gait = gait);
        rested
    }
}

async fn monitor_batteries(
    batteries: &Batteries,
    buzzer: &dyn Buzzer,
    status: &watch::Sender<RobotStatus>,
    poll: Duration,
    low_logic_poll: Duration,
) {
    loop {
        let interval = match batteries.read() {
            Ok(report) => {
                debug!(
                    "Batteries: logic {:.2} V, motor {:.2} V",
                    report.logic_voltage, report.motor_voltage
                );
                status.send_modify(|status| status.battery = Some(report));

                if report.logic_low {
                    warn!("Logic battery low: {:.2} V", report.logic_voltage);
                    chirp(buzzer, 1).await;
                }
                if report.motor_low {
                    warn!("Motor battery low: {:.2} V", report.motor_voltage);
                    chirp(buzzer, 2).await;
                }

                if report.logic_low { low_logic_poll } else { poll }
            }
            Err(e) => {
                warn!("Battery read failed: {}", e);
                poll
            }
        };
        sleep(interval).await;
    }
}

async fn watch_button(
    button: &mut DebouncedButton,
    command: BehaviorCommand,
    commands: &mpsc::UnboundedSender<BehaviorCommand>,
) {
    loop {
        button.clicked().await;
        debug!("Button click: {:?}", command);
        if let Err(e) = commands.send(command) {
            warn!("Dropped button command: {}", e);
        }
    }
}

async fn drive(
    base: &mut Base,
    behavior: &mut Behavior,
    heading: &dyn HeadingSensor,
    batteries: &Batteries,
    commands: &mut mpsc::UnboundedReceiver<BehaviorCommand>,
    status: &watch::Sender<RobotStatus>,
) {
    loop {
        // Drain pending commands (non-blocking)
        while let Ok(command) = commands.try_recv() {
            behavior.apply(command);
        }
        publish(status, behavior, base, None);

        let idle = match behavior.tick(base, heading, batteries).await {
            Ok(action) => {
                publish(status, behavior, base, Some(action));
                action.is_idle()
            }
            Err(e) => {
                warn!("Gait failed: {}", e);
                true
            }
        };

        if idle {
            sleep(IDLE_INTERVAL).await;
        }
    }
}

fn publish(
    status: &watch::Sender<RobotStatus>,
    behavior: &Behavior,
    base: &Base,
    action: Option<BehaviorAction>,
) {
    let mode = behavior.mode();
    let walk_speed = behavior.walk_speed();
    let gait = base.state();
    status.send_modify(|status| {
        status.mode = mode;
        status.walk_speed = walk_speed;
        status.gait = gait;
        if action.is_some() {
            status.last_action = action;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{GaitConfig, GaitState};
    use crate::config::{LEFT_LEGS, RIGHT_LEGS};
    use crate::kinematics::LegSolver;
    use crate::messages::WalkSpeed;
    use crate::servo::ChannelSpace;
    use crate::sim::SimHardware;

    fn coordinator(hw: &SimHardware, mode: Mode) -> (Coordinator, ChannelSpace) {
        let config = RuntimeConfig::default();
        let space = hw.channel_space().unwrap();
        let base = Base::from_layout(
            &space,
            &LEFT_LEGS,
            &RIGHT_LEGS,
            LegSolver::default(),
            GaitConfig::from(&config),
        )
        .unwrap();
        let coordinator = Coordinator::new(
            base,
            Box::new(hw.eyes()),
            hw.batteries(&config),
            Box::new(hw.buzzer.clone()),
            hw.buttons(),
            &config,
            mode,
        );
        (coordinator, space)
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_rests_and_disables() {
        let hw = SimHardware::new();
        let (coordinator, _space) = coordinator(&hw, Mode::Walk);
        let status = coordinator.status();
        coordinator
            .command_sender()
            .send(BehaviorCommand::SetWalkSpeed {
                walk_speed: WalkSpeed::Fast,
            })
            .unwrap();

        let walking = async {
            sleep(Duration::from_millis(500)).await;
            assert!(hw.any_servo_powered());
        };
        let (result, ()) = tokio::join!(coordinator.run(sleep(Duration::from_secs(1))), walking);

        result.unwrap();
        assert!(!hw.any_servo_powered());
        let status = status.borrow();
        assert_eq!(status.walk_speed, WalkSpeed::Fast);
        assert_eq!(status.gait, GaitState::Disabled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mode_button_click_toggles_mode() {
        let hw = SimHardware::new();
        let (coordinator, _space) = coordinator(&hw, Mode::Rest);
        let status = coordinator.status();

        let presser = async {
            sleep(Duration::from_millis(100)).await;
            hw.mode_input.set(false);
            sleep(Duration::from_millis(100)).await;
            hw.mode_input.set(true);
        };
        let (result, ()) = tokio::join!(coordinator.run(sleep(Duration::from_secs(1))), presser);

        result.unwrap();
        assert_eq!(status.borrow().mode, Mode::Walk);
        assert!(!hw.any_servo_powered());
    }

    #[tokio::test(start_paused = true)]
    async fn test_speed_button_click_toggles_speed() {
        let hw = SimHardware::new();
        let (coordinator, _space) = coordinator(&hw, Mode::Rest);
        let status = coordinator.status();

        let presser = async {
            sleep(Duration::from_millis(100)).await;
            hw.speed_input.set(false);
            sleep(Duration::from_millis(100)).await;
            hw.speed_input.set(true);
        };
        let (result, ()) = tokio::join!(coordinator.run(sleep(Duration::from_secs(1))), presser);

        result.unwrap();
        let status = status.borrow();
        assert_eq!(status.walk_speed, WalkSpeed::Fast);
        assert_eq!(status.mode, Mode::Rest);
        assert_eq!(status.last_action, Some(BehaviorAction::Idle));
    }

    #[tokio::test(start_paused = true)]
    async fn test_low_batteries_chirp_and_rest() {
        let hw = SimHardware::new();
        hw.batteries.set_logic(6.0);
        hw.batteries.set_motor(6.0);
        let (coordinator, _space) = coordinator(&hw, Mode::Walk);
        let status = coordinator.status();

        coordinator.run(sleep(Duration::from_millis(800))).await.unwrap();

        // One chirp for logic, two for motor
        assert_eq!(hw.buzzer.pulses(), 3);
        assert!(!hw.any_servo_powered());
        let status = status.borrow();
        let battery = status.battery.unwrap();
        assert!(battery.logic_low && battery.motor_low);
        assert_eq!(status.mode, Mode::Walk);
    }
}
