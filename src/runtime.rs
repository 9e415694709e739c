// Runtime wiring: hardware, coordinator and the zenoh remote bridge
//
// The bridge runs next to the coordinator. Each tick it drains remote
// behavior commands into the coordinator's channel and publishes the latest
// robot status.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::interval;
use tracing::{info, warn};

use crate::base::{Base, GaitConfig};
use crate::config::{LEFT_LEGS, RIGHT_LEGS, RuntimeConfig, STATUS_HZ, TOPIC_CMD_BEHAVIOR, TOPIC_STATUS};
use crate::coordinator::Coordinator;
use crate::kinematics::LegSolver;
use crate::messages::{BehaviorCommand, Mode, RobotStatus};
use crate::sim::SimHardware;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub async fn run(config: RuntimeConfig, offline: bool, initial_mode: Mode) -> Result<(), BoxError> {
    config.validate()?;

    info!("Opening simulated hardware...");
    let hardware = SimHardware::new();
    let space = hardware.channel_space()?;
    let base = Base::from_layout(
        &space,
        &LEFT_LEGS,
        &RIGHT_LEGS,
        LegSolver::default(),
        GaitConfig::from(&config),
    )?;

    let coordinator = Coordinator::new(
        base,
        Box::new(hardware.eyes()),
        hardware.batteries(&config),
        Box::new(hardware.buzzer.clone()),
        hardware.buttons(),
        &config,
        initial_mode,
    );

    let bridge = if offline {
        info!("Offline: remote bridge disabled");
        None
    } else {
        let commands = coordinator.command_sender();
        let status = coordinator.status();
        Some(tokio::spawn(async move {
            if let Err(e) = run_bridge(commands, status).await {
                warn!("Remote bridge stopped: {}", e);
            }
        }))
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let result = coordinator.run(shutdown).await;

    if let Some(bridge) = bridge {
        bridge.abort();
    }
    // Dropping the channel space leaves every servo unpowered
    drop(space);
    info!("Runtime stopped");

    result?;
    Ok(())
}

async fn run_bridge(
    commands: mpsc::UnboundedSender<BehaviorCommand>,
    status: watch::Receiver<RobotStatus>,
) -> Result<(), BoxError> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let subscriber = session.declare_subscriber(TOPIC_CMD_BEHAVIOR).await?;
    let pub_status = session.declare_publisher(TOPIC_STATUS).await?;

    let mut tick = interval(Duration::from_millis(1000 / STATUS_HZ));

    info!("Remote bridge started: {}Hz status", STATUS_HZ);
    info!("Subscribed to: {}", TOPIC_CMD_BEHAVIOR);
    info!("Publishing to: {}", TOPIC_STATUS);

    loop {
        tick.tick().await;

        // 1. Drain all pending commands (non-blocking)
        while let Ok(Some(sample)) = subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<BehaviorCommand>(&payload) {
                Ok(command) => {
                    info!("Received command: {:?}", command);
                    commands.send(command)?;
                }
                Err(e) => {
                    warn!("Failed to parse command: {}", e);
                }
            }
        }

        // 2. Publish status
        let status_json = serde_json::to_string(&*status.borrow())?;
        pub_status.put(status_json).await?;
    }
}
