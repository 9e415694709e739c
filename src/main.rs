use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use phyto_runtime::config::RuntimeConfig;
use phyto_runtime::messages::Mode;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StartMode {
    Walk,
    Rest,
}

impl From<StartMode> for Mode {
    fn from(mode: StartMode) -> Self {
        match mode {
            StartMode::Walk => Mode::Walk,
            StartMode::Rest => Mode::Rest,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "phyto-runtime")]
#[command(about = "Hexapod walking runtime with a Zenoh remote surface")]
struct Args {
    /// JSON file overriding the default tuning
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run without the Zenoh bridge
    #[arg(long)]
    offline: bool,

    /// Mode to start in
    #[arg(long, value_enum, default_value = "rest")]
    mode: StartMode,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match RuntimeConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Config error: {}", e);
                std::process::exit(1);
            }
        },
        None => RuntimeConfig::default(),
    };

    if let Err(e) = phyto_runtime::runtime::run(config, args.offline, args.mode.into()).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
