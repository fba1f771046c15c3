/// Playhead - queue-driven playback from the terminal
use clap::Parser;
use playhead_cli::{session, CliConfig, LoggingListener, SimulatedEngine};
use playhead_playback::PlaybackController;
use std::{io, path::PathBuf, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "playhead")]
#[command(about = "Drive a play queue with a simulated engine", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "PLAYHEAD_LOG_LEVEL")]
    log_level: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref())?;

    // Initialize tracing
    let fallback = cli.log_level.unwrap_or_else(|| config.log.level.clone());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    tracing::info!("Starting Playhead");
    tracing::info!("Skip-back threshold: {}ms", config.playback.skip_back_threshold_ms);
    tracing::info!("Accepted schemes: {}", config.engine.schemes.join(", "));

    let engine_settings = config.engine.clone();
    let controller = PlaybackController::with_engine(config.playback.clone(), |notifier| {
        SimulatedEngine::new(engine_settings, notifier)
    })?;
    controller.add_listener(Arc::new(LoggingListener));
    let event_loop = controller.spawn_event_loop()?;

    println!("{}", playhead_cli::commands::HELP);
    let stdin = io::stdin();
    let result = session::run(&controller, stdin.lock(), io::stdout());

    controller.release();
    if event_loop.join().is_err() {
        tracing::warn!("Event loop thread panicked");
    }
    tracing::info!("Stopped");

    result.map_err(Into::into)
}
