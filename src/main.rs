//! Turnbot - demo runner for the turn-synchronized bot runtime
//!
//! Plays a patrol bot against the in-process loopback arena:
//! - loads `.env` and the environment into `Config`
//! - runs the arena on the tokio runtime until the game ends or Ctrl+C

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use turnbot_runtime::loopback::{deliver, LoopbackArena};
use turnbot_runtime::protocol::ServerMsg;
use turnbot_runtime::{ActionScheduler, BotControl, BotError, Config, JsonFrameSink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    info!("Starting turnbot");
    info!(
        rounds = config.arena.rounds,
        turns_per_round = config.arena.turns_per_round,
        "Arena {}x{}",
        config.arena.width,
        config.arena.height
    );

    let (intent_tx, intent_rx) = mpsc::unbounded_channel();
    let scheduler = Arc::new(ActionScheduler::new(
        &config.scheduler,
        patrol,
        JsonFrameSink::new(intent_tx),
    ));

    let arena = LoopbackArena::new(config.arena);
    let game_id = arena.game_id();

    tokio::select! {
        summary = arena.run(scheduler.clone(), intent_rx) => {
            info!(
                game_id = %summary.game_id,
                rounds = summary.rounds,
                turns = summary.turns,
                skipped = summary.skipped_turns,
                late = summary.late_intents,
                walls = summary.wall_hits,
                shots = summary.shots,
                max_turn_micros = summary.max_turn_micros,
                "Game summary"
            );
        }
        _ = shutdown_signal() => {
            deliver(&scheduler, ServerMsg::GameAborted).await;
            info!(game_id = %game_id, "Game aborted");
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Demo bot: sweep the radar, drive a square and fire whenever the gun is cool
fn patrol(bot: &BotControl) -> Result<(), BotError> {
    bot.set_adjust_gun_for_body_turn(true)?;
    bot.set_radar_turn_rate(f64::INFINITY)?;

    while bot.is_running() {
        bot.forward(150.0)?;
        if bot.gun_heat() == 0.0 {
            bot.fire(1.5)?;
        }
        bot.turn_gun_right(30.0)?;
        bot.turn_left(90.0)?;
    }
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, aborting game");
        }
        _ = terminate => {
            info!("Received terminate signal, aborting game");
        }
    }
}
