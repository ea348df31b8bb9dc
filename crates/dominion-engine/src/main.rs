//! Engine binary for the Dominion simulation.
//!
//! This is the main entry point that wires together the game engine, the
//! background-job scheduler, and snapshot persistence. It loads
//! configuration, restores any previous state, runs until interrupted,
//! and writes a final snapshot on the way out.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `dominion-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Assemble the game engine
//! 4. Restore the previous snapshot, if one exists
//! 5. Start the notification logger
//! 6. Start the scheduler (market, world, sweep, research, settlement)
//! 7. Wait for ctrl-c
//! 8. Shut the scheduler down cleanly and save a final snapshot

mod error;

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dominion_core::{GameConfig, GameEngine, JsonFileStore, Scheduler, SnapshotStore};
use dominion_types::EngineEvent;

use crate::error::RuntimeError;

/// Application entry point for the Dominion engine.
///
/// # Errors
///
/// Returns an error if configuration, snapshot persistence, or signal
/// handling fails; gameplay and job errors are handled inside the engine
/// and never terminate the process.
#[tokio::main]
async fn main() -> Result<(), RuntimeError> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging; RUST_LOG overrides the config.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .with_target(true)
        .init();

    info!(
        name = config.engine.name,
        seed = config.engine.seed,
        "dominion-engine starting"
    );

    // 3. Assemble the engine.
    let snapshot_store = JsonFileStore::new(config.engine.snapshot_path.clone());
    let engine = Arc::new(GameEngine::new(config));

    // 4. Restore previous state, if any.
    match snapshot_store.load() {
        Ok(Some(snapshot)) => engine.restore(snapshot),
        Ok(None) => info!("No previous snapshot; starting fresh"),
        // A corrupt snapshot should not stop the service; start fresh
        // and leave the file for inspection.
        Err(err) => warn!(%err, "Could not load snapshot; starting fresh"),
    }

    // 5. Forward engine notifications into the log.
    spawn_notification_logger(&engine);

    // 6. Start the background jobs.
    let scheduler = Scheduler::start(&engine);
    info!(jobs = ?scheduler.job_names(), "Background jobs running");

    // 7. Run until interrupted.
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    // 8. Clean shutdown: stop jobs, then persist the final state.
    scheduler.shutdown().await;
    snapshot_store.save(&engine.snapshot())?;

    info!("dominion-engine shutdown complete");
    Ok(())
}

/// Load the game configuration from `dominion-config.yaml`.
///
/// Looks for the config file relative to the current working directory
/// and falls back to the built-in defaults when it is absent.
fn load_config() -> Result<GameConfig, RuntimeError> {
    let config_path = Path::new("dominion-config.yaml");
    if config_path.exists() {
        Ok(GameConfig::from_file(config_path)?)
    } else {
        Ok(GameConfig::default())
    }
}

/// Drain the engine's notification stream into the structured log.
///
/// Stands in for the presentation layer: every event carries the full
/// post-mutation state, so this task never reads engine internals.
fn spawn_notification_logger(engine: &Arc<GameEngine>) {
    let mut events = engine.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(EngineEvent::PriceUpdated { quote }) => {
                    info!(
                        resource = ?quote.kind,
                        price = quote.price,
                        change_percent = quote.change_percent,
                        "Price updated"
                    );
                }
                Ok(EngineEvent::TradeExecuted { record }) => {
                    info!(
                        player = %record.player,
                        resource = ?record.resource,
                        amount = record.amount,
                        kind = ?record.kind,
                        description = record.description,
                        "Trade executed"
                    );
                }
                Ok(EngineEvent::CombatResolved { report }) => {
                    info!(
                        attacker = %report.attacker,
                        defender = %report.defender,
                        winner = %report.winner,
                        odds = report.odds,
                        "Combat resolved"
                    );
                }
                Ok(EngineEvent::TaskCompleted { task, rewards }) => {
                    info!(
                        task = %task.id,
                        owner = %task.owner,
                        definition = task.definition_id,
                        rewards = rewards.len(),
                        "Task completed"
                    );
                }
                Ok(EngineEvent::TaskFailed { task, reason }) => {
                    info!(task = %task.id, owner = %task.owner, reason, "Task failed");
                }
                Ok(EngineEvent::TaskExpired { task }) => {
                    info!(
                        task = %task.id,
                        owner = %task.owner,
                        definition = task.definition_id,
                        "Task expired"
                    );
                }
                Ok(EngineEvent::WorldEventCreated { event }) => {
                    info!(
                        event = event.title,
                        category = ?event.category,
                        severity = ?event.severity,
                        expires_at = %event.expires_at,
                        "World event created"
                    );
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Notification logger lagged behind");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
