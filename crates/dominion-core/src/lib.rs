//! Engine facade, background scheduler, configuration, and snapshot
//! persistence for the Dominion simulation.
//!
//! This crate assembles the component engines into one runnable whole:
//!
//! - [`config`] -- Typed configuration loaded from `dominion-config.yaml`,
//!   carrying every hand-tuned gameplay constant.
//! - [`engine`] -- [`GameEngine`], the facade exposing foreground
//!   operations (trades, builds, attacks, quests), background jobs, the
//!   admin contract, and the notification broadcast.
//! - [`scheduler`] -- Named, independently-erroring periodic jobs with
//!   watch-signalled graceful shutdown.
//! - [`snapshot`] -- The [`SnapshotStore`] persistence contract with
//!   in-memory and JSON-file implementations.
//!
//! [`GameEngine`]: engine::GameEngine
//! [`SnapshotStore`]: snapshot::SnapshotStore

pub mod config;
pub mod engine;
pub mod scheduler;
pub mod snapshot;

pub use config::{ConfigError, GameConfig};
pub use engine::{EngineError, GameEngine};
pub use scheduler::Scheduler;
pub use snapshot::{
    EngineSnapshot, JsonFileStore, MemorySnapshotStore, SnapshotError, SnapshotStore,
};
