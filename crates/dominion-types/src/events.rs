//! Structured notification events produced by the engine.
//!
//! Every state mutation the presentation layer might want to render emits
//! exactly one [`EngineEvent`] carrying the full post-mutation state, so a
//! consumer never has to read engine internals to build a message.

use serde::{Deserialize, Serialize};

use crate::structs::{CombatReport, MarketPrice, Reward, Task, TransactionRecord, WorldEvent};

/// A structured notification emitted by the engine core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// A resource price moved during a market tick.
    PriceUpdated {
        /// The full post-update market state for the resource.
        quote: MarketPrice,
    },
    /// A buy, sell, or exchange completed against a player's ledger.
    TradeExecuted {
        /// The transaction that was appended to the log.
        record: TransactionRecord,
    },
    /// A battle was resolved and its outcome applied.
    CombatResolved {
        /// The full battle report.
        report: CombatReport,
    },
    /// A task reached `progress == 1.0` and its rewards were paid.
    TaskCompleted {
        /// The task in its terminal state.
        task: Task,
        /// The rewards that were credited.
        rewards: Vec<Reward>,
    },
    /// A task was explicitly failed.
    TaskFailed {
        /// The task in its terminal state.
        task: Task,
        /// Why the task failed.
        reason: String,
    },
    /// A task ran past its duration and was expired by the sweep.
    TaskExpired {
        /// The task in its terminal state.
        task: Task,
    },
    /// The world-event generator (or an administrator) created an event.
    WorldEventCreated {
        /// The newly created event.
        event: WorldEvent,
    },
}
