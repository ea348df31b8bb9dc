//! Player accounts and the transaction ledger for the Dominion game engine.
//!
//! The ledger is the sole mutator of player state: resource balances (gold
//! is the distinguished [`ResourceKind::Gold`] balance), morale, and unit
//! holdings. Every successful mutation appends a [`TransactionRecord`] to
//! the owner's bounded log, in the order the mutations were applied.
//!
//! # Guarantees
//!
//! - **Non-negativity**: a debit larger than the balance fails atomically
//!   and leaves the balance untouched.
//! - **Capacity clamp**: credits clamp at the configured per-resource
//!   storage capacity; the excess is dropped, never an error. Gold is
//!   never capped.
//! - **Transfer atomicity**: a transfer either moves the amount from one
//!   account to the other (modulo the capacity clamp) or changes neither.
//! - **Per-player linearization**: all mutations against one player take
//!   that player's lock, so two concurrent trades cannot both pass a
//!   stale balance check.
//!
//! [`ResourceKind::Gold`]: dominion_types::ResourceKind::Gold

mod account;
mod store;

pub use account::PlayerAccount;
pub use store::{EntryDetails, LedgerStore};

use dominion_types::{PlayerId, ResourceKind};

/// Tuning parameters for the ledger.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Gold credited to a freshly created account.
    pub starting_gold: f64,
    /// Morale assigned to a freshly created account.
    pub starting_morale: f64,
    /// Per-resource storage capacity, or `None` for unlimited storage.
    /// Gold ignores this in either case.
    pub default_capacity: Option<f64>,
    /// Maximum number of retained transaction records per player.
    pub log_cap: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            starting_gold: 1_000.0,
            starting_morale: 100.0,
            default_capacity: Some(1_000.0),
            log_cap: 1_000,
        }
    }
}

/// Errors produced by ledger mutations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// A debit was larger than the available balance.
    #[error(
        "insufficient funds for {player}: wanted {requested} {resource:?} but only have {available}"
    )]
    InsufficientFunds {
        /// The player whose balance was checked.
        player: PlayerId,
        /// The resource being debited.
        resource: ResourceKind,
        /// The quantity requested.
        requested: f64,
        /// The quantity actually held.
        available: f64,
    },

    /// A unit removal was larger than the holding.
    #[error("insufficient units for {player}: wanted {requested} {unit} but only have {available}")]
    InsufficientUnits {
        /// The player whose holdings were checked.
        player: PlayerId,
        /// The unit type identifier.
        unit: String,
        /// The count requested.
        requested: u32,
        /// The count actually held.
        available: u32,
    },

    /// Mutation amounts must be finite and strictly positive.
    #[error("mutation amount must be positive and finite, got {amount}")]
    InvalidAmount {
        /// The offending amount.
        amount: f64,
    },

    /// A transfer named the same account on both sides.
    #[error("cannot transfer from {0} to itself")]
    SelfTransfer(PlayerId),
}
