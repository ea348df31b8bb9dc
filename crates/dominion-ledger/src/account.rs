//! A single player's balances, morale, units, and transaction log.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dominion_types::{PlayerId, ResourceKind, TransactionRecord};

/// Upper bound on morale.
pub(crate) const MORALE_MAX: f64 = 100.0;

/// Lower bound on morale.
pub(crate) const MORALE_MIN: f64 = 0.0;

/// Mutable state for one player.
///
/// Accounts are created on the player's first interaction and never
/// destroyed. All mutation goes through [`LedgerStore`], which holds one
/// lock per account.
///
/// [`LedgerStore`]: crate::LedgerStore
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerAccount {
    /// The owning player.
    pub player: PlayerId,
    /// Resource balances, including the distinguished gold balance.
    pub balances: BTreeMap<ResourceKind, f64>,
    /// Morale, clamped to 0..=100.
    pub morale: f64,
    /// Unit holdings by unit type id.
    pub units: BTreeMap<String, u32>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// Recent transactions, oldest first, bounded by the ledger config.
    pub(crate) log: VecDeque<TransactionRecord>,
}

impl PlayerAccount {
    /// Create a fresh account with the configured starting gold and morale.
    pub(crate) fn new(player: PlayerId, starting_gold: f64, starting_morale: f64) -> Self {
        let mut balances = BTreeMap::new();
        if starting_gold > 0.0 {
            balances.insert(ResourceKind::Gold, starting_gold);
        }
        Self {
            player,
            balances,
            morale: starting_morale.clamp(MORALE_MIN, MORALE_MAX),
            units: BTreeMap::new(),
            created_at: Utc::now(),
            log: VecDeque::new(),
        }
    }

    /// Current balance for a resource (zero when absent).
    pub fn balance(&self, kind: ResourceKind) -> f64 {
        self.balances.get(&kind).copied().unwrap_or(0.0)
    }

    /// Current holding for a unit type (zero when absent).
    pub fn unit_count(&self, unit: &str) -> u32 {
        self.units.get(unit).copied().unwrap_or(0)
    }

    /// Total units across all types.
    pub fn total_units(&self) -> u64 {
        self.units.values().map(|&c| u64::from(c)).sum()
    }

    /// The most recent transactions, newest last.
    pub fn recent_transactions(&self, limit: usize) -> Vec<TransactionRecord> {
        let start = self.log.len().saturating_sub(limit);
        self.log.iter().skip(start).cloned().collect()
    }

    /// Append a record, evicting the oldest entry past the cap.
    pub(crate) fn push_record(&mut self, record: TransactionRecord, cap: usize) {
        self.log.push_back(record);
        while self.log.len() > cap {
            self.log.pop_front();
        }
    }

    /// Add to a balance, clamping at `capacity` when one applies.
    ///
    /// Returns the amount actually credited (which may be smaller than
    /// requested, down to zero, when the clamp engages).
    pub(crate) fn credit_clamped(
        &mut self,
        kind: ResourceKind,
        amount: f64,
        capacity: Option<f64>,
    ) -> f64 {
        let current = self.balance(kind);
        let credited = match capacity {
            // Gold and capacity-exempt resources take the full amount.
            Some(cap) if kind != ResourceKind::Gold => (cap - current).clamp(0.0, amount),
            _ => amount,
        };
        if credited > 0.0 {
            self.balances.insert(kind, current + credited);
        }
        credited
    }

    /// Remove from a balance. The caller has already verified sufficiency.
    pub(crate) fn debit_unchecked(&mut self, kind: ResourceKind, amount: f64) {
        let current = self.balance(kind);
        // Guard against negative dust from float subtraction.
        self.balances.insert(kind, (current - amount).max(0.0));
    }

    /// Shift morale by `delta`, clamped to 0..=100. Returns the new value.
    pub(crate) fn shift_morale(&mut self, delta: f64) -> f64 {
        self.morale = (self.morale + delta).clamp(MORALE_MIN, MORALE_MAX);
        self.morale
    }
}
