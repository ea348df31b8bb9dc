//! The ledger store: per-player locked accounts behind one facade.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::Utc;
use tracing::{debug, warn};

use dominion_types::{EntryId, PlayerId, ResourceKind, TradeKind, TransactionRecord};

use crate::account::PlayerAccount;
use crate::{LedgerConfig, LedgerError};

/// Context for the transaction record written by a mutation.
#[derive(Debug, Clone)]
pub struct EntryDetails {
    /// Market price per unit at the time of the mutation.
    pub unit_price: f64,
    /// What kind of movement this is.
    pub kind: TradeKind,
    /// Human-readable summary for the activity log.
    pub description: String,
}

impl EntryDetails {
    /// Convenience constructor.
    pub fn new(unit_price: f64, kind: TradeKind, description: impl Into<String>) -> Self {
        Self {
            unit_price,
            kind,
            description: description.into(),
        }
    }
}

/// Thread-safe store of all player accounts.
///
/// The account map takes a read-write lock only to look up or create the
/// per-player handle; every balance mutation happens under that player's
/// own mutex, which linearizes concurrent operations against the same
/// account. Locks are held only for in-memory work, never across I/O.
#[derive(Debug)]
pub struct LedgerStore {
    /// Tuning parameters.
    config: LedgerConfig,
    /// One locked account per player.
    accounts: RwLock<BTreeMap<PlayerId, Arc<Mutex<PlayerAccount>>>>,
}

/// Recover the guard from a poisoned lock.
///
/// Account state is plain data; a panic in another thread cannot leave a
/// partially-applied mutation because each operation validates before it
/// writes. Continuing with the inner value is safe.
fn relock<'a, T>(result: Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>) -> MutexGuard<'a, T> {
    result.unwrap_or_else(PoisonError::into_inner)
}

impl LedgerStore {
    /// Create an empty store with the given configuration.
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            accounts: RwLock::new(BTreeMap::new()),
        }
    }

    /// Fetch the handle for a player's account, creating it on first use.
    fn handle(&self, player: PlayerId) -> Arc<Mutex<PlayerAccount>> {
        if let Ok(accounts) = self.accounts.read() {
            if let Some(handle) = accounts.get(&player) {
                return Arc::clone(handle);
            }
        }

        let mut accounts = self
            .accounts
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(accounts.entry(player).or_insert_with(|| {
            debug!(%player, "Creating player account");
            Arc::new(Mutex::new(PlayerAccount::new(
                player,
                self.config.starting_gold,
                self.config.starting_morale,
            )))
        }))
    }

    /// Run a closure against a player's locked account.
    fn with_account<R>(&self, player: PlayerId, f: impl FnOnce(&mut PlayerAccount) -> R) -> R {
        let handle = self.handle(player);
        let mut guard = relock(handle.lock());
        f(&mut guard)
    }

    /// Build a transaction record for a mutation that moved `amount`.
    fn record(
        player: PlayerId,
        resource: ResourceKind,
        amount: f64,
        details: &EntryDetails,
    ) -> TransactionRecord {
        TransactionRecord {
            id: EntryId::new(),
            player,
            resource,
            amount,
            unit_price: details.unit_price,
            kind: details.kind,
            occurred_at: Utc::now(),
            description: details.description.clone(),
        }
    }

    /// Validate that a mutation amount is usable.
    fn validate_amount(amount: f64) -> Result<(), LedgerError> {
        if amount.is_finite() && amount > 0.0 {
            Ok(())
        } else {
            Err(LedgerError::InvalidAmount { amount })
        }
    }

    /// Remove `amount` of `resource` from the player's balance.
    ///
    /// Fails atomically with [`LedgerError::InsufficientFunds`] when the
    /// balance is too small; the balance is untouched in that case.
    pub fn debit(
        &self,
        player: PlayerId,
        resource: ResourceKind,
        amount: f64,
        details: &EntryDetails,
    ) -> Result<TransactionRecord, LedgerError> {
        Self::validate_amount(amount)?;
        self.with_account(player, |account| {
            let available = account.balance(resource);
            if available < amount {
                return Err(LedgerError::InsufficientFunds {
                    player,
                    resource,
                    requested: amount,
                    available,
                });
            }
            account.debit_unchecked(resource, amount);
            let record = Self::record(player, resource, amount, details);
            account.push_record(record.clone(), self.config.log_cap);
            debug!(%player, ?resource, amount, "Debit applied");
            Ok(record)
        })
    }

    /// Add `amount` of `resource` to the player's balance.
    ///
    /// Always succeeds (aside from amount validation). The credited
    /// quantity clamps at the configured storage capacity; gold is exempt.
    pub fn credit(
        &self,
        player: PlayerId,
        resource: ResourceKind,
        amount: f64,
        details: &EntryDetails,
    ) -> Result<TransactionRecord, LedgerError> {
        Self::validate_amount(amount)?;
        let capacity = self.config.default_capacity;
        self.with_account(player, |account| {
            let credited = account.credit_clamped(resource, amount, capacity);
            if credited < amount {
                warn!(
                    %player,
                    ?resource,
                    requested = amount,
                    credited,
                    "Credit clamped at storage capacity"
                );
            }
            let record = Self::record(player, resource, credited, details);
            if credited > 0.0 {
                account.push_record(record.clone(), self.config.log_cap);
            }
            Ok(record)
        })
    }

    /// Move `amount` of `resource` from one player to another.
    ///
    /// Composed as debit-then-credit under both account locks, taken in
    /// id order so concurrent transfers cannot deadlock. If the debit
    /// fails, neither side changes.
    pub fn transfer(
        &self,
        from: PlayerId,
        to: PlayerId,
        resource: ResourceKind,
        amount: f64,
        details: &EntryDetails,
    ) -> Result<(), LedgerError> {
        Self::validate_amount(amount)?;
        if from == to {
            return Err(LedgerError::SelfTransfer(from));
        }

        let from_handle = self.handle(from);
        let to_handle = self.handle(to);

        // Fixed lock order by player id avoids lock-ordering deadlocks.
        let (mut first, mut second) = if from < to {
            (relock(from_handle.lock()), relock(to_handle.lock()))
        } else {
            (relock(to_handle.lock()), relock(from_handle.lock()))
        };
        let (sender, receiver) = if first.player == from {
            (&mut first, &mut second)
        } else {
            (&mut second, &mut first)
        };

        let available = sender.balance(resource);
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                player: from,
                resource,
                requested: amount,
                available,
            });
        }

        sender.debit_unchecked(resource, amount);
        sender.push_record(
            Self::record(from, resource, amount, details),
            self.config.log_cap,
        );

        let credited = receiver.credit_clamped(resource, amount, self.config.default_capacity);
        if credited > 0.0 {
            receiver.push_record(
                Self::record(to, resource, credited, details),
                self.config.log_cap,
            );
        }

        debug!(%from, %to, ?resource, amount, credited, "Transfer applied");
        Ok(())
    }

    /// Shift a player's morale by `delta`, clamped to 0..=100.
    ///
    /// Returns the morale after the shift.
    pub fn adjust_morale(&self, player: PlayerId, delta: f64) -> f64 {
        self.with_account(player, |account| account.shift_morale(delta))
    }

    /// Current morale for a player.
    pub fn morale(&self, player: PlayerId) -> f64 {
        self.with_account(player, |account| account.morale)
    }

    /// Current balance of one resource for a player.
    pub fn balance(&self, player: PlayerId, resource: ResourceKind) -> f64 {
        self.with_account(player, |account| account.balance(resource))
    }

    /// Remaining storage headroom for a resource, or `None` when the
    /// resource is uncapped (gold always is).
    pub fn remaining_capacity(&self, player: PlayerId, resource: ResourceKind) -> Option<f64> {
        if resource == ResourceKind::Gold {
            return None;
        }
        let capacity = self.config.default_capacity?;
        Some((capacity - self.balance(player, resource)).max(0.0))
    }

    /// Add units of one type to a player's holdings.
    pub fn add_units(&self, player: PlayerId, unit: &str, count: u32) {
        if count == 0 {
            return;
        }
        self.with_account(player, |account| {
            let current = account.unit_count(unit);
            account
                .units
                .insert(unit.to_owned(), current.saturating_add(count));
        });
    }

    /// Remove units of one type from a player's holdings.
    pub fn remove_units(
        &self,
        player: PlayerId,
        unit: &str,
        count: u32,
    ) -> Result<(), LedgerError> {
        if count == 0 {
            return Ok(());
        }
        self.with_account(player, |account| {
            let available = account.unit_count(unit);
            if available < count {
                return Err(LedgerError::InsufficientUnits {
                    player,
                    unit: unit.to_owned(),
                    requested: count,
                    available,
                });
            }
            let remaining = available.saturating_sub(count);
            if remaining == 0 {
                account.units.remove(unit);
            } else {
                account.units.insert(unit.to_owned(), remaining);
            }
            Ok(())
        })
    }

    /// Snapshot of a player's unit holdings.
    pub fn unit_counts(&self, player: PlayerId) -> BTreeMap<String, u32> {
        self.with_account(player, |account| account.units.clone())
    }

    /// The most recent transactions for a player, newest last.
    pub fn recent_transactions(&self, player: PlayerId, limit: usize) -> Vec<TransactionRecord> {
        self.with_account(player, |account| account.recent_transactions(limit))
    }

    /// Every known player id.
    pub fn players(&self) -> Vec<PlayerId> {
        self.accounts
            .read()
            .map(|accounts| accounts.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Total gold across every account.
    pub fn total_gold(&self) -> f64 {
        self.players()
            .into_iter()
            .map(|player| self.balance(player, ResourceKind::Gold))
            .sum()
    }

    /// Total unit count across every account.
    pub fn total_units(&self) -> u64 {
        self.players()
            .into_iter()
            .map(|player| self.with_account(player, |account| account.total_units()))
            .sum()
    }

    /// Clone every account for persistence.
    pub fn export(&self) -> Vec<PlayerAccount> {
        self.players()
            .into_iter()
            .map(|player| self.with_account(player, |account| account.clone()))
            .collect()
    }

    /// Replace the store contents with previously exported accounts.
    pub fn import(&self, accounts: Vec<PlayerAccount>) {
        let mut map = self
            .accounts
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        map.clear();
        for account in accounts {
            map.insert(account.player, Arc::new(Mutex::new(account)));
        }
    }
}
