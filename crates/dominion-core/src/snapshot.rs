//! Snapshot persistence for the full engine state.
//!
//! The persistence contract is deliberately small: a [`SnapshotStore`] can
//! load and save one [`EngineSnapshot`], which carries every entity the
//! data model names — player accounts, market prices, tasks, completed
//! research, provinces, and world events. All numeric fields round-trip
//! losslessly: balances and prices are `f64` in memory and `f64` on disk.
//!
//! Two implementations ship with the engine: an in-memory store for tests
//! and a JSON file store for the binary. A relational backend would slot
//! in behind the same trait.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use dominion_ledger::PlayerAccount;
use dominion_types::{MarketPrice, PlayerId, Province, Task, WorldEvent};

/// Errors produced by snapshot persistence.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Reading or writing the snapshot file failed.
    #[error("failed to access snapshot file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Encoding or decoding the snapshot failed.
    #[error("failed to encode or decode snapshot: {source}")]
    Serde {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}

/// The complete serializable engine state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// When the snapshot was taken.
    pub saved_at: DateTime<Utc>,
    /// Every player account, including balances, morale, units, and logs.
    pub accounts: Vec<PlayerAccount>,
    /// The full market price table.
    pub prices: Vec<MarketPrice>,
    /// Every task ever accepted, terminal states included.
    pub tasks: Vec<Task>,
    /// Completed research definition ids per player.
    pub completed_research: BTreeMap<PlayerId, BTreeSet<String>>,
    /// The province map with current weather.
    pub provinces: Vec<Province>,
    /// World event history, active and expired.
    pub events: Vec<WorldEvent>,
}

/// Load/save contract for engine snapshots.
pub trait SnapshotStore: Send + Sync {
    /// Load the most recent snapshot, or `None` when none exists.
    fn load(&self) -> Result<Option<EngineSnapshot>, SnapshotError>;

    /// Persist a snapshot, replacing any previous one.
    fn save(&self, snapshot: &EngineSnapshot) -> Result<(), SnapshotError>;
}

/// In-memory snapshot store, mainly for tests.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    /// The single retained snapshot.
    slot: Mutex<Option<EngineSnapshot>>,
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Option<EngineSnapshot>, SnapshotError> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, snapshot: &EngineSnapshot) -> Result<(), SnapshotError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        Ok(())
    }
}

/// Snapshot store backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    /// Where the snapshot lives on disk.
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store writing to the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<EngineSnapshot>, SnapshotError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        let snapshot = serde_json::from_str(&contents)?;
        debug!(path = %self.path.display(), "Snapshot loaded");
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &EngineSnapshot) -> Result<(), SnapshotError> {
        let json = serde_json::to_string_pretty(snapshot)?;
        // Write-then-rename so a crash mid-write cannot truncate the
        // only copy.
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "Snapshot saved");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use dominion_types::ResourceKind;

    use super::*;

    fn sample_snapshot() -> EngineSnapshot {
        let player = PlayerId::new();
        let mut research = BTreeMap::new();
        research.insert(
            player,
            ["basic_training".to_owned()].into_iter().collect(),
        );
        EngineSnapshot {
            saved_at: Utc::now(),
            accounts: Vec::new(),
            prices: vec![MarketPrice {
                kind: ResourceKind::Iron,
                price: 1.618_033_988_749_894_8,
                previous_price: 1.5,
                change: 0.118_033_988_749_894_8,
                change_percent: 7.868_932_583_326_32,
                demand: 0.55,
                supply: 0.45,
                updated_at: Utc::now(),
            }],
            tasks: Vec::new(),
            completed_research: research,
            provinces: Vec::new(),
            events: Vec::new(),
        }
    }

    #[test]
    fn memory_store_roundtrip() {
        let store = MemorySnapshotStore::default();
        assert!(store.load().unwrap().is_none());

        let snapshot = sample_snapshot();
        store.save(&snapshot).unwrap();
        assert_eq!(store.load().unwrap(), Some(snapshot));
    }

    #[test]
    fn file_store_roundtrips_floats_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));
        assert!(store.load().unwrap().is_none());

        let snapshot = sample_snapshot();
        store.save(&snapshot).unwrap();

        let restored = store.load().unwrap().unwrap();
        // Bit-exact price after a disk roundtrip, not merely close.
        assert_eq!(restored, snapshot);
        let price = restored.prices.first().unwrap();
        assert!(price.price.to_bits() == 1.618_033_988_749_894_8_f64.to_bits());
    }

    #[test]
    fn file_store_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));

        let first = sample_snapshot();
        store.save(&first).unwrap();

        let mut second = sample_snapshot();
        second.events = Vec::new();
        second.saved_at = first.saved_at + chrono::Duration::hours(1);
        store.save(&second).unwrap();

        assert_eq!(store.load().unwrap(), Some(second));
    }

    #[test]
    fn corrupt_file_is_a_typed_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json at all").unwrap();

        let store = JsonFileStore::new(path);
        assert!(matches!(store.load(), Err(SnapshotError::Serde { .. })));
    }
}
