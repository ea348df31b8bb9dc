//! Core entity structs for the Dominion game engine.
//!
//! Everything here is plain data: serializable, cloneable, and free of
//! engine logic beyond small constructors and clamps. The structs mirror
//! what the persistence contract must round-trip losslessly — numeric
//! fields stay `f64`/`u32`/`u64` end to end.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{
    EventCategory, EventSeverity, ResourceCategory, ResourceKind, TaskKind, TaskStatus,
    TradeKind, UnitClass, Weather,
};
use crate::ids::{EntryId, PlayerId, ProvinceId, TaskId, WorldEventId};

// ---------------------------------------------------------------------------
// Resource definitions and prices
// ---------------------------------------------------------------------------

/// Static definition of a tradable resource, loaded once at startup.
///
/// Invariant: `0 < min_price < max_price` and `base_value > 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDef {
    /// The resource this definition describes.
    pub kind: ResourceKind,
    /// Category grouping for display and analysis.
    pub category: ResourceCategory,
    /// Human-readable name.
    pub name: String,
    /// One-line description.
    pub description: String,
    /// Base value in gold; the anchor for price seeding and impact floors.
    pub base_value: f64,
    /// Price volatility, 0.0 to 1.0.
    pub volatility: f64,
    /// Rarity factor, 0.0 to 1.0.
    pub rarity: f64,
    /// Fraction of stored quantity lost per hour.
    pub decay_rate: f64,
    /// Storage cost per unit per hour.
    pub storage_cost: f64,
    /// Unit label ("tons", "barrels", ...).
    pub unit: String,
    /// Hard lower bound on the market price.
    pub min_price: f64,
    /// Hard upper bound on the market price.
    pub max_price: f64,
}

/// Mutable market state for one resource.
///
/// Created when the market engine initializes and mutated only by its
/// tick and trade-impact paths. Never destroyed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketPrice {
    /// The resource being priced.
    pub kind: ResourceKind,
    /// Current price in gold per unit.
    pub price: f64,
    /// Price before the most recent update.
    pub previous_price: f64,
    /// Absolute change from the previous update.
    pub change: f64,
    /// Percentage change from the previous update.
    pub change_percent: f64,
    /// Current demand level, 0.1 to 1.0.
    pub demand: f64,
    /// Current supply level, 0.1 to 1.0.
    pub supply: f64,
    /// When the price was last updated.
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// One immutable entry in a player's transaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Unique entry identifier (time-ordered).
    pub id: EntryId,
    /// The player whose balance changed.
    pub player: PlayerId,
    /// The resource that moved.
    pub resource: ResourceKind,
    /// Quantity moved (always positive; direction comes from `kind`).
    pub amount: f64,
    /// Market price per unit at the time of the mutation.
    pub unit_price: f64,
    /// What kind of movement this was.
    pub kind: TradeKind,
    /// Wall-clock time of the mutation.
    pub occurred_at: DateTime<Utc>,
    /// Human-readable summary ("Bought 10 iron", "Quest reward", ...).
    pub description: String,
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// A reward paid out when a task completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reward {
    /// Gold credited to the owner.
    Gold(f64),
    /// A non-gold resource credited to the owner.
    Resource {
        /// The resource kind.
        kind: ResourceKind,
        /// Quantity credited.
        amount: f64,
    },
    /// A morale adjustment (positive or negative), clamped to 0..=100.
    Morale(f64),
}

/// A typed technology effect granted by completed research.
///
/// Effects are tagged variants rather than string-keyed maps so every
/// consumer handles them exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TechEffect {
    /// Flat multiplier bonus to all combat power (0.15 means +15%).
    CombatBonus(f64),
    /// Combat power bonus restricted to one unit class.
    UnitClassBonus {
        /// The unit class whose power improves.
        class: UnitClass,
        /// Fractional bonus (0.25 means +25%).
        bonus: f64,
    },
    /// Production bonus for one resource in the income settlement.
    ProductionBonus {
        /// The resource whose production improves.
        kind: ResourceKind,
        /// Fractional bonus (0.3 means +30%).
        bonus: f64,
    },
    /// Production bonus applied to every produced resource.
    AllProduction(f64),
    /// Multiplier bonus to automatic research progress.
    ResearchSpeed(f64),
}

/// Static definition of a quest or research project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    /// Stable catalog identifier ("recon_patrol", "basic_training", ...).
    pub id: String,
    /// The archetype of the task.
    pub kind: TaskKind,
    /// Display title.
    pub title: String,
    /// Display description.
    pub description: String,
    /// Difficulty band, 1 to 5.
    pub difficulty: u8,
    /// Wall-clock duration in seconds before an active instance expires.
    pub duration_secs: u64,
    /// Resources charged when the task is accepted.
    pub acceptance_cost: BTreeMap<ResourceKind, f64>,
    /// Units the owner must hold to accept the task.
    pub required_units: BTreeMap<String, u32>,
    /// Research definitions that must be completed first.
    pub prerequisites: Vec<String>,
    /// Rewards paid on completion.
    pub rewards: Vec<Reward>,
    /// Technology effects applied on completion (research only).
    pub effects: Vec<TechEffect>,
}

/// A live task instance owned by a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique instance identifier.
    pub id: TaskId,
    /// The player (or nation) running the task.
    pub owner: PlayerId,
    /// Catalog id of the definition this instance was accepted from.
    pub definition_id: String,
    /// The archetype, denormalized from the definition.
    pub kind: TaskKind,
    /// Current lifecycle state.
    pub status: TaskStatus,
    /// Completion fraction, 0.0 to 1.0.
    pub progress: f64,
    /// When the task was accepted.
    pub started_at: DateTime<Utc>,
    /// Instant past which an active instance expires.
    pub expires_at: DateTime<Utc>,
    /// When the task reached a terminal state, if it has.
    pub finished_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// World events and provinces
// ---------------------------------------------------------------------------

/// A world event injected by the generator (or an administrator).
///
/// Events are read by the market engine (price bias) and the morale pass
/// while active; once `now > expires_at` they are inert but remain in
/// history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldEvent {
    /// Unique event identifier.
    pub id: WorldEventId,
    /// Event category.
    pub category: EventCategory,
    /// Severity band.
    pub severity: EventSeverity,
    /// Short display title ("Oil Crisis").
    pub title: String,
    /// Human-readable description.
    pub description: String,
    /// Resources whose prices the event biases.
    pub affected_resources: Vec<ResourceKind>,
    /// Provinces the event touches.
    pub affected_provinces: Vec<ProvinceId>,
    /// Signed per-tick price impact before intensity scaling.
    pub impact: f64,
    /// Intensity multiplier, 0.0 to 1.0.
    pub intensity: f64,
    /// Morale added to every player per morale pass while active.
    pub morale_bonus: f64,
    /// Morale removed from every player per morale pass while active.
    pub morale_penalty: f64,
    /// When the event was created.
    pub created_at: DateTime<Utc>,
    /// When the event stops having any effect.
    pub expires_at: DateTime<Utc>,
}

impl WorldEvent {
    /// Whether the event still affects prices and morale at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now <= self.expires_at
    }
}

/// A province on the world map.
///
/// Infrastructure drives the combat terrain modifier; weather drifts
/// randomly over time and drives the combat weather modifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Province {
    /// Unique province identifier.
    pub id: ProvinceId,
    /// Display name.
    pub name: String,
    /// Infrastructure level, 0.0 to 1.0 and above for urban centers.
    pub infrastructure: f64,
    /// Current weather.
    pub weather: Weather,
    /// Current temperature in degrees Celsius.
    pub temperature: f64,
}

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Static combat and cost statistics for one unit type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSpec {
    /// Stable catalog identifier ("rifleman", "main_battle_tank", ...).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Broad class of the unit.
    pub class: UnitClass,
    /// Technology tier, 1 to 4.
    pub tier: u8,
    /// Gold cost to build one unit.
    pub cost: f64,
    /// Gold upkeep per settlement per unit.
    pub upkeep: f64,
    /// Attack rating.
    pub attack: u32,
    /// Defense rating.
    pub defense: u32,
    /// Speed rating.
    pub speed: u32,
    /// Research definition ids that must be completed before building.
    pub requires: Vec<String>,
}

// ---------------------------------------------------------------------------
// Combat
// ---------------------------------------------------------------------------

/// The full outcome of one resolved battle.
///
/// Carries everything the presentation layer needs to render the result
/// without reading any further engine state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatReport {
    /// The player who initiated the attack.
    pub attacker: PlayerId,
    /// The player who was attacked.
    pub defender: PlayerId,
    /// The province the battle was fought over.
    pub province: ProvinceId,
    /// The winning side.
    pub winner: PlayerId,
    /// The attacker's win probability that was rolled against.
    pub odds: f64,
    /// Attacker combat power after modifiers.
    pub attacker_power: f64,
    /// Defender combat power.
    pub defender_power: f64,
    /// Attacker losses per unit type.
    pub attacker_casualties: BTreeMap<String, u32>,
    /// Defender losses per unit type.
    pub defender_casualties: BTreeMap<String, u32>,
    /// Morale change applied to the attacker.
    pub attacker_morale_delta: f64,
    /// Morale change applied to the defender.
    pub defender_morale_delta: f64,
    /// When the battle was resolved.
    pub resolved_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Aggregate statistics
// ---------------------------------------------------------------------------

/// Bulk statistics for the admin contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldStats {
    /// Total gold across all player accounts.
    pub total_gold: f64,
    /// Total unit count across all players.
    pub total_units: u64,
    /// Number of registered players.
    pub player_count: usize,
    /// Number of currently active world events.
    pub active_events: usize,
    /// Number of currently active tasks.
    pub active_tasks: usize,
}
