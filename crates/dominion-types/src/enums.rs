//! Enumeration types for the Dominion game engine.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// A tradable resource recognized by the market and the ledger.
///
/// The set is fixed at startup; every kind has a matching
/// [`ResourceDef`](crate::structs::ResourceDef) in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    // --- Basic ---
    /// Universal currency and store of value.
    Gold,
    /// Feeds population growth and military operations.
    Food,
    /// Critical for survival and industrial processes.
    Water,

    // --- Industrial ---
    /// Primary energy source for vehicles and industry.
    Oil,
    /// Construction and weapons manufacturing input.
    Iron,
    /// Electrical power for all operations.
    Energy,
    /// General construction and manufacturing materials.
    Materials,

    // --- Human ---
    /// Citizens available for work and military service.
    Population,
    /// Trained personnel available for military operations.
    Manpower,
    /// Scientific and technical expertise; pays for research.
    Knowledge,

    // --- Military ---
    /// High-grade fuel for military vehicles.
    Fuel,
    /// Rounds and ordnance for military operations.
    Ammunition,
    /// Medical equipment and supplies for the wounded.
    MedicalSupplies,

    // --- Advanced ---
    /// Advanced technological capability.
    Technology,
    /// Political and diplomatic leverage.
    Influence,
}

impl ResourceKind {
    /// Every resource kind, in catalog order.
    pub const ALL: [Self; 15] = [
        Self::Gold,
        Self::Food,
        Self::Water,
        Self::Oil,
        Self::Iron,
        Self::Energy,
        Self::Materials,
        Self::Population,
        Self::Manpower,
        Self::Knowledge,
        Self::Fuel,
        Self::Ammunition,
        Self::MedicalSupplies,
        Self::Technology,
        Self::Influence,
    ];

    /// The category this resource belongs to.
    pub const fn category(self) -> ResourceCategory {
        match self {
            Self::Gold | Self::Food | Self::Water => ResourceCategory::Basic,
            Self::Oil | Self::Iron | Self::Energy | Self::Materials => {
                ResourceCategory::Industrial
            }
            Self::Population | Self::Manpower | Self::Knowledge => ResourceCategory::Human,
            Self::Fuel | Self::Ammunition | Self::MedicalSupplies => ResourceCategory::Military,
            Self::Technology | Self::Influence => ResourceCategory::Advanced,
        }
    }
}

/// Broad grouping of resource kinds, used for display and analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceCategory {
    /// Gold, food, water.
    Basic,
    /// Oil, iron, energy, materials.
    Industrial,
    /// Population, manpower, knowledge.
    Human,
    /// Fuel, ammunition, medical supplies.
    Military,
    /// Technology, influence.
    Advanced,
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// The category of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TradeKind {
    /// Resource bought on the market for gold.
    Buy,
    /// Resource sold on the market for gold.
    Sell,
    /// Resource exchanged directly for another resource.
    Trade,
    /// Resource credited from income, rewards, or grants.
    Earn,
    /// Resource debited for building, upkeep, or research.
    Spend,
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Lifecycle state of a quest or research task.
///
/// Transitions run strictly forward: `Active` moves to exactly one of the
/// three terminal states and never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Accepted and in progress.
    Active,
    /// Finished successfully; rewards have been paid.
    Completed,
    /// Explicitly failed (for example through a lost battle).
    Failed,
    /// Ran past its duration without completing.
    Expired,
}

impl TaskStatus {
    /// Whether this status admits no further transitions.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Expired)
    }
}

/// The archetype of a task definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    /// Intelligence gathering; short duration, modest reward.
    Recon,
    /// Disruption behind enemy lines; requires units.
    Sabotage,
    /// Protection duty; medium duration.
    Escort,
    /// Offensive operation; long duration, large reward, unit requirements.
    Invasion,
    /// Technology research; charges knowledge, progresses automatically.
    Research,
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Weather over a province. Feeds the combat weather modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weather {
    /// No combat effect.
    Clear,
    /// Slightly favors defenders.
    Rain,
    /// Strongly favors defenders.
    Storm,
    /// Reduced visibility; favors defenders.
    Fog,
    /// Cold-weather conditions; no combat effect of its own.
    Snow,
    /// Overcast; no combat effect.
    Cloudy,
}

/// Category of a world event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    /// Booms, crashes, embargoes, discoveries.
    Economic,
    /// Arms races, coups, treaties.
    Military,
    /// Hurricanes, droughts, earthquakes, pandemics.
    Natural,
    /// Elections, revolutions, alliances, summits.
    Political,
}

/// Severity band of a world event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Barely noticeable.
    Low,
    /// Typical event.
    Medium,
    /// Significant disruption.
    High,
    /// World-shaping.
    Critical,
}

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Broad class of a military unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnitClass {
    /// Foot soldiers and specialists.
    Infantry,
    /// Tanks and armored vehicles.
    Armor,
    /// Fighters, bombers, and support aircraft.
    Aircraft,
    /// Warships and submarines.
    Naval,
    /// Rockets and guided missiles.
    Missile,
    /// Static defensive emplacements.
    Defense,
}
