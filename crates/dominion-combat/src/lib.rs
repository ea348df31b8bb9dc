//! Combat resolution for the Dominion game engine.
//!
//! The resolver is a pure function: it takes both forces, both morale
//! values, the environmental modifiers, and an injected random source, and
//! produces a complete [`CombatReport`] without touching any shared state.
//! The engine core applies the report afterwards (casualties through the
//! ledger, morale through the same), so a battle is never observable
//! half-resolved.
//!
//! ## Resolution flow
//!
//! 1. Compute combat power for both sides from catalog unit stats:
//!    `power = Σ count * ((attack + defense) / 2) * (morale / 100)`,
//!    scaled by any researched combat bonuses.
//! 2. Apply terrain and weather multipliers to the attacker.
//! 3. `odds = attacker / (attacker + defender)`, clamped to `[0, 1]`;
//!    both powers zero means even odds. A zero-power side facing a
//!    nonzero side gets odds 0 (or 1) from the formula itself.
//! 4. One Bernoulli draw picks the winner.
//! 5. Casualties: 10% base rate, halved for the winner and multiplied by
//!    1.5 for the loser, truncated per unit type.
//! 6. Morale: winner +5 (capped at 100 on application), loser -10.

use std::collections::BTreeMap;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use dominion_catalog::Catalog;
use dominion_types::{CombatReport, PlayerId, ProvinceId, UnitClass, Weather};

// ---------------------------------------------------------------------------
// Tuning
// ---------------------------------------------------------------------------

/// Hand-tuned combat constants, kept configurable rather than re-derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatTuning {
    /// Base casualty rate applied to both sides before the win/loss split.
    pub base_casualty_rate: f64,
    /// Multiplier on the base rate for the winning side.
    pub winner_casualty_factor: f64,
    /// Multiplier on the base rate for the losing side.
    pub loser_casualty_factor: f64,
    /// Morale gained by the winner.
    pub winner_morale_gain: f64,
    /// Morale lost by the loser.
    pub loser_morale_loss: f64,
}

impl Default for CombatTuning {
    fn default() -> Self {
        Self {
            base_casualty_rate: 0.1,
            winner_casualty_factor: 0.5,
            loser_casualty_factor: 1.5,
            winner_morale_gain: 5.0,
            loser_morale_loss: 10.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Forces and modifiers
// ---------------------------------------------------------------------------

/// A transient force: unit type id mapped to count.
///
/// Built from a player's holdings at the moment combat is invoked and
/// discarded afterwards; never persisted as its own entity.
pub type CombatForce = BTreeMap<String, u32>;

/// Research-derived power multipliers for one side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerModifiers {
    /// Flat bonus applied to every unit (0.15 means +15%).
    pub overall: f64,
    /// Additional bonus per unit class.
    pub per_class: BTreeMap<UnitClass, f64>,
}

impl PowerModifiers {
    /// Combined multiplier for a unit of the given class.
    fn multiplier(&self, class: UnitClass) -> f64 {
        1.0 + self.overall + self.per_class.get(&class).copied().unwrap_or(0.0)
    }
}

/// Everything the resolver needs to decide one battle.
#[derive(Debug, Clone)]
pub struct BattleInput {
    /// The player who initiated the attack.
    pub attacker: PlayerId,
    /// The player being attacked.
    pub defender: PlayerId,
    /// The province being fought over.
    pub province: ProvinceId,
    /// Attacker units at the moment of the attack.
    pub attacker_force: CombatForce,
    /// Defender units at the moment of the attack.
    pub defender_force: CombatForce,
    /// Attacker morale, 0..=100.
    pub attacker_morale: f64,
    /// Defender morale, 0..=100.
    pub defender_morale: f64,
    /// Infrastructure of the target province (drives terrain).
    pub infrastructure: f64,
    /// Weather over the target province.
    pub weather: Weather,
    /// Attacker research bonuses.
    pub attacker_modifiers: PowerModifiers,
    /// Defender research bonuses.
    pub defender_modifiers: PowerModifiers,
}

// ---------------------------------------------------------------------------
// Modifiers
// ---------------------------------------------------------------------------

/// Terrain multiplier from province infrastructure.
///
/// Dense infrastructure favors the defender (urban fighting); open rural
/// ground favors the attacker.
pub fn terrain_modifier(infrastructure: f64) -> f64 {
    if infrastructure > 0.8 {
        1.1
    } else if infrastructure < 0.3 {
        0.9
    } else {
        1.0
    }
}

/// Weather multiplier applied to the attacker.
pub const fn weather_modifier(weather: Weather) -> f64 {
    match weather {
        Weather::Rain => 0.9,
        Weather::Storm => 0.8,
        Weather::Fog => 0.85,
        Weather::Clear | Weather::Snow | Weather::Cloudy => 1.0,
    }
}

// ---------------------------------------------------------------------------
// Power and odds
// ---------------------------------------------------------------------------

/// Total combat power of a force at the given morale.
///
/// Unit types missing from the catalog contribute nothing; that is a
/// data-integrity anomaly, not a failure.
pub fn combat_power(
    catalog: &Catalog,
    force: &CombatForce,
    morale: f64,
    modifiers: &PowerModifiers,
) -> f64 {
    let morale_factor = morale / 100.0;
    let mut total = 0.0;
    for (unit_id, &count) in force {
        let Some(spec) = catalog.unit(unit_id) else {
            warn!(unit_id, count, "Force references unknown unit type");
            continue;
        };
        let unit_power = f64::from(spec.attack.saturating_add(spec.defense)) / 2.0;
        total += f64::from(count)
            * unit_power
            * morale_factor
            * modifiers.multiplier(spec.class);
    }
    total
}

/// Attacker win probability given both modified powers.
///
/// Both powers zero resolves to even odds; a single zero-power side gets
/// 0 or 1 from the ratio itself.
pub fn attacker_odds(attacker_power: f64, defender_power: f64) -> f64 {
    let total = attacker_power + defender_power;
    if total <= 0.0 {
        return 0.5;
    }
    (attacker_power / total).clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve one battle.
///
/// Pure apart from the injected random source: the same input and RNG
/// state always produce the same report. The caller is responsible for
/// applying casualties and morale deltas afterwards, attacker first.
pub fn resolve<R: Rng>(
    catalog: &Catalog,
    input: &BattleInput,
    tuning: &CombatTuning,
    rng: &mut R,
) -> CombatReport {
    let raw_attacker = combat_power(
        catalog,
        &input.attacker_force,
        input.attacker_morale,
        &input.attacker_modifiers,
    );
    let defender_power = combat_power(
        catalog,
        &input.defender_force,
        input.defender_morale,
        &input.defender_modifiers,
    );

    let attacker_power =
        raw_attacker * terrain_modifier(input.infrastructure) * weather_modifier(input.weather);

    let odds = attacker_odds(attacker_power, defender_power);
    let attacker_wins = rng.random_range(0.0..1.0) < odds;

    let (attacker_rate, defender_rate) = if attacker_wins {
        (
            tuning.base_casualty_rate * tuning.winner_casualty_factor,
            tuning.base_casualty_rate * tuning.loser_casualty_factor,
        )
    } else {
        (
            tuning.base_casualty_rate * tuning.loser_casualty_factor,
            tuning.base_casualty_rate * tuning.winner_casualty_factor,
        )
    };

    let (attacker_morale_delta, defender_morale_delta) = if attacker_wins {
        (tuning.winner_morale_gain, -tuning.loser_morale_loss)
    } else {
        (-tuning.loser_morale_loss, tuning.winner_morale_gain)
    };

    CombatReport {
        attacker: input.attacker,
        defender: input.defender,
        province: input.province,
        winner: if attacker_wins {
            input.attacker
        } else {
            input.defender
        },
        odds,
        attacker_power,
        defender_power,
        attacker_casualties: allocate_casualties(&input.attacker_force, attacker_rate),
        defender_casualties: allocate_casualties(&input.defender_force, defender_rate),
        attacker_morale_delta,
        defender_morale_delta,
        resolved_at: Utc::now(),
    }
}

/// Allocate casualties proportionally per unit type.
///
/// Truncates toward zero and never exceeds the pre-battle count.
fn allocate_casualties(force: &CombatForce, rate: f64) -> BTreeMap<String, u32> {
    let mut casualties = BTreeMap::new();
    for (unit_id, &count) in force {
        let raw = (f64::from(count) * rate).trunc().max(0.0);
        // rate <= 0.15 keeps this far below count; min() makes it an invariant.
        let lost = if raw >= f64::from(u32::MAX) {
            count
        } else {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let lost = raw as u32;
            lost.min(count)
        };
        casualties.insert(unit_id.clone(), lost);
    }
    casualties
}
