//! Configuration loading and typed config structures for the Dominion engine.
//!
//! The canonical configuration lives in `dominion-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads and validates the file.
//!
//! Every hand-tuned gameplay constant lives here rather than inline in the
//! engines: casualty rates, the market impact scale, the quest cap,
//! income/tax/upkeep rates, morale decay, event probability, and the
//! scheduler job intervals.

use std::path::Path;

use serde::Deserialize;

use dominion_combat::CombatTuning;
use dominion_ledger::LedgerConfig;
use dominion_tasks::TaskTuning;
use dominion_world::WorldTuning;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level game configuration.
///
/// Mirrors the structure of `dominion-config.yaml`. All fields have
/// defaults matching the standard tuning, so a missing file or a partial
/// file is always usable.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GameConfig {
    /// Engine-level settings (name, seed, snapshot path).
    #[serde(default)]
    pub engine: EngineConfig,

    /// Ledger and settlement economy parameters.
    #[serde(default)]
    pub economy: EconomyConfig,

    /// Combat resolution parameters.
    #[serde(default)]
    pub combat: CombatConfig,

    /// Quest/research tracker parameters.
    #[serde(default)]
    pub tasks: TasksConfig,

    /// World event and weather parameters.
    #[serde(default)]
    pub world: WorldConfig,

    /// Scheduler job intervals.
    #[serde(default)]
    pub jobs: JobsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GameConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yml::from_str(&contents)?)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }
}

/// Engine-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Human-readable name for the game instance.
    #[serde(default = "default_engine_name")]
    pub name: String,

    /// Random seed for price seeding and the engine's stochastic draws.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Path of the JSON snapshot written on shutdown and read on startup.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: default_engine_name(),
            seed: default_seed(),
            snapshot_path: default_snapshot_path(),
        }
    }
}

/// Ledger and settlement economy configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EconomyConfig {
    /// Gold credited to a freshly created account.
    #[serde(default = "default_starting_gold")]
    pub starting_gold: f64,

    /// Morale assigned to a freshly created account.
    #[serde(default = "default_starting_morale")]
    pub starting_morale: f64,

    /// Per-resource storage capacity; zero disables the cap entirely.
    /// Gold is never capped either way.
    #[serde(default = "default_storage_capacity")]
    pub storage_capacity: f64,

    /// Maximum retained transaction records per player.
    #[serde(default = "default_transaction_log_cap")]
    pub transaction_log_cap: usize,

    /// Gross gold income per settlement at full morale.
    #[serde(default = "default_base_income")]
    pub base_income: f64,

    /// Fraction of gross income withheld as tax.
    #[serde(default = "default_tax_rate")]
    pub tax_rate: f64,

    /// Flat morale lost per settlement.
    #[serde(default = "default_morale_decay")]
    pub morale_decay: f64,

    /// Morale lost when the treasury cannot cover unit upkeep.
    #[serde(default = "default_unpaid_upkeep_morale_loss")]
    pub unpaid_upkeep_morale_loss: f64,
}

impl EconomyConfig {
    /// The ledger tuning derived from this section.
    pub fn ledger(&self) -> LedgerConfig {
        LedgerConfig {
            starting_gold: self.starting_gold,
            starting_morale: self.starting_morale,
            default_capacity: (self.storage_capacity > 0.0).then_some(self.storage_capacity),
            log_cap: self.transaction_log_cap,
        }
    }
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_gold: default_starting_gold(),
            starting_morale: default_starting_morale(),
            storage_capacity: default_storage_capacity(),
            transaction_log_cap: default_transaction_log_cap(),
            base_income: default_base_income(),
            tax_rate: default_tax_rate(),
            morale_decay: default_morale_decay(),
            unpaid_upkeep_morale_loss: default_unpaid_upkeep_morale_loss(),
        }
    }
}

/// Combat resolution configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CombatConfig {
    /// Base casualty rate before the winner/loser split.
    #[serde(default = "default_base_casualty_rate")]
    pub base_casualty_rate: f64,

    /// Multiplier on the base rate for the winning side.
    #[serde(default = "default_winner_casualty_factor")]
    pub winner_casualty_factor: f64,

    /// Multiplier on the base rate for the losing side.
    #[serde(default = "default_loser_casualty_factor")]
    pub loser_casualty_factor: f64,

    /// Morale gained by the winner.
    #[serde(default = "default_winner_morale_gain")]
    pub winner_morale_gain: f64,

    /// Morale lost by the loser.
    #[serde(default = "default_loser_morale_loss")]
    pub loser_morale_loss: f64,

    /// Minimum attacker morale required to launch an attack.
    #[serde(default = "default_min_attack_morale")]
    pub min_attack_morale: f64,

    /// Seconds an attacker must wait between attacks.
    #[serde(default = "default_attack_cooldown_secs")]
    pub attack_cooldown_secs: u64,
}

impl CombatConfig {
    /// The resolver tuning derived from this section.
    pub const fn tuning(&self) -> CombatTuning {
        CombatTuning {
            base_casualty_rate: self.base_casualty_rate,
            winner_casualty_factor: self.winner_casualty_factor,
            loser_casualty_factor: self.loser_casualty_factor,
            winner_morale_gain: self.winner_morale_gain,
            loser_morale_loss: self.loser_morale_loss,
        }
    }
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            base_casualty_rate: default_base_casualty_rate(),
            winner_casualty_factor: default_winner_casualty_factor(),
            loser_casualty_factor: default_loser_casualty_factor(),
            winner_morale_gain: default_winner_morale_gain(),
            loser_morale_loss: default_loser_morale_loss(),
            min_attack_morale: default_min_attack_morale(),
            attack_cooldown_secs: default_attack_cooldown_secs(),
        }
    }
}

/// Quest/research tracker configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TasksConfig {
    /// Maximum simultaneously active tasks per owner.
    #[serde(default = "default_max_active_per_owner")]
    pub max_active_per_owner: usize,
}

impl TasksConfig {
    /// The tracker tuning derived from this section.
    pub const fn tuning(&self) -> TaskTuning {
        TaskTuning {
            max_active_per_owner: self.max_active_per_owner,
        }
    }
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            max_active_per_owner: default_max_active_per_owner(),
        }
    }
}

/// World event and weather configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorldConfig {
    /// Probability of spawning one event per world tick.
    #[serde(default = "default_event_probability")]
    pub event_probability: f64,

    /// Shortest event lifetime, in hours.
    #[serde(default = "default_min_event_duration_hours")]
    pub min_event_duration_hours: i64,

    /// Longest event lifetime, in hours.
    #[serde(default = "default_max_event_duration_hours")]
    pub max_event_duration_hours: i64,

    /// Per-province chance to change weather per world tick.
    #[serde(default = "default_weather_change_chance")]
    pub weather_change_chance: f64,

    /// Maximum retained historical events.
    #[serde(default = "default_event_history_cap")]
    pub event_history_cap: usize,

    /// How many provinces an event touches at most.
    #[serde(default = "default_affected_provinces")]
    pub affected_provinces: usize,
}

impl WorldConfig {
    /// The world tuning derived from this section.
    pub const fn tuning(&self) -> WorldTuning {
        WorldTuning {
            event_probability: self.event_probability,
            min_duration_hours: self.min_event_duration_hours,
            max_duration_hours: self.max_event_duration_hours,
            weather_change_chance: self.weather_change_chance,
            history_cap: self.event_history_cap,
            affected_provinces: self.affected_provinces,
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            event_probability: default_event_probability(),
            min_event_duration_hours: default_min_event_duration_hours(),
            max_event_duration_hours: default_max_event_duration_hours(),
            weather_change_chance: default_weather_change_chance(),
            event_history_cap: default_event_history_cap(),
            affected_provinces: default_affected_provinces(),
        }
    }
}

/// Scheduler job intervals, in seconds.
///
/// Jobs are independent; each runs on its own interval and a failure in
/// one never blocks the others.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobsConfig {
    /// Market price tick interval.
    #[serde(default = "default_market_tick_secs")]
    pub market_tick_secs: u64,

    /// World event/weather tick interval.
    #[serde(default = "default_world_tick_secs")]
    pub world_tick_secs: u64,

    /// Quest expiration sweep interval.
    #[serde(default = "default_expiration_sweep_secs")]
    pub expiration_sweep_secs: u64,

    /// Automatic research progress interval.
    #[serde(default = "default_research_progress_secs")]
    pub research_progress_secs: u64,

    /// Income/upkeep settlement interval.
    #[serde(default = "default_settlement_secs")]
    pub settlement_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            market_tick_secs: default_market_tick_secs(),
            world_tick_secs: default_world_tick_secs(),
            expiration_sweep_secs: default_expiration_sweep_secs(),
            research_progress_secs: default_research_progress_secs(),
            settlement_secs: default_settlement_secs(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_engine_name() -> String {
    "Dominion".to_owned()
}

const fn default_seed() -> u64 {
    42
}

fn default_snapshot_path() -> String {
    "dominion-state.json".to_owned()
}

const fn default_starting_gold() -> f64 {
    1_000.0
}

const fn default_starting_morale() -> f64 {
    100.0
}

const fn default_storage_capacity() -> f64 {
    1_000.0
}

const fn default_transaction_log_cap() -> usize {
    1_000
}

const fn default_base_income() -> f64 {
    100.0
}

const fn default_tax_rate() -> f64 {
    0.1
}

const fn default_morale_decay() -> f64 {
    1.0
}

const fn default_unpaid_upkeep_morale_loss() -> f64 {
    10.0
}

const fn default_base_casualty_rate() -> f64 {
    0.1
}

const fn default_winner_casualty_factor() -> f64 {
    0.5
}

const fn default_loser_casualty_factor() -> f64 {
    1.5
}

const fn default_winner_morale_gain() -> f64 {
    5.0
}

const fn default_loser_morale_loss() -> f64 {
    10.0
}

const fn default_min_attack_morale() -> f64 {
    20.0
}

const fn default_attack_cooldown_secs() -> u64 {
    300
}

const fn default_max_active_per_owner() -> usize {
    3
}

const fn default_event_probability() -> f64 {
    0.1
}

const fn default_min_event_duration_hours() -> i64 {
    1
}

const fn default_max_event_duration_hours() -> i64 {
    24
}

const fn default_weather_change_chance() -> f64 {
    0.05
}

const fn default_event_history_cap() -> usize {
    100
}

const fn default_affected_provinces() -> usize {
    3
}

const fn default_market_tick_secs() -> u64 {
    1_800
}

const fn default_world_tick_secs() -> u64 {
    3_600
}

const fn default_expiration_sweep_secs() -> u64 {
    3_600
}

const fn default_research_progress_secs() -> u64 {
    3_600
}

const fn default_settlement_secs() -> u64 {
    3_600
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_standard_tuning() {
        let config = GameConfig::default();
        assert_eq!(config.engine.seed, 42);
        assert!((config.economy.starting_gold - 1_000.0).abs() < f64::EPSILON);
        assert!((config.combat.base_casualty_rate - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.tasks.max_active_per_owner, 3);
        assert!((config.world.event_probability - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.jobs.market_tick_secs, 1_800);
        assert_eq!(config.jobs.world_tick_secs, 3_600);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
engine:
  name: "Test Dominion"
  seed: 7
  snapshot_path: "state/test.json"

economy:
  starting_gold: 500.0
  starting_morale: 80.0
  storage_capacity: 2000.0
  transaction_log_cap: 100
  base_income: 50.0
  tax_rate: 0.2
  morale_decay: 0.5
  unpaid_upkeep_morale_loss: 15.0

combat:
  base_casualty_rate: 0.2
  winner_casualty_factor: 0.4
  loser_casualty_factor: 1.6
  winner_morale_gain: 4.0
  loser_morale_loss: 12.0
  min_attack_morale: 30.0
  attack_cooldown_secs: 600

tasks:
  max_active_per_owner: 5

world:
  event_probability: 0.25
  min_event_duration_hours: 2
  max_event_duration_hours: 12
  weather_change_chance: 0.1
  event_history_cap: 50
  affected_provinces: 2

jobs:
  market_tick_secs: 60
  world_tick_secs: 120
  expiration_sweep_secs: 120
  research_progress_secs: 120
  settlement_secs: 120

logging:
  level: "debug"
"#;

        let config = GameConfig::parse(yaml).unwrap();
        assert_eq!(config.engine.name, "Test Dominion");
        assert_eq!(config.engine.seed, 7);
        assert!((config.economy.tax_rate - 0.2).abs() < f64::EPSILON);
        assert!((config.combat.min_attack_morale - 30.0).abs() < f64::EPSILON);
        assert_eq!(config.tasks.max_active_per_owner, 5);
        assert_eq!(config.world.affected_provinces, 2);
        assert_eq!(config.jobs.market_tick_secs, 60);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn parse_minimal_yaml_fills_defaults() {
        let config = GameConfig::parse("engine:\n  seed: 9\n").unwrap();
        assert_eq!(config.engine.seed, 9);
        assert_eq!(config.engine.name, "Dominion");
        assert_eq!(config.jobs.settlement_secs, 3_600);
    }

    #[test]
    fn parse_empty_yaml() {
        assert!(GameConfig::parse("").is_ok());
    }

    #[test]
    fn zero_storage_capacity_means_unlimited() {
        let config = GameConfig::parse("economy:\n  storage_capacity: 0.0\n").unwrap();
        assert_eq!(config.economy.ledger().default_capacity, None);

        let config = GameConfig::default();
        assert_eq!(config.economy.ledger().default_capacity, Some(1_000.0));
    }

    #[test]
    fn tuning_conversions_carry_every_field() {
        let config = GameConfig::default();

        let combat = config.combat.tuning();
        assert!((combat.winner_casualty_factor - 0.5).abs() < f64::EPSILON);
        assert!((combat.loser_casualty_factor - 1.5).abs() < f64::EPSILON);

        let world = config.world.tuning();
        assert!((world.event_probability - 0.1).abs() < f64::EPSILON);
        assert_eq!(world.max_duration_hours, 24);

        assert_eq!(config.tasks.tuning().max_active_per_owner, 3);
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("dominion-config.yaml");
        if path.exists() {
            let config = GameConfig::from_file(&path);
            assert!(config.is_ok(), "failed to load project config: {config:?}");
        }
    }
}
