//! World state for the Dominion game engine.
//!
//! Two concerns live here, both owned exclusively by this crate:
//!
//! - **Provinces** -- the static map with mutable weather. Each world tick
//!   every province has a small chance to change weather, which feeds the
//!   combat weather modifier and keeps battles over the same ground from
//!   playing identically.
//! - **World events** -- randomized economic/military/natural/political
//!   happenings with a bounded lifetime. Active events bias market prices
//!   (read by the market engine) and nudge every player's morale (read by
//!   the scheduler's morale pass). Expired events stay queryable as
//!   history but never re-enter any effect computation.

mod provinces;
mod tables;

use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::{debug, info};

use dominion_types::{Province, ProvinceId, Weather, WorldEvent, WorldEventId};

pub use tables::EventTemplate;

// ---------------------------------------------------------------------------
// Tuning
// ---------------------------------------------------------------------------

/// Tuning parameters for world simulation.
#[derive(Debug, Clone)]
pub struct WorldTuning {
    /// Probability of spawning one event per world tick.
    pub event_probability: f64,
    /// Shortest event lifetime, in hours.
    pub min_duration_hours: i64,
    /// Longest event lifetime, in hours.
    pub max_duration_hours: i64,
    /// Per-province chance to change weather per world tick.
    pub weather_change_chance: f64,
    /// Maximum number of retained historical events.
    pub history_cap: usize,
    /// How many provinces an event touches at most.
    pub affected_provinces: usize,
}

impl Default for WorldTuning {
    fn default() -> Self {
        Self {
            event_probability: 0.1,
            min_duration_hours: 1,
            max_duration_hours: 24,
            weather_change_chance: 0.05,
            history_cap: 100,
            affected_provinces: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// The world map and event board.
#[derive(Debug)]
pub struct World {
    /// Tuning parameters.
    tuning: WorldTuning,
    /// All provinces, keyed by id.
    provinces: RwLock<Vec<Province>>,
    /// Event history, oldest first, bounded by `tuning.history_cap`.
    events: RwLock<VecDeque<WorldEvent>>,
}

impl World {
    /// Create the world with the standard province map and no events.
    pub fn new(tuning: WorldTuning) -> Self {
        Self {
            tuning,
            provinces: RwLock::new(provinces::standard_map()),
            events: RwLock::new(VecDeque::new()),
        }
    }

    /// Run one world tick: drift weather, then maybe spawn an event.
    ///
    /// Returns the newly created event, if the dice produced one.
    pub fn tick<R: Rng>(&self, now: DateTime<Utc>, rng: &mut R) -> Option<WorldEvent> {
        self.drift_weather(rng);

        if rng.random_range(0.0..1.0) >= self.tuning.event_probability {
            return None;
        }
        let event = self.generate_event(now, rng);
        self.store(event.clone());
        info!(
            event = %event.title,
            category = ?event.category,
            severity = ?event.severity,
            expires_at = %event.expires_at,
            "World event created"
        );
        Some(event)
    }

    /// Inject a pre-built event (admin entry point).
    ///
    /// Reuses the same storage path as generated events.
    pub fn inject(&self, event: WorldEvent) {
        info!(event = %event.title, "World event injected");
        self.store(event);
    }

    /// Events that still affect prices and morale at `now`.
    pub fn active_events(&self, now: DateTime<Utc>) -> Vec<WorldEvent> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|event| event.is_active(now))
            .cloned()
            .collect()
    }

    /// The most recent events, active or not, newest last.
    pub fn event_history(&self, limit: usize) -> Vec<WorldEvent> {
        let events = self.events.read().unwrap_or_else(PoisonError::into_inner);
        let start = events.len().saturating_sub(limit);
        events.iter().skip(start).cloned().collect()
    }

    /// Net morale shift per morale pass from all active events.
    ///
    /// Bonuses and penalties are scaled by ten, as a fraction-to-morale
    /// conversion: a 0.3 bonus moves morale by +3 per pass.
    pub fn morale_impact(&self, now: DateTime<Utc>) -> f64 {
        self.active_events(now)
            .iter()
            .map(|event| (event.morale_bonus - event.morale_penalty) * 10.0)
            .sum()
    }

    /// Snapshot of every province.
    pub fn provinces(&self) -> Vec<Province> {
        self.provinces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Look up one province.
    pub fn province(&self, id: ProvinceId) -> Option<Province> {
        self.provinces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    /// Pick a uniformly random province.
    pub fn random_province<R: Rng>(&self, rng: &mut R) -> Option<Province> {
        let provinces = self.provinces.read().unwrap_or_else(PoisonError::into_inner);
        if provinces.is_empty() {
            return None;
        }
        let idx = rng.random_range(0..provinces.len());
        provinces.get(idx).cloned()
    }

    /// Clone world state for persistence.
    pub fn export(&self) -> (Vec<Province>, Vec<WorldEvent>) {
        let provinces = self.provinces();
        let events = self
            .events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        (provinces, events)
    }

    /// Restore previously exported world state.
    pub fn import(&self, provinces: Vec<Province>, events: Vec<WorldEvent>) {
        *self.provinces.write().unwrap_or_else(PoisonError::into_inner) = provinces;
        *self.events.write().unwrap_or_else(PoisonError::into_inner) = events.into();
    }

    /// Append an event, evicting the oldest past the history cap.
    fn store(&self, event: WorldEvent) {
        let mut events = self.events.write().unwrap_or_else(PoisonError::into_inner);
        events.push_back(event);
        while events.len() > self.tuning.history_cap {
            events.pop_front();
        }
    }

    /// Give each province a chance to change weather.
    fn drift_weather<R: Rng>(&self, rng: &mut R) {
        let mut provinces = self
            .provinces
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for province in provinces.iter_mut() {
            if rng.random_range(0.0..1.0) >= self.tuning.weather_change_chance {
                continue;
            }
            let weather = random_weather(rng);
            province.weather = weather;
            province.temperature = temperature_for(weather, rng);
            debug!(
                province = %province.name,
                ?weather,
                temperature = province.temperature,
                "Weather changed"
            );
        }
    }

    /// Draw a fresh event from the category tables.
    fn generate_event<R: Rng>(&self, now: DateTime<Utc>, rng: &mut R) -> WorldEvent {
        let template = tables::draw(rng);

        let provinces = self.provinces.read().unwrap_or_else(PoisonError::into_inner);
        let mut affected_provinces = Vec::new();
        if !provinces.is_empty() {
            let count = self.tuning.affected_provinces.min(provinces.len());
            for _ in 0..count {
                let idx = rng.random_range(0..provinces.len());
                if let Some(p) = provinces.get(idx) {
                    if !affected_provinces.contains(&p.id) {
                        affected_provinces.push(p.id);
                    }
                }
            }
        }

        let duration_hours =
            rng.random_range(self.tuning.min_duration_hours..=self.tuning.max_duration_hours);

        WorldEvent {
            id: WorldEventId::new(),
            category: template.category,
            severity: tables::draw_severity(rng),
            title: template.title,
            description: template.description,
            affected_resources: template.affected_resources,
            affected_provinces,
            impact: template.impact,
            intensity: template.intensity,
            morale_bonus: template.morale_bonus,
            morale_penalty: template.morale_penalty,
            created_at: now,
            expires_at: now + Duration::hours(duration_hours),
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldTuning::default())
    }
}

/// Uniform draw over the weather variants.
fn random_weather<R: Rng>(rng: &mut R) -> Weather {
    match rng.random_range(0..6) {
        0 => Weather::Rain,
        1 => Weather::Storm,
        2 => Weather::Fog,
        3 => Weather::Snow,
        4 => Weather::Cloudy,
        _ => Weather::Clear,
    }
}

/// Plausible temperature for the new weather.
fn temperature_for<R: Rng>(weather: Weather, rng: &mut R) -> f64 {
    match weather {
        Weather::Snow => rng.random_range(-10.0..=5.0),
        Weather::Storm | Weather::Fog => rng.random_range(5.0..=15.0),
        Weather::Rain => rng.random_range(10.0..=20.0),
        Weather::Cloudy => rng.random_range(10.0..=25.0),
        Weather::Clear => rng.random_range(15.0..=30.0),
    }
}
