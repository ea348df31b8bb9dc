//! Event templates: the category tables events are drawn from.
//!
//! Each category carries a fixed set of title/description pairs and a
//! characteristic effect profile. Economic events push prices either way;
//! military events raise military-resource prices and cost morale; natural
//! disasters create scarcity; political events mostly move morale.

use rand::Rng;

use dominion_types::{EventCategory, EventSeverity, ResourceKind};

/// A drawn-but-not-yet-scheduled event: everything except id, affected
/// provinces, and timing.
#[derive(Debug, Clone)]
pub struct EventTemplate {
    /// Event category.
    pub category: EventCategory,
    /// Display title.
    pub title: String,
    /// Display description.
    pub description: String,
    /// Resources whose prices the event biases.
    pub affected_resources: Vec<ResourceKind>,
    /// Signed per-tick price impact before intensity scaling.
    pub impact: f64,
    /// Intensity multiplier, 0.0 to 1.0.
    pub intensity: f64,
    /// Morale added per morale pass.
    pub morale_bonus: f64,
    /// Morale removed per morale pass.
    pub morale_penalty: f64,
}

/// Title/description pairs per category.
const ECONOMIC: [(&str, &str); 6] = [
    ("Economic Boom", "A period of economic prosperity increases production across the world."),
    ("Market Crash", "A sudden market crash affects global trade and prices."),
    ("Trade Embargo", "A major trade embargo disrupts international commerce."),
    ("Resource Discovery", "New resource deposits have been discovered, boosting production."),
    ("Inflation Crisis", "Rapid inflation affects the global economy."),
    ("Economic Sanctions", "Economic sanctions are imposed, affecting trade relations."),
];

const MILITARY: [(&str, &str); 6] = [
    ("Arms Race", "An arms race begins, increasing military production."),
    ("Peace Treaty", "A major peace treaty is signed, reducing tensions."),
    ("Military Coup", "A military coup destabilizes a region."),
    ("Weapons Development", "Breakthrough in weapons technology is achieved."),
    ("Defense Pact", "A new defense pact is formed between nations."),
    ("War Declaration", "War is declared between major powers."),
];

const NATURAL: [(&str, &str); 6] = [
    ("Hurricane", "A powerful hurricane devastates coastal regions."),
    ("Drought", "Severe drought affects agricultural production."),
    ("Earthquake", "A major earthquake causes widespread damage."),
    ("Flood", "Flooding disrupts transportation and production."),
    ("Volcanic Eruption", "A volcanic eruption affects global climate."),
    ("Pandemic", "A pandemic spreads across the world."),
];

const POLITICAL: [(&str, &str); 6] = [
    ("Election", "A major election changes the political landscape."),
    ("Revolution", "A revolution overthrows the government."),
    ("Alliance Formation", "A new alliance is formed between nations."),
    ("Diplomatic Crisis", "A diplomatic crisis threatens international relations."),
    ("Government Change", "A change in government affects policies."),
    ("International Summit", "An international summit addresses global issues."),
];

/// Resource pools each category draws its affected set from.
const ECONOMIC_POOL: [ResourceKind; 6] = [
    ResourceKind::Gold,
    ResourceKind::Oil,
    ResourceKind::Iron,
    ResourceKind::Energy,
    ResourceKind::Materials,
    ResourceKind::Technology,
];

const MILITARY_POOL: [ResourceKind; 4] = [
    ResourceKind::Fuel,
    ResourceKind::Ammunition,
    ResourceKind::Manpower,
    ResourceKind::MedicalSupplies,
];

const NATURAL_POOL: [ResourceKind; 4] = [
    ResourceKind::Food,
    ResourceKind::Water,
    ResourceKind::Oil,
    ResourceKind::Materials,
];

const POLITICAL_POOL: [ResourceKind; 3] = [
    ResourceKind::Influence,
    ResourceKind::Gold,
    ResourceKind::Knowledge,
];

/// Draw a random event template.
pub(crate) fn draw<R: Rng>(rng: &mut R) -> EventTemplate {
    let category = match rng.random_range(0..4) {
        0 => EventCategory::Economic,
        1 => EventCategory::Military,
        2 => EventCategory::Natural,
        _ => EventCategory::Political,
    };

    let (pairs, pool): (&[(&str, &str)], &[ResourceKind]) = match category {
        EventCategory::Economic => (&ECONOMIC, &ECONOMIC_POOL),
        EventCategory::Military => (&MILITARY, &MILITARY_POOL),
        EventCategory::Natural => (&NATURAL, &NATURAL_POOL),
        EventCategory::Political => (&POLITICAL, &POLITICAL_POOL),
    };

    let idx = rng.random_range(0..pairs.len());
    let (title, description) = pairs.get(idx).copied().unwrap_or(("Unrest", "Unrest spreads."));

    // Effect profile per category, ranges lifted from the original tables.
    let (impact, morale_bonus, morale_penalty) = match category {
        EventCategory::Economic => (rng.random_range(-0.2..=0.2), 0.0, 0.0),
        EventCategory::Military => (
            rng.random_range(0.0..=0.2),
            0.0,
            rng.random_range(0.0..=0.3),
        ),
        EventCategory::Natural => (
            rng.random_range(0.1..=0.5),
            0.0,
            rng.random_range(0.0..=0.2),
        ),
        EventCategory::Political => (
            rng.random_range(-0.1..=0.1),
            rng.random_range(0.0..=0.3),
            0.0,
        ),
    };

    EventTemplate {
        category,
        title: title.to_owned(),
        description: description.to_owned(),
        affected_resources: sample_resources(pool, rng),
        impact,
        intensity: rng.random_range(0.2..=1.0),
        morale_bonus,
        morale_penalty,
    }
}

/// Draw a severity band.
pub(crate) fn draw_severity<R: Rng>(rng: &mut R) -> EventSeverity {
    match rng.random_range(0..4) {
        0 => EventSeverity::Low,
        1 => EventSeverity::Medium,
        2 => EventSeverity::High,
        _ => EventSeverity::Critical,
    }
}

/// Pick one to three distinct resources from a pool.
fn sample_resources<R: Rng>(pool: &[ResourceKind], rng: &mut R) -> Vec<ResourceKind> {
    let want = rng.random_range(1..=3usize).min(pool.len());
    let mut picked = Vec::with_capacity(want);
    // Pools are tiny; rejection sampling stays cheap.
    while picked.len() < want {
        let idx = rng.random_range(0..pool.len());
        if let Some(kind) = pool.get(idx) {
            if !picked.contains(kind) {
                picked.push(*kind);
            }
        }
    }
    picked
}
