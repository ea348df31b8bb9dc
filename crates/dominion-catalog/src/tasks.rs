//! Quest definitions and the technology tree.
//!
//! Quests are fixed instances sampled from the classic archetype templates
//! (recon, sabotage, escort, invasion); research entries form a three-branch
//! technology tree where tier N+1 requires completed tier-N research and
//! acceptance charges the owner's knowledge balance.

use std::collections::BTreeMap;

use dominion_types::{Reward, TaskDefinition, TaskKind, TechEffect, ResourceKind, UnitClass};

/// One hour, in seconds.
const HOUR: u64 = 3_600;

/// Build a quest definition.
#[allow(clippy::too_many_arguments)]
fn quest(
    id: &str,
    kind: TaskKind,
    title: &str,
    description: &str,
    difficulty: u8,
    duration_secs: u64,
    required_units: &[(&str, u32)],
    rewards: Vec<Reward>,
) -> TaskDefinition {
    TaskDefinition {
        id: id.to_owned(),
        kind,
        title: title.to_owned(),
        description: description.to_owned(),
        difficulty,
        duration_secs,
        acceptance_cost: BTreeMap::new(),
        required_units: required_units
            .iter()
            .map(|(unit, count)| ((*unit).to_owned(), *count))
            .collect(),
        prerequisites: Vec::new(),
        rewards,
        effects: Vec::new(),
    }
}

/// Build a research definition. Acceptance charges knowledge; completion
/// applies the listed effects.
fn research(
    id: &str,
    title: &str,
    description: &str,
    tier: u8,
    knowledge_cost: f64,
    prerequisites: &[&str],
    effects: Vec<TechEffect>,
) -> TaskDefinition {
    let mut acceptance_cost = BTreeMap::new();
    acceptance_cost.insert(ResourceKind::Knowledge, knowledge_cost);

    // Research duration scales with tier: 3h, 6h, 12h.
    let duration_secs = match tier {
        1 => 3 * HOUR,
        2 => 6 * HOUR,
        _ => 12 * HOUR,
    };

    TaskDefinition {
        id: id.to_owned(),
        kind: TaskKind::Research,
        title: title.to_owned(),
        description: description.to_owned(),
        difficulty: tier,
        duration_secs,
        acceptance_cost,
        required_units: BTreeMap::new(),
        prerequisites: prerequisites.iter().map(|p| (*p).to_owned()).collect(),
        rewards: Vec::new(),
        effects,
    }
}

/// Build all task definitions: quests first, then the technology tree.
#[allow(clippy::too_many_lines)]
pub(crate) fn definitions() -> Vec<TaskDefinition> {
    let mut defs = vec![
        // --- Recon ---
        quest(
            "recon_patrol",
            TaskKind::Recon,
            "Scout Enemy Territory",
            "Scout the enemy territory and gather intelligence about their forces.",
            1,
            HOUR,
            &[],
            vec![Reward::Gold(200.0)],
        ),
        quest(
            "deep_recon",
            TaskKind::Recon,
            "Gather Intelligence",
            "Infiltrate enemy lines and report back with tactical information.",
            2,
            2 * HOUR,
            &[],
            vec![Reward::Gold(400.0), Reward::Resource {
                kind: ResourceKind::Knowledge,
                amount: 10.0,
            }],
        ),
        // --- Sabotage ---
        quest(
            "comms_blackout",
            TaskKind::Sabotage,
            "Disrupt Enemy Communications",
            "Disrupt enemy communications to create confusion.",
            2,
            HOUR,
            &[],
            vec![Reward::Gold(1_000.0)],
        ),
        quest(
            "supply_sabotage",
            TaskKind::Sabotage,
            "Sabotage Enemy Supply Lines",
            "Infiltrate enemy territory and sabotage their supply lines.",
            3,
            2 * HOUR,
            &[("rifleman", 10)],
            vec![Reward::Gold(1_500.0), Reward::Resource {
                kind: ResourceKind::Iron,
                amount: 60.0,
            }],
        ),
        // --- Escort ---
        quest(
            "convoy_escort",
            TaskKind::Escort,
            "Escort Supply Convoy",
            "Escort a valuable supply convoy through dangerous territory.",
            1,
            2 * HOUR,
            &[],
            vec![Reward::Gold(300.0)],
        ),
        quest(
            "vip_escort",
            TaskKind::Escort,
            "Protect VIP Transport",
            "Protect a VIP during their journey to a secure location.",
            2,
            3 * HOUR,
            &[("rifleman", 5)],
            vec![Reward::Gold(600.0), Reward::Morale(2.0)],
        ),
        // --- Invasion ---
        quest(
            "strategic_capture",
            TaskKind::Invasion,
            "Capture Strategic Location",
            "Capture a strategic location to gain tactical advantage.",
            3,
            2 * HOUR,
            &[("rifleman", 5)],
            vec![Reward::Gold(3_000.0), Reward::Resource {
                kind: ResourceKind::Oil,
                amount: 90.0,
            }],
        ),
        quest(
            "province_invasion",
            TaskKind::Invasion,
            "Invade Enemy Province",
            "Lead an invasion force to capture enemy territory.",
            4,
            4 * HOUR,
            &[("rifleman", 10), ("main_battle_tank", 4)],
            vec![
                Reward::Gold(4_000.0),
                Reward::Resource {
                    kind: ResourceKind::Ammunition,
                    amount: 120.0,
                },
                Reward::Morale(5.0),
            ],
        ),
    ];

    // --- Technology tree: military branch ---
    defs.push(research(
        "basic_training",
        "Basic Training",
        "Improves infantry combat effectiveness by 20%",
        1,
        100.0,
        &[],
        vec![TechEffect::UnitClassBonus {
            class: UnitClass::Infantry,
            bonus: 0.2,
        }],
    ));
    defs.push(research(
        "tactical_warfare",
        "Tactical Warfare",
        "Unlocks advanced combat strategies",
        1,
        150.0,
        &[],
        vec![TechEffect::CombatBonus(0.15)],
    ));
    defs.push(research(
        "armored_warfare",
        "Armored Warfare",
        "Improves tank effectiveness by 25%",
        2,
        300.0,
        &["basic_training"],
        vec![TechEffect::UnitClassBonus {
            class: UnitClass::Armor,
            bonus: 0.25,
        }],
    ));
    defs.push(research(
        "air_superiority",
        "Air Superiority",
        "Improves aircraft effectiveness by 30%",
        2,
        400.0,
        &["tactical_warfare"],
        vec![TechEffect::UnitClassBonus {
            class: UnitClass::Aircraft,
            bonus: 0.3,
        }],
    ));
    defs.push(research(
        "nuclear_weapons",
        "Nuclear Weapons",
        "Unlocks strategic weapons and devastating attacks",
        3,
        1_000.0,
        &["armored_warfare", "air_superiority"],
        vec![TechEffect::CombatBonus(0.5)],
    ));

    // --- Technology tree: economic branch ---
    defs.push(research(
        "steel_production",
        "Steel Production",
        "Increases iron and materials production by 30%",
        1,
        120.0,
        &[],
        vec![
            TechEffect::ProductionBonus {
                kind: ResourceKind::Iron,
                bonus: 0.3,
            },
            TechEffect::ProductionBonus {
                kind: ResourceKind::Materials,
                bonus: 0.3,
            },
        ],
    ));
    defs.push(research(
        "agricultural_revolution",
        "Agricultural Revolution",
        "Increases food production by 40%",
        1,
        100.0,
        &[],
        vec![TechEffect::ProductionBonus {
            kind: ResourceKind::Food,
            bonus: 0.4,
        }],
    ));
    defs.push(research(
        "industrial_revolution",
        "Industrial Revolution",
        "Massive production boost for all materials",
        2,
        500.0,
        &["steel_production"],
        vec![TechEffect::AllProduction(0.5)],
    ));
    defs.push(research(
        "oil_refining",
        "Oil Refining",
        "Improves oil processing and efficiency",
        2,
        300.0,
        &["agricultural_revolution"],
        vec![
            TechEffect::ProductionBonus {
                kind: ResourceKind::Oil,
                bonus: 0.4,
            },
            TechEffect::ProductionBonus {
                kind: ResourceKind::Fuel,
                bonus: 0.2,
            },
        ],
    ));
    defs.push(research(
        "advanced_manufacturing",
        "Advanced Manufacturing",
        "Revolutionary production methods",
        3,
        800.0,
        &["industrial_revolution", "oil_refining"],
        vec![TechEffect::AllProduction(0.8)],
    ));

    // --- Technology tree: research branch ---
    defs.push(research(
        "scientific_method",
        "Scientific Method",
        "Increases research speed by 25%",
        1,
        150.0,
        &[],
        vec![TechEffect::ResearchSpeed(0.25)],
    ));
    defs.push(research(
        "laboratory_equipment",
        "Laboratory Equipment",
        "Improves research efficiency",
        1,
        200.0,
        &[],
        vec![TechEffect::ResearchSpeed(0.3)],
    ));
    defs.push(research(
        "advanced_research",
        "Advanced Research",
        "Unlocks higher tier technologies",
        2,
        400.0,
        &["scientific_method"],
        Vec::new(),
    ));
    defs.push(research(
        "computer_technology",
        "Computer Technology",
        "Revolutionary computing power for research",
        2,
        600.0,
        &["laboratory_equipment"],
        vec![TechEffect::ResearchSpeed(0.5)],
    ));
    defs.push(research(
        "artificial_intelligence",
        "Artificial Intelligence",
        "AI-powered research and development",
        3,
        1_200.0,
        &["advanced_research", "computer_technology"],
        vec![TechEffect::ResearchSpeed(1.0)],
    ));

    defs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quests_and_research_both_present() {
        let defs = definitions();
        assert!(defs.iter().any(|d| d.kind == TaskKind::Recon));
        assert!(defs.iter().any(|d| d.kind == TaskKind::Invasion));
        assert_eq!(
            defs.iter().filter(|d| d.kind == TaskKind::Research).count(),
            15
        );
    }

    #[test]
    fn research_charges_knowledge() {
        for def in definitions() {
            if def.kind == TaskKind::Research {
                assert!(
                    def.acceptance_cost.contains_key(&ResourceKind::Knowledge),
                    "{} has no knowledge cost",
                    def.id
                );
            }
        }
    }

    #[test]
    fn tier_three_research_has_two_prerequisites() {
        let defs = definitions();
        let nuclear = defs.iter().find(|d| d.id == "nuclear_weapons");
        assert!(nuclear.is_some());
        if let Some(nuclear) = nuclear {
            assert_eq!(nuclear.prerequisites.len(), 2);
            assert_eq!(nuclear.duration_secs, 12 * HOUR);
        }
    }
}
