//! The military unit roster.
//!
//! A representative cross-section of the full asset database: every class
//! is present at tiers 1 and 2, with a handful of tier-3 pieces. Tier-2+
//! units are gated behind research definitions from the technology tree.

use dominion_types::{UnitClass, UnitSpec};

/// Shorthand constructor to keep the roster table readable.
#[allow(clippy::too_many_arguments)]
fn unit(
    id: &str,
    name: &str,
    class: UnitClass,
    tier: u8,
    cost: f64,
    upkeep: f64,
    attack: u32,
    defense: u32,
    speed: u32,
    requires: &[&str],
) -> UnitSpec {
    UnitSpec {
        id: id.to_owned(),
        name: name.to_owned(),
        class,
        tier,
        cost,
        upkeep,
        attack,
        defense,
        speed,
        requires: requires.iter().map(|r| (*r).to_owned()).collect(),
    }
}

/// Build the full unit roster.
pub(crate) fn roster() -> Vec<UnitSpec> {
    use UnitClass::{Aircraft, Armor, Defense, Infantry, Missile, Naval};

    vec![
        // --- Infantry ---
        unit("rifleman", "Rifleman", Infantry, 1, 50.0, 5.0, 3, 2, 1, &[]),
        unit("grenadier", "Grenadier", Infantry, 1, 75.0, 7.0, 4, 2, 1, &[]),
        unit("machine_gunner", "Machine Gunner", Infantry, 1, 100.0, 10.0, 5, 3, 1, &[]),
        unit("sniper", "Sniper", Infantry, 1, 120.0, 12.0, 6, 1, 1, &[]),
        unit("medic", "Medic", Infantry, 1, 80.0, 8.0, 2, 2, 1, &[]),
        unit(
            "special_forces",
            "Special Forces",
            Infantry,
            2,
            200.0, 20.0, 8, 6, 2,
            &["basic_training"],
        ),
        unit("marine", "Marine", Infantry, 2, 180.0, 18.0, 7, 5, 2, &["basic_training"]),
        unit(
            "paratrooper",
            "Paratrooper",
            Infantry,
            2,
            160.0, 16.0, 6, 4, 2,
            &["basic_training"],
        ),
        // --- Armor ---
        unit("scout_car", "Scout Car", Armor, 1, 200.0, 20.0, 4, 3, 3, &[]),
        unit("apc", "APC", Armor, 1, 400.0, 40.0, 5, 7, 2, &[]),
        unit("light_tank", "Light Tank", Armor, 1, 500.0, 50.0, 8, 6, 2, &[]),
        unit(
            "main_battle_tank",
            "Main Battle Tank",
            Armor,
            2,
            1000.0, 100.0, 15, 12, 2,
            &["armored_warfare"],
        ),
        unit(
            "heavy_tank",
            "Heavy Tank",
            Armor,
            2,
            1200.0, 120.0, 18, 15, 1,
            &["armored_warfare"],
        ),
        // --- Aircraft ---
        unit("recon_plane", "Recon Plane", Aircraft, 1, 300.0, 30.0, 3, 5, 7, &[]),
        unit(
            "fighter_jet",
            "Fighter Jet",
            Aircraft,
            2,
            800.0, 80.0, 20, 8, 8,
            &["air_superiority"],
        ),
        unit(
            "interceptor",
            "Interceptor",
            Aircraft,
            2,
            700.0, 70.0, 18, 6, 9,
            &["air_superiority"],
        ),
        unit(
            "bomber",
            "Bomber",
            Aircraft,
            2,
            1000.0, 100.0, 15, 12, 4,
            &["air_superiority"],
        ),
        unit(
            "attack_helicopter",
            "Attack Helicopter",
            Aircraft,
            2,
            600.0, 60.0, 12, 8, 4,
            &["air_superiority"],
        ),
        // --- Naval ---
        unit("patrol_boat", "Patrol Boat", Naval, 1, 300.0, 30.0, 6, 4, 4, &[]),
        unit("gunboat", "Gunboat", Naval, 1, 400.0, 40.0, 8, 6, 3, &[]),
        unit("frigate", "Frigate", Naval, 2, 800.0, 80.0, 15, 12, 3, &["basic_training"]),
        unit(
            "destroyer",
            "Destroyer",
            Naval,
            2,
            1500.0, 150.0, 25, 18, 2,
            &["basic_training"],
        ),
        unit(
            "attack_submarine",
            "Attack Submarine",
            Naval,
            2,
            1000.0, 100.0, 20, 15, 3,
            &["basic_training"],
        ),
        // --- Missiles ---
        unit("rocket", "Rocket", Missile, 1, 50.0, 5.0, 8, 1, 4, &[]),
        unit("guided_missile", "Guided Missile", Missile, 1, 100.0, 10.0, 12, 2, 5, &[]),
        unit(
            "cruise_missile",
            "Cruise Missile",
            Missile,
            2,
            300.0, 30.0, 25, 3, 6,
            &["basic_training"],
        ),
        unit(
            "ballistic_missile",
            "Ballistic Missile",
            Missile,
            3,
            800.0, 80.0, 40, 5, 8,
            &["nuclear_weapons"],
        ),
        // --- Defense ---
        unit("bunker", "Bunker", Defense, 1, 200.0, 20.0, 5, 15, 0, &[]),
        unit("aa_gun", "AA Gun", Defense, 1, 300.0, 30.0, 12, 8, 0, &[]),
        unit(
            "artillery_emplacement",
            "Artillery Emplacement",
            Defense,
            2,
            600.0, 60.0, 25, 12, 0,
            &["basic_training"],
        ),
        unit(
            "sam_site",
            "SAM Site",
            Defense,
            2,
            500.0, 50.0, 20, 10, 0,
            &["basic_training"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_ids_are_unique() {
        let roster = roster();
        let mut ids: Vec<&str> = roster.iter().map(|u| u.id.as_str()).collect();
        ids.sort_unstable();
        let before = ids.len();
        ids.dedup();
        assert_eq!(ids.len(), before);
    }

    #[test]
    fn every_class_is_represented() {
        let roster = roster();
        for class in [
            UnitClass::Infantry,
            UnitClass::Armor,
            UnitClass::Aircraft,
            UnitClass::Naval,
            UnitClass::Missile,
            UnitClass::Defense,
        ] {
            assert!(
                roster.iter().any(|u| u.class == class),
                "no unit of class {class:?}"
            );
        }
    }

    #[test]
    fn tier_one_units_need_no_research() {
        for spec in roster() {
            if spec.tier == 1 {
                assert!(spec.requires.is_empty(), "{} should be unlocked", spec.id);
            } else {
                assert!(!spec.requires.is_empty(), "{} should be gated", spec.id);
            }
        }
    }
}
