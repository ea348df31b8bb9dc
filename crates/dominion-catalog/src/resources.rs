//! The resource definition table.
//!
//! Fifteen tradable resources across five categories. The numbers anchor
//! the whole economy: base values seed prices, volatilities drive the
//! random walk, and the min/max bounds are hard invariants enforced by the
//! market engine on every update.

use dominion_types::{ResourceCategory, ResourceDef, ResourceKind};

/// Shorthand constructor to keep the table readable.
#[allow(clippy::too_many_arguments)]
fn def(
    kind: ResourceKind,
    name: &str,
    description: &str,
    base_value: f64,
    volatility: f64,
    rarity: f64,
    decay_rate: f64,
    storage_cost: f64,
    unit: &str,
    min_price: f64,
    max_price: f64,
) -> ResourceDef {
    ResourceDef {
        kind,
        category: kind.category(),
        name: name.to_owned(),
        description: description.to_owned(),
        base_value,
        volatility,
        rarity,
        decay_rate,
        storage_cost,
        unit: unit.to_owned(),
        min_price,
        max_price,
    }
}

/// Build all resource definitions in catalog order.
pub(crate) fn definitions() -> Vec<ResourceDef> {
    vec![
        // --- Basic ---
        def(
            ResourceKind::Gold,
            "Gold",
            "Universal currency and store of value",
            1.0, 0.1, 0.0, 0.0, 0.0, "coins", 0.8, 1.2,
        ),
        def(
            ResourceKind::Food,
            "Food",
            "Essential for population growth and military operations",
            0.5, 0.3, 0.1, 0.05, 0.01, "tons", 0.2, 1.0,
        ),
        def(
            ResourceKind::Water,
            "Water",
            "Critical for survival and industrial processes",
            0.3, 0.4, 0.2, 0.0, 0.005, "liters", 0.1, 0.8,
        ),
        // --- Industrial ---
        def(
            ResourceKind::Oil,
            "Oil",
            "Primary energy source for vehicles and industry",
            2.0, 0.5, 0.3, 0.0, 0.05, "barrels", 1.0, 4.0,
        ),
        def(
            ResourceKind::Iron,
            "Iron",
            "Essential for construction and weapons manufacturing",
            1.5, 0.2, 0.1, 0.01, 0.02, "tons", 1.0, 2.5,
        ),
        def(
            ResourceKind::Energy,
            "Energy",
            "Electrical power for all operations",
            1.2, 0.3, 0.2, 0.1, 0.03, "MWh", 0.5, 2.0,
        ),
        def(
            ResourceKind::Materials,
            "Materials",
            "General construction and manufacturing materials",
            0.8, 0.25, 0.05, 0.02, 0.01, "units", 0.4, 1.5,
        ),
        // --- Human ---
        def(
            ResourceKind::Population,
            "Population",
            "Citizens available for work and military service",
            10.0, 0.1, 0.0, 0.001, 0.1, "people", 5.0, 20.0,
        ),
        def(
            ResourceKind::Manpower,
            "Manpower",
            "Trained personnel available for military operations",
            15.0, 0.2, 0.2, 0.005, 0.15, "personnel", 8.0, 30.0,
        ),
        def(
            ResourceKind::Knowledge,
            "Knowledge",
            "Scientific and technical expertise",
            25.0, 0.15, 0.4, 0.0, 0.0, "points", 15.0, 50.0,
        ),
        // --- Military ---
        def(
            ResourceKind::Fuel,
            "Military Fuel",
            "High-grade fuel for military vehicles",
            3.0, 0.4, 0.3, 0.02, 0.08, "gallons", 1.5, 6.0,
        ),
        def(
            ResourceKind::Ammunition,
            "Ammunition",
            "Weapons and ammunition for military operations",
            5.0, 0.3, 0.4, 0.0, 0.1, "rounds", 2.5, 10.0,
        ),
        def(
            ResourceKind::MedicalSupplies,
            "Medical Supplies",
            "Medical equipment and supplies for the wounded",
            8.0, 0.2, 0.3, 0.01, 0.05, "units", 4.0, 15.0,
        ),
        // --- Advanced ---
        def(
            ResourceKind::Technology,
            "Technology",
            "Advanced technological capabilities",
            50.0, 0.1, 0.6, 0.0, 0.0, "points", 30.0, 100.0,
        ),
        def(
            ResourceKind::Influence,
            "Influence",
            "Political and diplomatic influence",
            20.0, 0.2, 0.5, 0.005, 0.0, "points", 10.0, 40.0,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifteen_definitions() {
        assert_eq!(definitions().len(), ResourceKind::ALL.len());
    }

    #[test]
    fn categories_match_kind_categories() {
        for def in definitions() {
            assert_eq!(def.category, def.kind.category(), "{:?}", def.kind);
        }
    }

    #[test]
    fn gold_is_the_unit_of_account() {
        let defs = definitions();
        let gold = defs.iter().find(|d| d.kind == ResourceKind::Gold);
        assert!(gold.is_some());
        if let Some(gold) = gold {
            assert!((gold.base_value - 1.0).abs() < f64::EPSILON);
            assert!(gold.decay_rate.abs() < f64::EPSILON);
        }
    }
}
