//! Immutable startup catalogs for the Dominion game engine.
//!
//! The catalog is loaded once at process start and shared read-only by every
//! component: the market engine reads [`ResourceDef`] bounds, the combat
//! resolver reads [`UnitSpec`] stats, and the task tracker reads
//! [`TaskDefinition`] entries (quests plus the technology tree). Nothing in
//! the catalog mutates at runtime.

mod resources;
mod tasks;
mod units;

use std::collections::BTreeMap;

use dominion_types::{ResourceDef, ResourceKind, TaskDefinition, TaskKind, UnitSpec};

/// Errors produced by catalog lookups.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// No unit with the given identifier exists.
    #[error("unknown unit type: {0}")]
    UnknownUnit(String),

    /// No task definition with the given identifier exists.
    #[error("unknown task definition: {0}")]
    UnknownTask(String),
}

/// The complete set of static game data, assembled once at startup.
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Resource definitions, one per [`ResourceKind`].
    resources: BTreeMap<ResourceKind, ResourceDef>,
    /// Unit specifications keyed by unit id.
    units: BTreeMap<String, UnitSpec>,
    /// Quest and research definitions keyed by definition id.
    tasks: BTreeMap<String, TaskDefinition>,
}

impl Catalog {
    /// Build the standard catalog shipped with the engine.
    pub fn standard() -> Self {
        let resources = resources::definitions()
            .into_iter()
            .map(|def| (def.kind, def))
            .collect();
        let units = units::roster()
            .into_iter()
            .map(|spec| (spec.id.clone(), spec))
            .collect();
        let tasks = tasks::definitions()
            .into_iter()
            .map(|def| (def.id.clone(), def))
            .collect();

        Self {
            resources,
            units,
            tasks,
        }
    }

    /// Look up the definition for a resource kind.
    pub fn resource(&self, kind: ResourceKind) -> Option<&ResourceDef> {
        self.resources.get(&kind)
    }

    /// Iterate all resource definitions in catalog order.
    pub fn resources(&self) -> impl Iterator<Item = &ResourceDef> {
        self.resources.values()
    }

    /// Look up a unit specification by id.
    pub fn unit(&self, id: &str) -> Option<&UnitSpec> {
        self.units.get(id)
    }

    /// Look up a unit specification by id, producing a typed error on miss.
    pub fn require_unit(&self, id: &str) -> Result<&UnitSpec, CatalogError> {
        self.units
            .get(id)
            .ok_or_else(|| CatalogError::UnknownUnit(id.to_owned()))
    }

    /// Iterate all unit specifications.
    pub fn units(&self) -> impl Iterator<Item = &UnitSpec> {
        self.units.values()
    }

    /// Look up a task definition by id.
    pub fn task(&self, id: &str) -> Option<&TaskDefinition> {
        self.tasks.get(id)
    }

    /// Look up a task definition by id, producing a typed error on miss.
    pub fn require_task(&self, id: &str) -> Result<&TaskDefinition, CatalogError> {
        self.tasks
            .get(id)
            .ok_or_else(|| CatalogError::UnknownTask(id.to_owned()))
    }

    /// Iterate all task definitions.
    pub fn tasks(&self) -> impl Iterator<Item = &TaskDefinition> {
        self.tasks.values()
    }

    /// Iterate the research subset of the task definitions.
    pub fn research(&self) -> impl Iterator<Item = &TaskDefinition> {
        self.tasks
            .values()
            .filter(|def| def.kind == TaskKind::Research)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn every_resource_kind_is_defined() {
        let catalog = Catalog::standard();
        for kind in ResourceKind::ALL {
            assert!(
                catalog.resource(kind).is_some(),
                "missing definition for {kind:?}"
            );
        }
    }

    #[test]
    fn resource_bounds_are_sane() {
        let catalog = Catalog::standard();
        for def in catalog.resources() {
            assert!(def.base_value > 0.0, "{:?} base value", def.kind);
            assert!(
                def.min_price > 0.0 && def.min_price < def.max_price,
                "{:?} price bounds",
                def.kind
            );
            assert!(
                def.min_price <= def.base_value && def.base_value <= def.max_price,
                "{:?} base value outside bounds",
                def.kind
            );
            assert!((0.0..=1.0).contains(&def.volatility), "{:?} volatility", def.kind);
            assert!((0.0..=1.0).contains(&def.rarity), "{:?} rarity", def.kind);
            assert!(def.decay_rate >= 0.0, "{:?} decay", def.kind);
        }
    }

    #[test]
    fn unit_requirements_reference_real_research() {
        let catalog = Catalog::standard();
        for spec in catalog.units() {
            for req in &spec.requires {
                let def = catalog.task(req);
                assert!(def.is_some(), "unit {} requires unknown tech {req}", spec.id);
                assert_eq!(def.unwrap().kind, TaskKind::Research);
            }
        }
    }

    #[test]
    fn research_prerequisites_form_a_dag() {
        let catalog = Catalog::standard();
        for def in catalog.research() {
            for prereq in &def.prerequisites {
                assert!(
                    catalog.task(prereq).is_some(),
                    "{} has unknown prerequisite {prereq}",
                    def.id
                );
                assert_ne!(prereq, &def.id, "{} depends on itself", def.id);
            }
        }
    }

    #[test]
    fn quests_have_positive_durations() {
        let catalog = Catalog::standard();
        for def in catalog.tasks() {
            assert!(def.duration_secs > 0, "{} has zero duration", def.id);
            assert!((1..=5).contains(&def.difficulty), "{} difficulty", def.id);
        }
    }

    #[test]
    fn unknown_lookups_produce_typed_errors() {
        let catalog = Catalog::standard();
        assert!(matches!(
            catalog.require_unit("orbital_laser"),
            Err(CatalogError::UnknownUnit(_))
        ));
        assert!(matches!(
            catalog.require_task("time_travel"),
            Err(CatalogError::UnknownTask(_))
        ));
    }
}
