//! Unit definitions for data-driven unit types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::components::UnitKind;
use crate::error::{GameError, Result};
use crate::modifiers::Modifier;
use crate::stats::BaseStats;

/// Data-driven unit definition.
///
/// # Example RON
///
/// ```ron
/// (
///     id: "archer",
///     name: "Archer",
///     category: "ranged",
///     stats: (
///         max_health: 60.0,
///         move_speed: 35.0,
///         ranged: Some((damage: 9.0, range: 180.0, attack_speed: 0.8, projectile_speed: 400.0)),
///     ),
///     abilities: ["volley"],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDefinition {
    /// Unique string identifier for this unit type.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Flavor text.
    #[serde(default)]
    pub description: String,

    /// Category used by category-scoped upgrades (e.g. `"melee"`).
    pub category: String,

    /// Soldier or structure.
    #[serde(default)]
    pub kind: UnitKind,

    /// Base statistics.
    pub stats: BaseStats,

    /// Innate ability ids.
    #[serde(default)]
    pub abilities: Vec<String>,

    /// Permanent modifiers every unit of this type carries.
    #[serde(default)]
    pub innate_modifiers: Vec<Modifier>,

    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl UnitDefinition {
    /// Create a soldier definition with no abilities.
    #[must_use]
    pub fn new(id: impl Into<String>, category: impl Into<String>, stats: BaseStats) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            category: category.into(),
            kind: UnitKind::Soldier,
            stats,
            abilities: Vec::new(),
            innate_modifiers: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Builder method to mark the definition as a structure.
    #[must_use]
    pub fn as_structure(mut self) -> Self {
        self.kind = UnitKind::Structure;
        self
    }

    /// Builder method to add an innate ability.
    #[must_use]
    pub fn with_ability(mut self, ability_id: impl Into<String>) -> Self {
        self.abilities.push(ability_id.into());
        self
    }

    /// Builder method to add an innate modifier.
    #[must_use]
    pub fn with_innate_modifier(mut self, modifier: Modifier) -> Self {
        self.innate_modifiers.push(modifier);
        self
    }

    /// Check if this definition is a structure.
    #[must_use]
    pub fn is_structure(&self) -> bool {
        self.kind == UnitKind::Structure
    }

    /// Check if the unit has a specific tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Registry of unit definitions.
#[derive(Debug, Clone, Default)]
pub struct UnitRegistry {
    units: HashMap<String, UnitDefinition>,
    order: Vec<String>,
}

impl UnitRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition. Duplicate ids are rejected.
    pub fn register(&mut self, unit: UnitDefinition) -> Result<()> {
        if self.units.contains_key(&unit.id) {
            return Err(GameError::DuplicateDefinition {
                kind: "unit",
                id: unit.id,
            });
        }
        self.order.push(unit.id.clone());
        self.units.insert(unit.id.clone(), unit);
        Ok(())
    }

    /// Get a definition by id.
    pub fn get(&self, id: &str) -> Result<&UnitDefinition> {
        self.try_get(id)
            .ok_or_else(|| GameError::UnknownUnitType(id.to_string()))
    }

    /// Get a definition by id, if registered.
    #[must_use]
    pub fn try_get(&self, id: &str) -> Option<&UnitDefinition> {
        self.units.get(id)
    }

    /// Check whether an id is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.units.contains_key(id)
    }

    /// Definitions in a category, in registration order.
    pub fn by_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a UnitDefinition> + 'a {
        self.all().filter(move |u| u.category == category)
    }

    /// All definitions in registration order.
    pub fn all(&self) -> impl Iterator<Item = &UnitDefinition> {
        self.order.iter().filter_map(|id| self.units.get(id))
    }

    /// Number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Fixed;

    fn grunt(id: &str, category: &str) -> UnitDefinition {
        UnitDefinition::new(id, category, BaseStats::new(Fixed::from_num(50), Fixed::from_num(30)))
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = UnitRegistry::new();
        registry.register(grunt("spear", "melee")).unwrap();
        registry.register(grunt("sword", "melee")).unwrap();
        registry.register(grunt("bow", "ranged")).unwrap();

        assert_eq!(registry.len(), 3);
        assert!(registry.get("bow").is_ok());
        assert!(matches!(registry.get("axe"), Err(GameError::UnknownUnitType(_))));
        let melee: Vec<_> = registry.by_category("melee").map(|u| u.id.as_str()).collect();
        assert_eq!(melee, vec!["spear", "sword"]);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = UnitRegistry::new();
        registry.register(grunt("spear", "melee")).unwrap();
        assert!(matches!(
            registry.register(grunt("spear", "melee")),
            Err(GameError::DuplicateDefinition { kind: "unit", .. })
        ));
    }

    #[test]
    fn test_parse_structure_from_ron() {
        let source = r#"(
            id: "watchtower",
            name: "Watchtower",
            category: "structure",
            kind: Structure,
            stats: (max_health: 500.0, move_speed: 0.0, armor: 4.0),
        )"#;
        let unit: UnitDefinition = ron::from_str(source).unwrap();
        assert!(unit.is_structure());
        assert!(unit.stats.melee.is_none());
        assert_eq!(unit.stats.armor, Fixed::from_num(4));
    }
}
