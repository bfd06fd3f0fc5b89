//! The registry bundle the engine is built from.

use crate::abilities::{AbilityDefinition, AbilityRegistry, EffectKind};
use crate::error::{GameError, Result};
use crate::math::Fixed;
use crate::upgrades::{Prerequisite, UpgradeDefinition, UpgradeEffect, UpgradeRegistry, UpgradeScope};

use super::{UnitDefinition, UnitRegistry};

/// Unit, ability and upgrade registries.
///
/// Built once and handed to the engine; there are no global registries.
#[derive(Debug, Clone, Default)]
pub struct GameData {
    /// Unit definitions.
    pub units: UnitRegistry,
    /// Ability definitions.
    pub abilities: AbilityRegistry,
    /// Upgrade definitions.
    pub upgrades: UpgradeRegistry,
}

impl GameData {
    /// Create empty registries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register definitions, rejecting duplicate ids.
    ///
    /// Cross-references are not checked here; call [`GameData::validate`].
    pub fn from_definitions(
        units: impl IntoIterator<Item = UnitDefinition>,
        abilities: impl IntoIterator<Item = AbilityDefinition>,
        upgrades: impl IntoIterator<Item = UpgradeDefinition>,
    ) -> Result<Self> {
        let mut data = Self::new();
        for unit in units {
            data.units.register(unit)?;
        }
        for ability in abilities {
            data.abilities.register(ability)?;
        }
        for upgrade in upgrades {
            data.upgrades.register(upgrade)?;
        }
        Ok(data)
    }

    /// Register definitions and fail if any cross-reference is broken.
    pub fn from_definitions_validated(
        units: impl IntoIterator<Item = UnitDefinition>,
        abilities: impl IntoIterator<Item = AbilityDefinition>,
        upgrades: impl IntoIterator<Item = UpgradeDefinition>,
    ) -> Result<Self> {
        let data = Self::from_definitions(units, abilities, upgrades)?;
        let issues = data.validate();
        if issues.is_empty() {
            Ok(data)
        } else {
            Err(GameError::ValidationFailed(issues))
        }
    }

    /// Check cross-references and value ranges, returning every problem found.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for unit in self.units.all() {
            if unit.stats.max_health <= Fixed::ZERO {
                issues.push(format!("unit '{}': max_health must be positive", unit.id));
            }
            for ability_id in &unit.abilities {
                if !self.abilities.contains(ability_id) {
                    issues.push(format!("unit '{}': unknown ability '{ability_id}'", unit.id));
                }
            }
        }

        for ability in self.abilities.all() {
            if ability.chance < Fixed::ZERO || ability.chance > Fixed::ONE {
                issues.push(format!("ability '{}': chance must be within [0, 1]", ability.id));
            }
            if ability.cooldown < Fixed::ZERO {
                issues.push(format!("ability '{}': cooldown must not be negative", ability.id));
            }
            for effect in &ability.effects {
                if let EffectKind::SpawnUnit { unit_type, .. } = &effect.kind {
                    if !self.units.contains(unit_type) {
                        issues.push(format!(
                            "ability '{}': spawns unknown unit type '{unit_type}'",
                            ability.id
                        ));
                    }
                }
            }
        }

        for upgrade in self.upgrades.all() {
            self.validate_upgrade(upgrade, &mut issues);
        }

        issues
    }

    fn validate_upgrade(&self, upgrade: &UpgradeDefinition, issues: &mut Vec<String>) {
        match &upgrade.scope {
            UpgradeScope::Global => {}
            UpgradeScope::UnitType(unit_type) => {
                if !self.units.contains(unit_type) {
                    issues.push(format!("upgrade '{}': unknown unit type '{unit_type}'", upgrade.id));
                }
            }
            UpgradeScope::UnitCategory(category) => {
                if self.units.by_category(category).next().is_none() {
                    issues.push(format!("upgrade '{}': no units in category '{category}'", upgrade.id));
                }
            }
        }

        match &upgrade.effect {
            UpgradeEffect::StatModifier { modifiers } => {
                if modifiers.is_empty() {
                    issues.push(format!("upgrade '{}': no modifiers", upgrade.id));
                }
            }
            UpgradeEffect::AbilityGrant { ability_id } => {
                if !self.abilities.contains(ability_id) {
                    issues.push(format!("upgrade '{}': grants unknown ability '{ability_id}'", upgrade.id));
                }
            }
            UpgradeEffect::UnlockUnit { unit_type } => {
                if !self.units.contains(unit_type) {
                    issues.push(format!("upgrade '{}': unlocks unknown unit type '{unit_type}'", upgrade.id));
                }
            }
        }

        if upgrade.cost_multiplier <= Fixed::ZERO {
            issues.push(format!("upgrade '{}': cost_multiplier must be positive", upgrade.id));
        }

        for prerequisite in &upgrade.prerequisites {
            match prerequisite {
                Prerequisite::Upgrade { upgrade_id, .. } => {
                    if upgrade_id == &upgrade.id {
                        issues.push(format!("upgrade '{}': requires itself", upgrade.id));
                    } else if !self.upgrades.contains(upgrade_id) {
                        issues.push(format!("upgrade '{}': requires unknown upgrade '{upgrade_id}'", upgrade.id));
                    }
                }
                Prerequisite::Wave { .. } => {}
                Prerequisite::UnitCount { unit_type, .. } => {
                    if !self.units.contains(unit_type) {
                        issues.push(format!("upgrade '{}': counts unknown unit type '{unit_type}'", upgrade.id));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abilities::{AbilityEffect, AbilityTrigger, TargetSelector, TriggerKind};
    use crate::stats::BaseStats;

    fn unit(id: &str) -> UnitDefinition {
        UnitDefinition::new(id, "melee", BaseStats::new(Fixed::from_num(50), Fixed::from_num(30)))
    }

    #[test]
    fn test_valid_data_has_no_issues() {
        let summon = AbilityDefinition::new("summon", AbilityTrigger::new(TriggerKind::OnSpawn)).with_effect(
            AbilityEffect::new(
                EffectKind::SpawnUnit {
                    unit_type: "wolf".into(),
                    count: 2,
                    linked: true,
                },
                TargetSelector::SelfUnit,
            ),
        );
        let data = GameData::from_definitions_validated(
            vec![unit("shaman").with_ability("summon"), unit("wolf")],
            vec![summon],
            vec![UpgradeDefinition::new(
                "pack",
                UpgradeScope::UnitType("wolf".into()),
                UpgradeEffect::AbilityGrant { ability_id: "summon".into() },
                10,
            )],
        );
        assert!(data.is_ok());
    }

    #[test]
    fn test_broken_references_are_reported() {
        let data = GameData::from_definitions(
            vec![unit("grunt").with_ability("missing")],
            vec![],
            vec![UpgradeDefinition::new(
                "phantom",
                UpgradeScope::UnitCategory("air".into()),
                UpgradeEffect::UnlockUnit { unit_type: "dragon".into() },
                10,
            )
            .with_prerequisite(Prerequisite::Upgrade {
                upgrade_id: "nothing".into(),
                level: 1,
            })],
        )
        .unwrap();

        let issues = data.validate();
        assert_eq!(issues.len(), 4, "{issues:?}");
        assert!(issues.iter().any(|i| i.contains("unknown ability 'missing'")));
        assert!(issues.iter().any(|i| i.contains("category 'air'")));
        assert!(issues.iter().any(|i| i.contains("'dragon'")));
        assert!(issues.iter().any(|i| i.contains("'nothing'")));
    }

    #[test]
    fn test_duplicates_fail_registration() {
        let result = GameData::from_definitions(vec![unit("a"), unit("a")], vec![], vec![]);
        assert!(matches!(result, Err(GameError::DuplicateDefinition { .. })));
    }
}
