//! Upgrade cost tables for balancing.

use serde::Serialize;
use squad_core::data::GameData;

/// Prices of one upgrade across levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CostRow {
    /// Upgrade id.
    pub upgrade_id: String,
    /// Price of each level, starting with level 1.
    pub costs: Vec<u64>,
    /// Sum of the listed prices.
    pub total: u64,
}

/// Price every upgrade for up to `levels` levels.
///
/// Upgrades with a level cap stop at the cap.
#[must_use]
pub fn cost_table(data: &GameData, levels: u32) -> Vec<CostRow> {
    data.upgrades
        .all()
        .map(|upgrade| {
            let levels = if upgrade.max_level > 0 {
                levels.min(upgrade.max_level)
            } else {
                levels
            };
            let costs: Vec<u64> = (0..levels).map(|owned| upgrade.cost_at(owned)).collect();
            let total = costs.iter().fold(0u64, |acc, c| acc.saturating_add(*c));
            CostRow {
                upgrade_id: upgrade.id.clone(),
                costs,
                total,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use squad_core::modifiers::{Modifier, ModifierKind, StatTarget};
    use squad_core::upgrades::{UpgradeDefinition, UpgradeEffect, UpgradeScope};
    use squad_core::math::Fixed;

    #[test]
    fn test_doubling_costs_respect_cap() {
        let upgrade = UpgradeDefinition::new(
            "armor",
            UpgradeScope::Global,
            UpgradeEffect::StatModifier {
                modifiers: vec![Modifier::new("armor", StatTarget::Armor, ModifierKind::Flat, Fixed::ONE)],
            },
            10,
        )
        .with_cost_multiplier(Fixed::from_num(2))
        .with_max_level(3);
        let data = GameData::from_definitions([], [], [upgrade]).unwrap();

        let table = cost_table(&data, 10);
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].costs, vec![10, 20, 40]);
        assert_eq!(table[0].total, 70);
    }
}
