//! Target acquisition.

use crate::components::UnitId;
use crate::config::BattleConfig;
use crate::math::Fixed;
use crate::snapshot::{BattleView, UnitSnapshot};

/// Target chosen for a unit this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetingResult {
    /// Unit doing the targeting.
    pub unit_id: UnitId,
    /// Chosen target, if any.
    pub target: Option<UnitId>,
}

/// Pick a target for `unit`.
///
/// Priority:
/// 1. nearest living enemy soldier inside the aggro radius (which grows
///    when the unit is deep in enemy territory);
/// 2. otherwise the nearest living enemy structure, at any distance;
/// 3. otherwise nothing.
///
/// Distance ties go to the lower unit id.
#[must_use]
pub fn find_target(unit: &UnitSnapshot, battle: &BattleView<'_>, config: &BattleConfig) -> TargetingResult {
    let enemies = unit.team.opponent();
    let aggro = config.aggro_radius_at(unit.team, unit.position);
    let aggro_sq = aggro.saturating_mul(aggro);

    let soldier = nearest(
        unit,
        battle
            .alive_on(enemies)
            .filter(|e| !e.is_structure)
            .filter(|e| unit.position.distance_squared(e.position) <= aggro_sq),
    );

    let target = soldier.or_else(|| nearest(unit, battle.alive_on(enemies).filter(|e| e.is_structure)));

    TargetingResult {
        unit_id: unit.id,
        target,
    }
}

fn nearest<'a>(unit: &UnitSnapshot, candidates: impl Iterator<Item = &'a UnitSnapshot>) -> Option<UnitId> {
    let mut best: Option<(Fixed, UnitId)> = None;
    for candidate in candidates {
        let dist_sq = unit.position.distance_squared(candidate.position);
        if best.map_or(true, |(best_sq, _)| dist_sq < best_sq) {
            best = Some((dist_sq, candidate.id));
        }
    }
    best.map(|(_, id)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Team;
    use crate::math::Vec2Fixed;

    fn snap(id: UnitId, team: Team, x: i32, structure: bool) -> UnitSnapshot {
        UnitSnapshot {
            id,
            team,
            position: Vec2Fixed::from_ints(x, 300),
            health: Fixed::from_num(10),
            max_health: Fixed::from_num(10),
            armor: Fixed::ZERO,
            is_structure: structure,
        }
    }

    #[test]
    fn test_nearest_soldier_in_aggro() {
        let units = vec![
            snap(1, Team::Player, 100, false),
            snap(2, Team::Enemy, 300, false),
            snap(3, Team::Enemy, 250, false),
            snap(4, Team::Enemy, 150, true),
        ];
        let view = BattleView::new(&units);
        let result = find_target(&units[0], &view, &BattleConfig::default());
        // Soldiers take priority over a closer structure.
        assert_eq!(result.target, Some(3));
    }

    #[test]
    fn test_falls_back_to_structure() {
        let units = vec![
            snap(1, Team::Player, 100, false),
            snap(2, Team::Enemy, 1200, false),
            snap(5, Team::Enemy, 1500, true),
            snap(6, Team::Enemy, 1400, true),
        ];
        let view = BattleView::new(&units);
        let result = find_target(&units[0], &view, &BattleConfig::default());
        assert_eq!(result.target, Some(6));
    }

    #[test]
    fn test_no_target_without_structures() {
        let units = vec![snap(1, Team::Player, 100, false), snap(2, Team::Enemy, 1500, false)];
        let view = BattleView::new(&units);
        assert_eq!(find_target(&units[0], &view, &BattleConfig::default()).target, None);
    }

    #[test]
    fn test_deep_units_see_further() {
        let config = BattleConfig::default();
        // 400 units away: outside base aggro, inside deep aggro.
        let units = vec![snap(1, Team::Player, 1100, false), snap(2, Team::Enemy, 1500, false)];
        let view = BattleView::new(&units);
        assert_eq!(find_target(&units[0], &view, &config).target, Some(2));
    }

    #[test]
    fn test_ignores_dead_and_allies() {
        let mut dead = snap(2, Team::Enemy, 120, false);
        dead.health = Fixed::ZERO;
        let units = vec![snap(1, Team::Player, 100, false), dead, snap(3, Team::Player, 110, false)];
        let view = BattleView::new(&units);
        assert_eq!(find_target(&units[0], &view, &BattleConfig::default()).target, None);
    }
}
