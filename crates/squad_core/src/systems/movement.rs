//! Unit movement and avoidance.

use crate::components::{Unit, UnitId};
use crate::config::BattleConfig;
use crate::math::{Fixed, Vec2Fixed};
use crate::snapshot::BattleView;

/// Displacement chosen for one unit this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementResult {
    /// Moving unit.
    pub unit_id: UnitId,
    /// Offset to add to the unit's position before clamping to the arena.
    pub displacement: Vec2Fixed,
}

/// Range a unit tries to hold from its target.
///
/// Units with a ranged attack keep to ranged distance; melee-only units
/// close to melee range.
#[must_use]
pub fn preferred_range(unit: &Unit) -> Fixed {
    unit.stats
        .ranged
        .or(unit.stats.melee)
        .map_or(Fixed::ZERO, |profile| profile.range)
}

/// Decide how far `unit` moves this tick.
///
/// Without a live target the unit marches along its team's forward
/// direction. With one it steers toward the target until inside its
/// preferred range. Avoidance is added in both cases. Structures never move.
#[must_use]
pub fn resolve_movement(
    unit: &Unit,
    target: Option<UnitId>,
    battle: &BattleView<'_>,
    config: &BattleConfig,
    delta: Fixed,
) -> MovementResult {
    if unit.is_structure() {
        return MovementResult {
            unit_id: unit.id,
            displacement: Vec2Fixed::ZERO,
        };
    }

    let step = unit.stats.move_speed.max(Fixed::ZERO).saturating_mul(delta);
    let intent = match target.and_then(|id| battle.get_alive(id)) {
        Some(target) => {
            let distance = unit.position.distance(target.position);
            let gap = distance - preferred_range(unit);
            if gap > Fixed::ZERO {
                unit.position.step_toward(target.position, step.min(gap)) - unit.position
            } else {
                Vec2Fixed::ZERO
            }
        }
        None => unit.team.forward().scale(step),
    };

    MovementResult {
        unit_id: unit.id,
        displacement: intent + avoidance_displacement(unit.id, unit.position, battle, config),
    }
}

/// Push away from overlapping allies and terrain blockers.
///
/// Ally overlap is resolved by [`BattleConfig::separation_factor`] per tick
/// (each unit of a pair moves its share); obstacle overlap is resolved in
/// full. Coincident units separate vertically, ordered by id.
#[must_use]
pub fn avoidance_displacement(
    unit_id: UnitId,
    position: Vec2Fixed,
    battle: &BattleView<'_>,
    config: &BattleConfig,
) -> Vec2Fixed {
    let Some(me) = battle.get(unit_id) else {
        return Vec2Fixed::ZERO;
    };

    let mut push = Vec2Fixed::ZERO;
    let spacing = config.unit_radius.saturating_mul(Fixed::from_num(2));

    for ally in battle.alive_on(me.team).filter(|u| u.id != unit_id) {
        let distance = position.distance(ally.position);
        if distance >= spacing {
            continue;
        }
        let away = (position - ally.position).normalize();
        let direction = if away.is_zero() {
            let sign = if unit_id < ally.id { -Fixed::ONE } else { Fixed::ONE };
            Vec2Fixed::new(Fixed::ZERO, sign)
        } else {
            away
        };
        push += direction.scale((spacing - distance).saturating_mul(config.separation_factor));
    }

    for obstacle in &config.obstacles {
        let reach = obstacle.radius.saturating_add(config.unit_radius);
        let distance = position.distance(obstacle.center());
        if distance >= reach {
            continue;
        }
        let away = (position - obstacle.center()).normalize();
        let direction = if away.is_zero() {
            -me.team.forward()
        } else {
            away
        };
        push += direction.scale(reach - distance);
    }

    push
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Team;
    use crate::config::Obstacle;
    use crate::snapshot::UnitSnapshot;
    use crate::stats::{AttackProfile, BaseStats};

    fn fx(value: f64) -> Fixed {
        Fixed::from_num(value)
    }

    fn soldier(id: UnitId, team: Team, x: i32, y: i32) -> Unit {
        let stats = BaseStats::new(fx(50.0), fx(40.0)).with_melee(AttackProfile::new(fx(5.0), fx(30.0), fx(1.0)));
        Unit::new(id, "soldier", team, Vec2Fixed::from_ints(x, y), stats)
    }

    fn snaps(units: &[&Unit]) -> Vec<UnitSnapshot> {
        let mut snaps: Vec<_> = units.iter().map(|u| UnitSnapshot::of(u)).collect();
        snaps.sort_by_key(|s| s.id);
        snaps
    }

    #[test]
    fn test_marches_forward_without_target() {
        let player = soldier(1, Team::Player, 100, 300);
        let enemy = soldier(2, Team::Enemy, 1000, 300);
        let units = snaps(&[&player, &enemy]);
        let view = BattleView::new(&units);
        let config = BattleConfig::default();

        let forward = resolve_movement(&player, None, &view, &config, fx(0.25));
        assert_eq!(forward.displacement, Vec2Fixed::new(fx(10.0), Fixed::ZERO));
        let backward = resolve_movement(&enemy, None, &view, &config, fx(0.25));
        assert_eq!(backward.displacement, Vec2Fixed::new(fx(-10.0), Fixed::ZERO));
    }

    #[test]
    fn test_stops_inside_preferred_range() {
        let player = soldier(1, Team::Player, 100, 300);
        let enemy = soldier(2, Team::Enemy, 120, 300);
        let units = snaps(&[&player, &enemy]);
        let result = resolve_movement(&player, Some(2), &BattleView::new(&units), &BattleConfig::default(), fx(0.1));
        assert_eq!(result.displacement, Vec2Fixed::ZERO);
    }

    #[test]
    fn test_does_not_overshoot_range() {
        let player = soldier(1, Team::Player, 100, 300);
        let enemy = soldier(2, Team::Enemy, 132, 300);
        let units = snaps(&[&player, &enemy]);
        let result = resolve_movement(&player, Some(2), &BattleView::new(&units), &BattleConfig::default(), fx(1.0));
        let epsilon = fx(0.001);
        assert!((result.displacement.x - fx(2.0)).abs() < epsilon);
    }

    #[test]
    fn test_structures_do_not_move() {
        let tower = soldier(1, Team::Player, 100, 300).with_kind(crate::components::UnitKind::Structure);
        let units = snaps(&[&tower]);
        let result = resolve_movement(&tower, None, &BattleView::new(&units), &BattleConfig::default(), fx(0.1));
        assert_eq!(result.displacement, Vec2Fixed::ZERO);
    }

    #[test]
    fn test_overlapping_allies_separate() {
        let a = soldier(1, Team::Player, 100, 300);
        let b = soldier(2, Team::Player, 100, 300);
        let units = snaps(&[&a, &b]);
        let view = BattleView::new(&units);
        let config = BattleConfig::default();

        let push_a = avoidance_displacement(1, a.position, &view, &config);
        let push_b = avoidance_displacement(2, b.position, &view, &config);
        assert!(push_a.y < Fixed::ZERO);
        assert!(push_b.y > Fixed::ZERO);
        assert_eq!(push_a.x, Fixed::ZERO);
    }

    #[test]
    fn test_obstacle_pushes_out() {
        let unit = soldier(1, Team::Player, 100, 300);
        let units = snaps(&[&unit]);
        let config = BattleConfig::default().with_obstacle(Obstacle {
            x: fx(110.0),
            y: fx(300.0),
            radius: fx(20.0),
        });
        let push = avoidance_displacement(1, unit.position, &BattleView::new(&units), &config);
        // Overlap is 20 + 12 - 10 = 22, pushed toward -x.
        let epsilon = fx(0.001);
        assert!((push.x + fx(22.0)).abs() < epsilon);
    }
}
