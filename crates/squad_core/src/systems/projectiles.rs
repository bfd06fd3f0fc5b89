//! Projectile and shockwave advancement.

use crate::components::{EffectId, Projectile, Shockwave, UnitId};
use crate::config::BattleConfig;
use crate::math::{Fixed, Vec2Fixed};
use crate::snapshot::BattleView;

/// Result of advancing a projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileUpdate {
    /// Still travelling, now at this position.
    InFlight {
        /// Projectile identifier.
        projectile_id: EffectId,
        /// New position.
        position: Vec2Fixed,
    },
    /// Reached its target this tick.
    Hit {
        /// Projectile identifier.
        projectile_id: EffectId,
        /// Unit hit.
        target: UnitId,
    },
    /// Target is gone; the projectile is removed without effect.
    Fizzled {
        /// Projectile identifier.
        projectile_id: EffectId,
    },
}

/// Move a projectile toward its target's current position.
///
/// # Arguments
/// * `projectile` - The projectile to advance
/// * `battle` - Snapshot used to locate the target
/// * `delta` - Seconds elapsed
#[must_use]
pub fn advance_projectile(projectile: &Projectile, battle: &BattleView<'_>, delta: Fixed) -> ProjectileUpdate {
    let Some(target) = battle.get_alive(projectile.target) else {
        return ProjectileUpdate::Fizzled {
            projectile_id: projectile.id,
        };
    };

    let step = projectile.speed.saturating_mul(delta);
    let position = projectile.position.step_toward(target.position, step);
    if position == target.position {
        ProjectileUpdate::Hit {
            projectile_id: projectile.id,
            target: target.id,
        }
    } else {
        ProjectileUpdate::InFlight {
            projectile_id: projectile.id,
            position,
        }
    }
}

/// Result of advancing a shockwave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShockwaveUpdate {
    /// Shockwave identifier.
    pub shockwave_id: EffectId,
    /// New radius.
    pub radius: Fixed,
    /// New age.
    pub age: Fixed,
    /// Units newly inside the ring, in id order.
    pub hits: Vec<UnitId>,
    /// Whether the ring should be removed after applying hits.
    pub finished: bool,
}

/// Expand a shockwave and collect opponents it reaches for the first time.
#[must_use]
pub fn advance_shockwave(
    shockwave: &Shockwave,
    battle: &BattleView<'_>,
    config: &BattleConfig,
    delta: Fixed,
) -> ShockwaveUpdate {
    let radius = shockwave
        .radius
        .saturating_add(shockwave.speed.saturating_mul(delta))
        .min(shockwave.max_radius);
    let age = shockwave.age.saturating_add(delta);
    let radius_sq = radius.saturating_mul(radius);

    let hits = battle
        .alive_on(shockwave.team.opponent())
        .filter(|u| !shockwave.hit.contains(&u.id))
        .filter(|u| shockwave.origin.distance_squared(u.position) <= radius_sq)
        .map(|u| u.id)
        .collect();

    ShockwaveUpdate {
        shockwave_id: shockwave.id,
        radius,
        age,
        hits,
        finished: radius >= shockwave.max_radius || age >= config.shockwave_lifetime,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::components::Team;
    use crate::snapshot::UnitSnapshot;

    fn fx(value: f64) -> Fixed {
        Fixed::from_num(value)
    }

    fn snap(id: UnitId, team: Team, x: i32) -> UnitSnapshot {
        UnitSnapshot {
            id,
            team,
            position: Vec2Fixed::from_ints(x, 0),
            health: fx(10.0),
            max_health: fx(10.0),
            armor: Fixed::ZERO,
            is_structure: false,
        }
    }

    fn arrow(target: UnitId) -> Projectile {
        Projectile {
            id: 1,
            source: 1,
            team: Team::Player,
            target,
            position: Vec2Fixed::ZERO,
            damage: fx(10.0),
            speed: fx(100.0),
        }
    }

    #[test]
    fn test_projectile_travels_then_hits() {
        let units = vec![snap(2, Team::Enemy, 50)];
        let view = BattleView::new(&units);

        let ProjectileUpdate::InFlight { position, .. } = advance_projectile(&arrow(2), &view, fx(0.25)) else {
            panic!("projectile should still be in flight");
        };
        let epsilon = fx(0.001);
        assert!((position.x - fx(25.0)).abs() < epsilon);

        let update = advance_projectile(&arrow(2), &view, fx(0.5));
        assert_eq!(update, ProjectileUpdate::Hit { projectile_id: 1, target: 2 });
    }

    #[test]
    fn test_projectile_fizzles_without_target() {
        let units = vec![snap(3, Team::Enemy, 50)];
        let update = advance_projectile(&arrow(2), &BattleView::new(&units), fx(0.1));
        assert_eq!(update, ProjectileUpdate::Fizzled { projectile_id: 1 });
    }

    #[test]
    fn test_shockwave_hits_each_enemy_once() {
        let units = vec![snap(1, Team::Player, 10), snap(2, Team::Enemy, 20), snap(3, Team::Enemy, 80)];
        let view = BattleView::new(&units);
        let mut wave = Shockwave {
            id: 9,
            source: 1,
            team: Team::Player,
            origin: Vec2Fixed::ZERO,
            radius: Fixed::ZERO,
            max_radius: fx(100.0),
            speed: fx(200.0),
            damage: fx(5.0),
            knockback: Fixed::ZERO,
            age: Fixed::ZERO,
            hit: BTreeSet::new(),
        };
        let config = BattleConfig::default();

        let first = advance_shockwave(&wave, &view, &config, fx(0.25));
        assert_eq!(first.radius, fx(50.0));
        assert_eq!(first.hits, vec![2]);
        assert!(!first.finished);

        wave.radius = first.radius;
        wave.age = first.age;
        wave.hit.extend(first.hits);
        let second = advance_shockwave(&wave, &view, &config, fx(0.25));
        assert_eq!(second.hits, vec![3]);
        assert!(second.finished);
    }
}
