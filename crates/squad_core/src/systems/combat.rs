//! Attack decisions.

use crate::components::{Unit, UnitId};
use crate::config::BattleConfig;
use crate::math::Fixed;
use crate::modifiers::AttackMode;
use crate::snapshot::{BattleView, UnitSnapshot};
use crate::stats::ComputedStats;

/// How an attack reaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Damage lands this tick.
    Instant,
    /// A projectile carries the damage.
    Projectile {
        /// Travel speed.
        speed: Fixed,
    },
}

/// An attack a unit makes this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackIntent {
    /// Unit being attacked.
    pub target: UnitId,
    /// Attack mode used.
    pub mode: AttackMode,
    /// Damage after combat penalties, before the target's armor.
    pub damage: Fixed,
    /// Delivery method.
    pub delivery: Delivery,
}

/// Outcome of the combat system for one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombatResult {
    /// Attacking unit.
    pub unit_id: UnitId,
    /// New attack cooldown.
    pub attack_cooldown: Fixed,
    /// Attack made, if any.
    pub attack: Option<AttackIntent>,
}

/// Choose an attack mode for a target at `distance`.
///
/// Melee when the target is inside melee range or melee is the only option;
/// ranged otherwise.
#[must_use]
pub fn select_attack_mode(stats: &ComputedStats, distance: Fixed) -> Option<AttackMode> {
    match (stats.melee, stats.ranged) {
        (Some(melee), Some(_)) if distance <= melee.range => Some(AttackMode::Melee),
        (_, Some(_)) => Some(AttackMode::Ranged),
        (Some(_), None) => Some(AttackMode::Melee),
        (None, None) => None,
    }
}

/// Check whether an enemy soldier is inside the engagement radius.
#[must_use]
pub fn is_engaged(unit: &UnitSnapshot, battle: &BattleView<'_>, config: &BattleConfig) -> bool {
    let radius_sq = config.engagement_radius.saturating_mul(config.engagement_radius);
    battle
        .alive_on(unit.team.opponent())
        .filter(|e| !e.is_structure)
        .any(|e| unit.position.distance_squared(e.position) <= radius_sq)
}

/// Decide whether `unit` attacks `target` this tick.
///
/// The cooldown counts down by `delta`; an attack happens when it has
/// reached zero and the target is inside the chosen mode's range. Firing
/// resets the cooldown to `1 / attack_speed`; an attack speed of zero never
/// fires. Ranged attacks made while engaged are scaled by
/// [`BattleConfig::ranged_engaged_penalty`].
#[must_use]
pub fn resolve_combat(
    unit: &Unit,
    target: Option<UnitId>,
    battle: &BattleView<'_>,
    config: &BattleConfig,
    delta: Fixed,
) -> CombatResult {
    let cooldown = (unit.combat.attack_cooldown - delta).max(Fixed::ZERO);
    let idle = CombatResult {
        unit_id: unit.id,
        attack_cooldown: cooldown,
        attack: None,
    };

    let Some(target) = target.and_then(|id| battle.get_alive(id)) else {
        return idle;
    };
    let distance = unit.position.distance(target.position);
    let Some(mode) = select_attack_mode(&unit.stats, distance) else {
        return idle;
    };
    let Some(profile) = unit.stats.attack(mode) else {
        return idle;
    };
    if cooldown > Fixed::ZERO || distance > profile.range {
        return idle;
    }
    let Some(reset) = profile.cooldown() else {
        return idle;
    };

    let mut damage = profile.damage;
    if mode == AttackMode::Ranged && is_engaged(&UnitSnapshot::of(unit), battle, config) {
        damage = damage.saturating_mul(config.ranged_engaged_penalty);
    }

    let delivery = if mode == AttackMode::Ranged && profile.projectile_speed > Fixed::ZERO {
        Delivery::Projectile {
            speed: profile.projectile_speed,
        }
    } else {
        Delivery::Instant
    };

    CombatResult {
        unit_id: unit.id,
        attack_cooldown: reset,
        attack: Some(AttackIntent {
            target: target.id,
            mode,
            damage,
            delivery,
        }),
    }
}
