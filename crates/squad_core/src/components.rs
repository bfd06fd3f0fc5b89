//! Battle entity definitions.
//!
//! Units, projectiles and shockwaves are plain data. Behavior lives in
//! [`crate::systems`] and in the engine that applies system results.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::abilities::CooldownMap;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::modifiers::{ActiveModifier, AttackMode};
use crate::stats::{compute_all_stats, BaseStats, ComputedStats};

/// Unique identifier for units.
pub type UnitId = u64;

/// Identifier for projectiles and shockwaves.
pub type EffectId = u64;

// ============================================================================
// Teams
// ============================================================================

/// Side a unit fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Team {
    /// The player's squad, advancing toward +x.
    Player,
    /// The opposing wave, advancing toward -x.
    Enemy,
}

impl Team {
    /// The opposing team.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Enemy,
            Self::Enemy => Self::Player,
        }
    }

    /// Unit vector along which this team marches.
    #[must_use]
    pub fn forward(self) -> Vec2Fixed {
        match self {
            Self::Player => Vec2Fixed::new(Fixed::ONE, Fixed::ZERO),
            Self::Enemy => Vec2Fixed::new(-Fixed::ONE, Fixed::ZERO),
        }
    }
}

/// Whether a unit fights or is a fixed structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UnitKind {
    /// Mobile combat unit.
    #[default]
    Soldier,
    /// Immovable structure; only targeted when no soldiers are in reach.
    Structure,
}

// ============================================================================
// Health
// ============================================================================

/// Health component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Current health points.
    #[serde(with = "fixed_serde")]
    pub current: Fixed,
    /// Maximum health points.
    #[serde(with = "fixed_serde")]
    pub max: Fixed,
}

impl Health {
    /// Create new health component at full health.
    #[must_use]
    pub fn new(max: Fixed) -> Self {
        let max = max.max(Fixed::ZERO);
        Self { current: max, max }
    }

    /// Check if the unit is dead (health <= 0).
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.current <= Fixed::ZERO
    }

    /// Apply damage, returning actual damage dealt.
    pub fn apply_damage(&mut self, amount: Fixed) -> Fixed {
        let actual = amount.max(Fixed::ZERO).min(self.current);
        self.current -= actual;
        actual
    }

    /// Heal, returning the amount actually restored.
    pub fn heal(&mut self, amount: Fixed) -> Fixed {
        let headroom = (self.max - self.current).max(Fixed::ZERO);
        let actual = amount.max(Fixed::ZERO).min(headroom);
        self.current += actual;
        actual
    }

    /// Current health as a fraction of maximum (0 when max is 0).
    #[must_use]
    pub fn ratio(&self) -> Fixed {
        if self.max <= Fixed::ZERO {
            return Fixed::ZERO;
        }
        self.current.checked_div(self.max).unwrap_or(Fixed::ZERO)
    }

    /// Change the maximum, clamping current health into range.
    pub fn set_max(&mut self, max: Fixed) {
        self.max = max.max(Fixed::ZERO);
        self.current = self.current.min(self.max);
    }

    /// Set health to zero.
    pub fn kill(&mut self) {
        self.current = Fixed::ZERO;
    }
}

// ============================================================================
// Transient unit state
// ============================================================================

/// Target acquisition state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TargetingState {
    /// Current target, if any.
    pub target: Option<UnitId>,
}

/// Attack timing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CombatState {
    /// Seconds until the next attack is allowed.
    #[serde(with = "fixed_serde")]
    pub attack_cooldown: Fixed,
    /// Mode used by the most recent attack.
    pub last_mode: Option<AttackMode>,
}

/// Movement state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MovementState {
    /// Displacement applied on the last tick.
    pub last_displacement: Vec2Fixed,
}

/// Render-only flash timers, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VisualState {
    /// Time left on the damage flash.
    #[serde(with = "fixed_serde")]
    pub hit_flash: Fixed,
    /// Time left on the attack flash.
    #[serde(with = "fixed_serde")]
    pub attack_flash: Fixed,
}

// ============================================================================
// Unit
// ============================================================================

/// A unit on the battlefield.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Unique identifier.
    pub id: UnitId,
    /// Definition id this unit was spawned from.
    pub unit_type: String,
    /// Definition category.
    pub category: String,
    /// Soldier or structure.
    pub kind: UnitKind,
    /// Owning team.
    pub team: Team,
    /// World position.
    pub position: Vec2Fixed,
    /// Health.
    pub health: Health,
    /// Definition stats.
    pub base_stats: BaseStats,
    /// Stats after modifiers.
    pub stats: ComputedStats,
    /// Runtime ability ids (innate first, then granted).
    pub abilities: Vec<String>,
    /// Per-ability cooldowns.
    pub cooldowns: CooldownMap,
    /// Active modifiers.
    pub modifiers: Vec<ActiveModifier>,
    /// Target acquisition.
    pub targeting: TargetingState,
    /// Attack timing.
    pub combat: CombatState,
    /// Movement.
    pub movement: MovementState,
    /// Flash timers.
    pub visual: VisualState,
    /// Caster whose death also kills this unit.
    pub linked_to: Option<UnitId>,
    /// Modifier source ids this unit issued that end with it.
    pub linked_sources: BTreeSet<String>,
    /// Last unit that damaged this one, credited with the kill.
    pub last_attacker: Option<UnitId>,
    /// Death triggers already dispatched.
    pub death_processed: bool,
}

impl Unit {
    /// Create a unit at full health with no modifiers.
    #[must_use]
    pub fn new(
        id: UnitId,
        unit_type: impl Into<String>,
        team: Team,
        position: Vec2Fixed,
        base_stats: BaseStats,
    ) -> Self {
        let stats = ComputedStats::from_base(&base_stats);
        Self {
            id,
            unit_type: unit_type.into(),
            category: String::new(),
            kind: UnitKind::Soldier,
            team,
            position,
            health: Health::new(stats.max_health),
            base_stats,
            stats,
            abilities: Vec::new(),
            cooldowns: CooldownMap::new(),
            modifiers: Vec::new(),
            targeting: TargetingState::default(),
            combat: CombatState::default(),
            movement: MovementState::default(),
            visual: VisualState::default(),
            linked_to: None,
            linked_sources: BTreeSet::new(),
            last_attacker: None,
            death_processed: false,
        }
    }

    /// Builder method to set the unit kind.
    #[must_use]
    pub fn with_kind(mut self, kind: UnitKind) -> Self {
        self.kind = kind;
        self
    }

    /// Builder method to set the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Check whether the unit is alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.health.is_dead()
    }

    /// Check whether the unit is a structure.
    #[must_use]
    pub fn is_structure(&self) -> bool {
        self.kind == UnitKind::Structure
    }

    /// Recompute stats from base stats and active modifiers.
    ///
    /// Current health is clamped to the new maximum, never raised.
    pub fn recompute_stats(&mut self) {
        self.stats = compute_all_stats(&self.base_stats, &self.modifiers);
        self.health.set_max(self.stats.max_health);
    }
}

// ============================================================================
// Projectiles and shockwaves
// ============================================================================

/// A homing projectile in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projectile {
    /// Unique identifier.
    pub id: EffectId,
    /// Unit that fired it.
    pub source: UnitId,
    /// Team of the shooter.
    pub team: Team,
    /// Unit it homes on.
    pub target: UnitId,
    /// Current position.
    pub position: Vec2Fixed,
    /// Damage before armor.
    #[serde(with = "fixed_serde")]
    pub damage: Fixed,
    /// Travel speed in world units per second.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
}

/// An expanding ring that hits each enemy once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shockwave {
    /// Unique identifier.
    pub id: EffectId,
    /// Unit that created it.
    pub source: UnitId,
    /// Team of the creator; only opponents are hit.
    pub team: Team,
    /// Center of the ring.
    pub origin: Vec2Fixed,
    /// Current radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
    /// Radius at which the ring disappears.
    #[serde(with = "fixed_serde")]
    pub max_radius: Fixed,
    /// Expansion speed in world units per second.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Damage dealt to each unit hit (armor ignored).
    #[serde(with = "fixed_serde")]
    pub damage: Fixed,
    /// Distance each hit unit is pushed away from the origin.
    #[serde(with = "fixed_serde")]
    pub knockback: Fixed,
    /// Seconds since creation.
    #[serde(with = "fixed_serde")]
    pub age: Fixed,
    /// Units already hit.
    pub hit: BTreeSet<UnitId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifiers::{Modifier, ModifierKind, ModifierSource, StatTarget};

    fn fx(value: f64) -> Fixed {
        Fixed::from_num(value)
    }

    #[test]
    fn test_health_damage_and_heal() {
        let mut health = Health::new(fx(100.0));
        assert_eq!(health.apply_damage(fx(30.0)), fx(30.0));
        assert_eq!(health.current, fx(70.0));
        assert_eq!(health.heal(fx(50.0)), fx(30.0));
        assert_eq!(health.current, fx(100.0));
        assert_eq!(health.apply_damage(fx(500.0)), fx(100.0));
        assert!(health.is_dead());
        assert_eq!(health.current, Fixed::ZERO);
    }

    #[test]
    fn test_health_ratio() {
        let mut health = Health::new(fx(200.0));
        health.apply_damage(fx(150.0));
        assert_eq!(health.ratio(), fx(0.25));
        assert_eq!(Health::new(Fixed::ZERO).ratio(), Fixed::ZERO);
    }

    #[test]
    fn test_set_max_clamps_current() {
        let mut health = Health::new(fx(225.0));
        health.set_max(fx(150.0));
        assert_eq!(health.current, fx(150.0));
        health.set_max(fx(300.0));
        assert_eq!(health.current, fx(150.0));
    }

    #[test]
    fn test_team_forward() {
        assert_eq!(Team::Player.forward().x, Fixed::ONE);
        assert_eq!(Team::Enemy.forward().x, -Fixed::ONE);
        assert_eq!(Team::Player.opponent(), Team::Enemy);
    }

    #[test]
    fn test_recompute_stats_clamps_health() {
        let mut unit = Unit::new(1, "grunt", Team::Player, Vec2Fixed::ZERO, BaseStats::new(fx(100.0), fx(10.0)));
        unit.modifiers.push(ActiveModifier::permanent(
            Modifier::new("hp", StatTarget::MaxHealth, ModifierKind::Multiply, fx(0.5)),
            ModifierSource::Debuff,
            "curse",
        ));
        unit.recompute_stats();
        assert_eq!(unit.stats.max_health, fx(50.0));
        assert_eq!(unit.health.current, fx(50.0));
        assert!(unit.is_alive());
    }
}
