//! Read-only views of battle state.
//!
//! [`BattleView`] is the per-pass snapshot the behavior systems and the
//! ability processor read from. [`BattleSnapshot`] is the richer,
//! serializable view handed to renderers and tools.

use serde::{Deserialize, Serialize};

use crate::components::{EffectId, Team, Unit, UnitId};
use crate::engine::BattleOutcome;
use crate::math::{decimal_serde, Fixed, Vec2Fixed};

/// Minimal per-unit data needed by systems and abilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSnapshot {
    /// Unit identifier.
    pub id: UnitId,
    /// Owning team.
    pub team: Team,
    /// Position at snapshot time.
    pub position: Vec2Fixed,
    /// Current health.
    pub health: Fixed,
    /// Maximum health.
    pub max_health: Fixed,
    /// Armor after modifiers.
    pub armor: Fixed,
    /// Structures are immovable and only targeted as a fallback.
    pub is_structure: bool,
}

impl UnitSnapshot {
    /// Capture a unit.
    #[must_use]
    pub fn of(unit: &Unit) -> Self {
        Self {
            id: unit.id,
            team: unit.team,
            position: unit.position,
            health: unit.health.current,
            max_health: unit.health.max,
            armor: unit.stats.armor,
            is_structure: unit.is_structure(),
        }
    }

    /// Check whether the unit is alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health > Fixed::ZERO
    }

    /// Current health as a fraction of maximum.
    #[must_use]
    pub fn health_ratio(&self) -> Fixed {
        if self.max_health <= Fixed::ZERO {
            return Fixed::ZERO;
        }
        self.health.checked_div(self.max_health).unwrap_or(Fixed::ZERO)
    }
}

/// Borrowed snapshot of every unit, sorted by id.
#[derive(Debug, Clone, Copy)]
pub struct BattleView<'a> {
    units: &'a [UnitSnapshot],
}

impl<'a> BattleView<'a> {
    /// Wrap a slice of snapshots. The slice must be sorted by id.
    #[must_use]
    pub const fn new(units: &'a [UnitSnapshot]) -> Self {
        Self { units }
    }

    /// Look up a unit, dead or alive.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&'a UnitSnapshot> {
        self.units
            .binary_search_by_key(&id, |u| u.id)
            .ok()
            .map(|index| &self.units[index])
    }

    /// Look up a living unit.
    #[must_use]
    pub fn get_alive(&self, id: UnitId) -> Option<&'a UnitSnapshot> {
        self.get(id).filter(|u| u.is_alive())
    }

    /// Every unit, dead or alive, in id order.
    pub fn all(&self) -> impl Iterator<Item = &'a UnitSnapshot> + 'a {
        self.units.iter()
    }

    /// Living units in id order.
    pub fn alive(&self) -> impl Iterator<Item = &'a UnitSnapshot> + 'a {
        self.units.iter().filter(|u| u.is_alive())
    }

    /// Living units on `team`.
    pub fn alive_on(&self, team: Team) -> impl Iterator<Item = &'a UnitSnapshot> + 'a {
        self.alive().filter(move |u| u.team == team)
    }
}

// ============================================================================
// Renderer-facing snapshot
// ============================================================================

/// Unit as seen by a renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitView {
    /// Unit identifier.
    pub id: UnitId,
    /// Definition id.
    pub unit_type: String,
    /// Owning team.
    pub team: Team,
    /// X position.
    #[serde(with = "decimal_serde")]
    pub x: Fixed,
    /// Y position.
    #[serde(with = "decimal_serde")]
    pub y: Fixed,
    /// Current health.
    #[serde(with = "decimal_serde")]
    pub health: Fixed,
    /// Maximum health.
    #[serde(with = "decimal_serde")]
    pub max_health: Fixed,
    /// Current target.
    pub target: Option<UnitId>,
    /// Structure flag.
    pub is_structure: bool,
    /// Selected by the player.
    pub selected: bool,
    /// Remaining hit flash.
    #[serde(with = "decimal_serde")]
    pub hit_flash: Fixed,
    /// Remaining attack flash.
    #[serde(with = "decimal_serde")]
    pub attack_flash: Fixed,
    /// Ids of active modifiers.
    pub modifiers: Vec<String>,
}

/// Projectile as seen by a renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileView {
    /// Projectile identifier.
    pub id: EffectId,
    /// Shooter team.
    pub team: Team,
    /// X position.
    #[serde(with = "decimal_serde")]
    pub x: Fixed,
    /// Y position.
    #[serde(with = "decimal_serde")]
    pub y: Fixed,
}

/// Shockwave as seen by a renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShockwaveView {
    /// Shockwave identifier.
    pub id: EffectId,
    /// Creator team.
    pub team: Team,
    /// Center X.
    #[serde(with = "decimal_serde")]
    pub x: Fixed,
    /// Center Y.
    #[serde(with = "decimal_serde")]
    pub y: Fixed,
    /// Current radius.
    #[serde(with = "decimal_serde")]
    pub radius: Fixed,
}

/// Complete read-only view of a battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleSnapshot {
    /// Ticks simulated.
    pub tick: u64,
    /// Battle time in seconds.
    #[serde(with = "decimal_serde")]
    pub elapsed: Fixed,
    /// Whether the engine is advancing.
    pub running: bool,
    /// Current wave number.
    pub wave: u32,
    /// Result, once decided.
    pub outcome: Option<BattleOutcome>,
    /// Units in id order.
    pub units: Vec<UnitView>,
    /// Projectiles in flight.
    pub projectiles: Vec<ProjectileView>,
    /// Active shockwaves.
    pub shockwaves: Vec<ShockwaveView>,
    /// Selected unit ids.
    pub selected: Vec<UnitId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(id: UnitId, team: Team, health: i32) -> UnitSnapshot {
        UnitSnapshot {
            id,
            team,
            position: Vec2Fixed::ZERO,
            health: Fixed::from_num(health),
            max_health: Fixed::from_num(100),
            armor: Fixed::ZERO,
            is_structure: false,
        }
    }

    #[test]
    fn test_view_lookup() {
        let units = vec![snap(1, Team::Player, 50), snap(4, Team::Enemy, 0), snap(9, Team::Enemy, 10)];
        let view = BattleView::new(&units);
        assert!(view.get(4).is_some());
        assert!(view.get_alive(4).is_none());
        assert!(view.get(5).is_none());
        assert_eq!(view.alive_on(Team::Enemy).count(), 1);
    }

    #[test]
    fn test_health_ratio() {
        let unit = snap(1, Team::Player, 50);
        assert_eq!(unit.health_ratio(), Fixed::from_num(0.5));
    }
}
