//! Base and computed unit statistics.
//!
//! [`BaseStats`] comes straight from a unit definition and never changes.
//! [`ComputedStats`] is the result of folding every active modifier into the
//! base values and is recomputed whenever the modifier list changes.

use serde::{Deserialize, Serialize};

use crate::math::{decimal_serde, Fixed};
use crate::modifiers::{
    calculate_modified_stat, group_modifiers_by_target, ActiveModifier, AttackMode, AttackStat,
    StatTarget,
};

/// Parameters of a single attack mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackProfile {
    /// Damage per attack.
    #[serde(with = "decimal_serde")]
    pub damage: Fixed,
    /// Maximum reach, center to center.
    #[serde(with = "decimal_serde")]
    pub range: Fixed,
    /// Attacks per second. Zero disables the attack.
    #[serde(with = "decimal_serde")]
    pub attack_speed: Fixed,
    /// Projectile travel speed; zero resolves the hit instantly.
    #[serde(with = "decimal_serde", default = "default_projectile_speed")]
    pub projectile_speed: Fixed,
}

const fn default_projectile_speed() -> Fixed {
    Fixed::ZERO
}

impl AttackProfile {
    /// Create an instant-hit attack profile.
    #[must_use]
    pub const fn new(damage: Fixed, range: Fixed, attack_speed: Fixed) -> Self {
        Self {
            damage,
            range,
            attack_speed,
            projectile_speed: Fixed::ZERO,
        }
    }

    /// Builder method to fire projectiles at the given speed.
    #[must_use]
    pub const fn with_projectile_speed(mut self, speed: Fixed) -> Self {
        self.projectile_speed = speed;
        self
    }

    /// Read one field.
    #[must_use]
    pub const fn get(&self, stat: AttackStat) -> Fixed {
        match stat {
            AttackStat::Damage => self.damage,
            AttackStat::Range => self.range,
            AttackStat::AttackSpeed => self.attack_speed,
        }
    }

    /// Seconds between attacks, or `None` if the attack is disabled.
    #[must_use]
    pub fn cooldown(&self) -> Option<Fixed> {
        if self.attack_speed <= Fixed::ZERO {
            return None;
        }
        Fixed::ONE.checked_div(self.attack_speed)
    }

    fn set(&mut self, stat: AttackStat, value: Fixed) {
        match stat {
            AttackStat::Damage => self.damage = value,
            AttackStat::Range => self.range = value,
            AttackStat::AttackSpeed => self.attack_speed = value,
        }
    }
}

/// Definition-time statistics of a unit type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseStats {
    /// Maximum health.
    #[serde(with = "decimal_serde")]
    pub max_health: Fixed,
    /// Movement speed in world units per second.
    #[serde(with = "decimal_serde")]
    pub move_speed: Fixed,
    /// Flat damage reduction.
    #[serde(with = "decimal_serde", default = "default_armor")]
    pub armor: Fixed,
    /// Melee attack, if the unit has one.
    #[serde(default)]
    pub melee: Option<AttackProfile>,
    /// Ranged attack, if the unit has one.
    #[serde(default)]
    pub ranged: Option<AttackProfile>,
}

const fn default_armor() -> Fixed {
    Fixed::ZERO
}

impl BaseStats {
    /// Create base stats without any attack.
    #[must_use]
    pub const fn new(max_health: Fixed, move_speed: Fixed) -> Self {
        Self {
            max_health,
            move_speed,
            armor: Fixed::ZERO,
            melee: None,
            ranged: None,
        }
    }

    /// Builder method to set armor.
    #[must_use]
    pub const fn with_armor(mut self, armor: Fixed) -> Self {
        self.armor = armor;
        self
    }

    /// Builder method to add a melee attack.
    #[must_use]
    pub const fn with_melee(mut self, profile: AttackProfile) -> Self {
        self.melee = Some(profile);
        self
    }

    /// Builder method to add a ranged attack.
    #[must_use]
    pub const fn with_ranged(mut self, profile: AttackProfile) -> Self {
        self.ranged = Some(profile);
        self
    }

    /// Base value for a stat target. Missing attack modes read as zero.
    #[must_use]
    pub fn value_of(&self, target: StatTarget) -> Fixed {
        stat_value(
            self.max_health,
            self.move_speed,
            self.armor,
            self.melee.as_ref(),
            self.ranged.as_ref(),
            target,
        )
    }
}

/// Statistics after modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedStats {
    /// Maximum health.
    #[serde(with = "decimal_serde")]
    pub max_health: Fixed,
    /// Movement speed.
    #[serde(with = "decimal_serde")]
    pub move_speed: Fixed,
    /// Flat damage reduction.
    #[serde(with = "decimal_serde")]
    pub armor: Fixed,
    /// Melee attack after modifiers.
    pub melee: Option<AttackProfile>,
    /// Ranged attack after modifiers.
    pub ranged: Option<AttackProfile>,
}

impl ComputedStats {
    /// Computed stats with no modifiers applied.
    #[must_use]
    pub fn from_base(base: &BaseStats) -> Self {
        Self {
            max_health: base.max_health,
            move_speed: base.move_speed,
            armor: base.armor,
            melee: base.melee,
            ranged: base.ranged,
        }
    }

    /// Read a stat by target.
    #[must_use]
    pub fn get(&self, target: StatTarget) -> Fixed {
        stat_value(
            self.max_health,
            self.move_speed,
            self.armor,
            self.melee.as_ref(),
            self.ranged.as_ref(),
            target,
        )
    }

    /// The attack profile for a mode.
    #[must_use]
    pub const fn attack(&self, mode: AttackMode) -> Option<&AttackProfile> {
        match mode {
            AttackMode::Melee => self.melee.as_ref(),
            AttackMode::Ranged => self.ranged.as_ref(),
        }
    }

    /// Longest reach among the unit's attacks.
    #[must_use]
    pub fn max_attack_range(&self) -> Fixed {
        let melee = self.melee.map_or(Fixed::ZERO, |p| p.range);
        let ranged = self.ranged.map_or(Fixed::ZERO, |p| p.range);
        melee.max(ranged)
    }

    fn attack_mut(&mut self, mode: AttackMode) -> Option<&mut AttackProfile> {
        match mode {
            AttackMode::Melee => self.melee.as_mut(),
            AttackMode::Ranged => self.ranged.as_mut(),
        }
    }
}

fn stat_value(
    max_health: Fixed,
    move_speed: Fixed,
    armor: Fixed,
    melee: Option<&AttackProfile>,
    ranged: Option<&AttackProfile>,
    target: StatTarget,
) -> Fixed {
    match target.attack_field() {
        None => match target {
            StatTarget::MaxHealth => max_health,
            StatTarget::MoveSpeed => move_speed,
            _ => armor,
        },
        Some((AttackMode::Melee, stat)) => melee.map_or(Fixed::ZERO, |p| p.get(stat)),
        Some((AttackMode::Ranged, stat)) => ranged.map_or(Fixed::ZERO, |p| p.get(stat)),
    }
}

/// Fold modifiers into base stats.
///
/// Modifiers are grouped by target once; each target then runs through the
/// modifier calculator. Modifiers on an attack mode the unit lacks have no
/// effect, and attack profiles only appear when present in the base.
pub fn compute_all_stats<'a>(
    base: &BaseStats,
    modifiers: impl IntoIterator<Item = &'a ActiveModifier>,
) -> ComputedStats {
    let grouped = group_modifiers_by_target(modifiers);
    let mut computed = ComputedStats::from_base(base);

    for (target, mods) in &grouped {
        let value = calculate_modified_stat(base.value_of(*target), mods.iter().copied()).final_value;
        match target.attack_field() {
            Some((mode, stat)) => {
                if let Some(profile) = computed.attack_mut(mode) {
                    profile.set(stat, value);
                }
            }
            None => match target {
                StatTarget::MaxHealth => computed.max_health = value,
                StatTarget::MoveSpeed => computed.move_speed = value,
                _ => computed.armor = value,
            },
        }
    }

    computed
}

/// Damage left after armor, never below 1.
#[must_use]
pub fn calculate_damage_after_armor(damage: Fixed, armor: Fixed) -> Fixed {
    damage.saturating_sub(armor).max(Fixed::ONE)
}
