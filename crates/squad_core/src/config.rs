//! Battle tuning parameters.

use serde::{Deserialize, Serialize};

use crate::components::Team;
use crate::math::{decimal_serde, Fixed, Vec2Fixed};

/// Circular terrain blocker units steer around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Center X.
    #[serde(with = "decimal_serde")]
    pub x: Fixed,
    /// Center Y.
    #[serde(with = "decimal_serde")]
    pub y: Fixed,
    /// Blocking radius.
    #[serde(with = "decimal_serde")]
    pub radius: Fixed,
}

impl Obstacle {
    /// Center as a vector.
    #[must_use]
    pub const fn center(&self) -> Vec2Fixed {
        Vec2Fixed::new(self.x, self.y)
    }
}

/// Configuration for a battle.
///
/// Every field has a default, so a config file only needs the values it
/// overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Arena extent along x; the player side starts at 0.
    #[serde(with = "decimal_serde")]
    pub arena_width: Fixed,
    /// Arena extent along y.
    #[serde(with = "decimal_serde")]
    pub arena_height: Fixed,
    /// Radius within which units acquire targets.
    #[serde(with = "decimal_serde")]
    pub aggro_radius: Fixed,
    /// Aggro radius once deep in enemy territory.
    #[serde(with = "decimal_serde")]
    pub deep_aggro_radius: Fixed,
    /// Fraction of the arena width, measured from a team's own edge, past
    /// which a unit counts as deep in enemy territory.
    #[serde(with = "decimal_serde")]
    pub deep_territory_fraction: Fixed,
    /// Enemies this close to a ranged attacker force the engaged penalty.
    #[serde(with = "decimal_serde")]
    pub engagement_radius: Fixed,
    /// Damage factor for ranged attacks while engaged.
    #[serde(with = "decimal_serde")]
    pub ranged_engaged_penalty: Fixed,
    /// Collision radius of a unit.
    #[serde(with = "decimal_serde")]
    pub unit_radius: Fixed,
    /// Share of an overlap resolved per tick by avoidance.
    #[serde(with = "decimal_serde")]
    pub separation_factor: Fixed,
    /// Terrain blockers.
    pub obstacles: Vec<Obstacle>,
    /// Upper bound on a single tick's delta, in seconds.
    #[serde(with = "decimal_serde")]
    pub max_tick_delta: Fixed,
    /// Seed for the battle RNG.
    pub seed: u64,
    /// Default range for nearby target selectors.
    #[serde(with = "decimal_serde")]
    pub nearby_range: Fixed,
    /// Hit flash duration in seconds.
    #[serde(with = "decimal_serde")]
    pub hit_flash_duration: Fixed,
    /// Attack flash duration in seconds.
    #[serde(with = "decimal_serde")]
    pub attack_flash_duration: Fixed,
    /// Maximum shockwave lifetime in seconds.
    #[serde(with = "decimal_serde")]
    pub shockwave_lifetime: Fixed,
    /// Currency awarded for winning a wave.
    pub wave_reward: u64,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            arena_width: Fixed::from_num(1600),
            arena_height: Fixed::from_num(600),
            aggro_radius: Fixed::from_num(250),
            deep_aggro_radius: Fixed::from_num(600),
            deep_territory_fraction: Fixed::from_num(0.6),
            engagement_radius: Fixed::from_num(40),
            ranged_engaged_penalty: Fixed::from_num(0.5),
            unit_radius: Fixed::from_num(12),
            separation_factor: Fixed::from_num(0.5),
            obstacles: Vec::new(),
            max_tick_delta: Fixed::from_num(0.1),
            seed: 0x5EED,
            nearby_range: Fixed::from_num(150),
            hit_flash_duration: Fixed::from_num(0.15),
            attack_flash_duration: Fixed::from_num(0.1),
            shockwave_lifetime: Fixed::from_num(2),
            wave_reward: 100,
        }
    }
}

impl BattleConfig {
    /// Builder method to set the RNG seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder method to add a terrain blocker.
    #[must_use]
    pub fn with_obstacle(mut self, obstacle: Obstacle) -> Self {
        self.obstacles.push(obstacle);
        self
    }

    /// Lower arena corner.
    #[must_use]
    pub const fn arena_min(&self) -> Vec2Fixed {
        Vec2Fixed::ZERO
    }

    /// Upper arena corner.
    #[must_use]
    pub const fn arena_max(&self) -> Vec2Fixed {
        Vec2Fixed::new(self.arena_width, self.arena_height)
    }

    /// Clamp a position into the arena.
    #[must_use]
    pub fn clamp_to_arena(&self, position: Vec2Fixed) -> Vec2Fixed {
        position.clamp(self.arena_min(), self.arena_max())
    }

    /// Check whether a unit at `position` is deep in enemy territory.
    #[must_use]
    pub fn is_deep_in_enemy_territory(&self, team: Team, position: Vec2Fixed) -> bool {
        let depth = self.arena_width.saturating_mul(self.deep_territory_fraction);
        match team {
            Team::Player => position.x > depth,
            Team::Enemy => position.x < self.arena_width - depth,
        }
    }

    /// Aggro radius for a unit of `team` at `position`.
    #[must_use]
    pub fn aggro_radius_at(&self, team: Team, position: Vec2Fixed) -> Fixed {
        if self.is_deep_in_enemy_territory(team, position) {
            self.deep_aggro_radius.max(self.aggro_radius)
        } else {
            self.aggro_radius
        }
    }
}
