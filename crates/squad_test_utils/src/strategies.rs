//! Proptest strategies.
//!
//! These strategies generate random but reproducible inputs for
//! property-based testing of stat math, costs and battle setup.

use proptest::prelude::*;
use squad_core::components::Team;
use squad_core::math::{Fixed, Vec2Fixed};
use squad_core::modifiers::{Modifier, ModifierKind, StatTarget};
use squad_core::stats::{AttackProfile, BaseStats};

/// Generate a fixed-point number with quarter precision in `[lo, hi)`.
pub fn arb_fixed_quarters(lo: i32, hi: i32) -> impl Strategy<Value = Fixed> {
    (lo * 4..hi * 4).prop_map(|q| Fixed::from_num(q) / 4)
}

/// Generate a base stat value (1 to 500).
pub fn arb_stat_value() -> impl Strategy<Value = Fixed> {
    arb_fixed_quarters(1, 500)
}

/// Generate any stat target.
pub fn arb_stat_target() -> impl Strategy<Value = StatTarget> {
    proptest::sample::select(StatTarget::ALL.to_vec())
}

/// Generate a modifier kind.
pub fn arb_modifier_kind() -> impl Strategy<Value = ModifierKind> {
    prop_oneof![
        Just(ModifierKind::Flat),
        Just(ModifierKind::Percent),
        Just(ModifierKind::Multiply),
    ]
}

/// Generate a modifier with a value suited to its kind.
///
/// Flat: -50 to 50. Percent: -0.5 to 0.75. Multiply: 0.25 to 2.0.
pub fn arb_modifier() -> impl Strategy<Value = Modifier> {
    (
        arb_stat_target(),
        arb_modifier_kind(),
        0u32..1000,
        proptest::option::of(proptest::sample::select(vec!["aura", "potion", "banner"])),
    )
        .prop_flat_map(|(target, kind, n, group)| {
            let value = match kind {
                ModifierKind::Flat => arb_fixed_quarters(-50, 50).boxed(),
                ModifierKind::Percent => (-2i32..4).prop_map(|q| Fixed::from_num(q) / 4).boxed(),
                ModifierKind::Multiply => (1i32..9).prop_map(|q| Fixed::from_num(q) / 4).boxed(),
            };
            value.prop_map(move |value| {
                let modifier = Modifier::new(format!("mod_{n}"), target, kind, value);
                match group {
                    Some(g) => modifier.in_group(g),
                    None => modifier,
                }
            })
        })
}

/// Generate a list of modifiers.
pub fn arb_modifier_list(max_len: usize) -> impl Strategy<Value = Vec<Modifier>> {
    proptest::collection::vec(arb_modifier(), 0..max_len)
}

/// Generate an attack profile.
pub fn arb_attack_profile() -> impl Strategy<Value = AttackProfile> {
    (arb_fixed_quarters(1, 50), arb_fixed_quarters(10, 250), arb_fixed_quarters(1, 3))
        .prop_map(|(damage, range, speed)| AttackProfile::new(damage, range, speed))
}

/// Generate base stats with optional attack modes.
pub fn arb_base_stats() -> impl Strategy<Value = BaseStats> {
    (
        arb_stat_value(),
        arb_fixed_quarters(0, 80),
        arb_fixed_quarters(0, 20),
        proptest::option::of(arb_attack_profile()),
        proptest::option::of(arb_attack_profile()),
    )
        .prop_map(|(max_health, move_speed, armor, melee, ranged)| {
            let mut stats = BaseStats::new(max_health, move_speed).with_armor(armor);
            stats.melee = melee;
            stats.ranged = ranged;
            stats
        })
}

/// Generate a position inside the default arena (1600 x 600).
pub fn arb_arena_position() -> impl Strategy<Value = Vec2Fixed> {
    (0i32..1600, 0i32..600).prop_map(|(x, y)| Vec2Fixed::from_ints(x, y))
}

/// Generate a team.
pub fn arb_team() -> impl Strategy<Value = Team> {
    prop_oneof![Just(Team::Player), Just(Team::Enemy)]
}

/// Parameters for spawning a unit from the sample data.
#[derive(Debug, Clone)]
pub struct SpawnParams {
    /// Unit definition id.
    pub unit_type: &'static str,
    /// Owning team.
    pub team: Team,
    /// Spawn position.
    pub position: Vec2Fixed,
}

/// Generate spawn parameters over the sample unit types.
pub fn arb_spawn_params() -> impl Strategy<Value = SpawnParams> {
    (
        proptest::sample::select(vec!["soldier", "knight", "archer", "shaman", "ogre", "tower"]),
        arb_team(),
        arb_arena_position(),
    )
        .prop_map(|(unit_type, team, position)| SpawnParams {
            unit_type,
            team,
            position,
        })
}

/// Generate a list of spawns.
pub fn arb_spawn_list(max_units: usize) -> impl Strategy<Value = Vec<SpawnParams>> {
    proptest::collection::vec(arb_spawn_params(), 1..max_units)
}
