//! Test fixtures and helpers.
//!
//! Sample registries and pre-built battles for consistent testing.
//! The sample data is the same RON shipped under `assets/data`.

use fixed::types::I32F32;
use squad_core::prelude::*;
use squad_core::stats::AttackProfile;

/// Unit definitions shipped with the game.
pub const UNITS_RON: &str = include_str!("../../../assets/data/units.ron");

/// Ability definitions shipped with the game.
pub const ABILITIES_RON: &str = include_str!("../../../assets/data/abilities.ron");

/// Upgrade definitions shipped with the game.
pub const UPGRADES_RON: &str = include_str!("../../../assets/data/upgrades.ron");

/// A tick length that is exact in fixed-point (1/16 s).
pub const STEP: I32F32 = I32F32::from_bits(1 << 28);

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Shorthand for an integer position.
#[must_use]
pub fn at(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::from_ints(x, y)
}

/// Parse and validate the shipped sample data.
///
/// # Panics
///
/// Panics if the shipped RON files no longer parse or validate.
#[must_use]
pub fn sample_game_data() -> GameData {
    let units: Vec<UnitDefinition> = ron::from_str(UNITS_RON).expect("units.ron should parse");
    let abilities: Vec<AbilityDefinition> =
        ron::from_str(ABILITIES_RON).expect("abilities.ron should parse");
    let upgrades: Vec<UpgradeDefinition> =
        ron::from_str(UPGRADES_RON).expect("upgrades.ron should parse");
    GameData::from_definitions_validated(units, abilities, upgrades)
        .expect("sample data should validate")
}

/// A plain melee definition: 100 health, speed 40, 10 damage at range 30.
#[must_use]
pub fn grunt_definition(id: &str) -> UnitDefinition {
    UnitDefinition::new(
        id,
        "melee",
        BaseStats::new(fixed(100), fixed(40))
            .with_melee(AttackProfile::new(fixed(10), fixed(30), I32F32::ONE)),
    )
}

/// A stationary target with no attacks.
#[must_use]
pub fn dummy_definition(id: &str, health: i32) -> UnitDefinition {
    UnitDefinition::new(id, "dummy", BaseStats::new(fixed(health), I32F32::ZERO))
}

/// Registry with a grunt and a training dummy.
///
/// # Panics
///
/// Panics if the definitions collide (they do not).
#[must_use]
pub fn basic_game_data() -> GameData {
    GameData::from_definitions(
        [grunt_definition("grunt"), dummy_definition("dummy", 50)],
        [],
        [],
    )
    .expect("basic data has unique ids")
}

/// Config used by fixture battles: fixed seed, roomy tick cap.
#[must_use]
pub fn test_config(seed: u64) -> BattleConfig {
    let mut config = BattleConfig::default().with_seed(seed);
    config.max_tick_delta = fixed_f(0.5);
    config
}

/// One soldier per side, facing each other across the middle.
///
/// # Panics
///
/// Panics if the sample data lacks the soldier type.
#[must_use]
pub fn duel_engine(seed: u64) -> BattleEngine {
    let mut engine = BattleEngine::new(sample_game_data(), test_config(seed));
    engine
        .spawn_unit("soldier", Team::Player, at(700, 300))
        .expect("soldier exists");
    engine
        .spawn_unit("soldier", Team::Enemy, at(900, 300))
        .expect("soldier exists");
    engine.start();
    engine
}

/// Mixed armies exercising projectiles, shockwaves, summons and auras.
///
/// # Panics
///
/// Panics if the sample data lacks one of the unit types.
#[must_use]
pub fn skirmish_engine(seed: u64) -> BattleEngine {
    let mut engine = BattleEngine::new(sample_game_data(), test_config(seed));
    let player = [
        ("soldier", at(500, 250)),
        ("soldier", at(500, 350)),
        ("knight", at(460, 300)),
        ("archer", at(380, 260)),
        ("shaman", at(380, 340)),
    ];
    let enemy = [
        ("ogre", at(1100, 300)),
        ("soldier", at(1080, 220)),
        ("archer", at(1200, 300)),
        ("tower", at(1400, 300)),
    ];
    for (unit_type, position) in player {
        engine
            .spawn_unit(unit_type, Team::Player, position)
            .expect("unit type exists");
    }
    for (unit_type, position) in enemy {
        engine
            .spawn_unit(unit_type, Team::Enemy, position)
            .expect("unit type exists");
    }
    engine.start();
    engine
}

/// Tick until the battle is decided or `max_ticks` pass.
pub fn run_until_decided(engine: &mut BattleEngine, max_ticks: u64, delta: I32F32) -> Option<BattleOutcome> {
    for _ in 0..max_ticks {
        engine.tick(delta);
        if engine.outcome().is_some() {
            break;
        }
    }
    engine.outcome()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_data_loads() {
        let data = sample_game_data();
        assert_eq!(data.units.len(), 7);
        assert!(data.abilities.contains("summon_imps"));
        assert!(data.upgrades.contains("toughness"));
        assert!(data.validate().is_empty());
    }

    #[test]
    fn test_step_is_exact() {
        assert_eq!(STEP * 16, I32F32::ONE);
    }

    #[test]
    fn test_duel_has_one_unit_per_side() {
        let engine = duel_engine(1);
        assert!(engine.is_running());
        assert_eq!(engine.living_count(Team::Player), 1);
        assert_eq!(engine.living_count(Team::Enemy), 1);
    }
}
