//! Battle scenarios exercising the engine end to end.
//!
//! Most scenarios run on the shipped sample data; the small ones build
//! their registries inline so the numbers are easy to follow.

use squad_core::abilities::{
    AbilityDefinition, AbilityEffect, AbilityProcessor, AbilityRegistry, AbilityTrigger,
    CooldownMap, EffectKind, TargetSelector, TriggerContext, TriggerKind,
};
use squad_core::components::Team;
use squad_core::config::BattleConfig;
use squad_core::data::{GameData, UnitDefinition};
use squad_core::engine::{BattleEngine, BattleOutcome};
use squad_core::error::GameError;
use squad_core::math::{Fixed, Vec2Fixed};
use squad_core::modifiers::{ActiveModifier, Modifier, ModifierKind, ModifierSource, StatTarget};
use squad_core::progress::{load_progress, save_progress, MemoryProgressStore, PlayerProgress};
use squad_core::rng::BattleRng;
use squad_core::snapshot::{BattleView, UnitSnapshot};
use squad_core::stats::BaseStats;
use squad_core::upgrades::{
    MissingPrerequisite, Prerequisite, PrerequisiteContext, PrerequisiteKind, PurchaseBlock,
    UpgradeDefinition, UpgradeEffect, UpgradeRegistry, UpgradeScope,
};
use squad_test_utils::fixtures::{
    at, fixed, fixed_f, run_until_decided, sample_game_data, test_config, STEP,
};

fn snapshot(id: u64, team: Team, x: i32) -> UnitSnapshot {
    UnitSnapshot {
        id,
        team,
        position: Vec2Fixed::from_ints(x, 300),
        health: fixed(100),
        max_health: fixed(100),
        armor: Fixed::ZERO,
        is_structure: false,
    }
}

// =============================================================================
// Stats through the engine
// =============================================================================

#[test]
fn test_upgrade_and_timed_debuff_on_max_health() {
    let recruit = UnitDefinition::new("recruit", "melee", BaseStats::new(fixed(100), Fixed::ZERO));
    let vigor = UpgradeDefinition::new(
        "vigor",
        UpgradeScope::Global,
        UpgradeEffect::StatModifier {
            modifiers: vec![Modifier::new("vigor", StatTarget::MaxHealth, ModifierKind::Flat, fixed(50))],
        },
        10,
    );
    let data = GameData::from_definitions_validated([recruit], [], [vigor]).unwrap();

    let mut config = BattleConfig::default();
    config.max_tick_delta = fixed_f(0.5);
    let mut engine =
        BattleEngine::new(data, config).with_progress(PlayerProgress::new().with_currency(10));
    assert!(engine.purchase_upgrade("vigor"));

    let id = engine.spawn_unit("recruit", Team::Player, at(200, 300)).unwrap();
    assert_eq!(engine.unit(id).unwrap().stats.max_health, fixed(150));

    let curse = ActiveModifier::temporary(
        Modifier::new("curse", StatTarget::MaxHealth, ModifierKind::Multiply, fixed_f(1.5)),
        ModifierSource::Debuff,
        "hex",
        fixed(2),
    );
    engine.add_modifier(id, curse).unwrap();
    assert_eq!(engine.unit(id).unwrap().stats.max_health, fixed(225));

    engine.start();
    for _ in 0..3 {
        engine.tick(fixed_f(0.5));
    }
    assert_eq!(engine.unit(id).unwrap().stats.max_health, fixed(225));

    engine.tick(fixed_f(0.5));
    let unit = engine.unit(id).unwrap();
    assert_eq!(unit.stats.max_health, fixed(150));
    assert!(unit.modifiers.iter().all(|m| m.source_id != "hex"));
}

// =============================================================================
// Ability processing
// =============================================================================

#[test]
fn test_knockback_on_take_damage_targets_attacker() {
    let mut registry = AbilityRegistry::new();
    registry
        .register(
            AbilityDefinition::new("repel", AbilityTrigger::new(TriggerKind::OnTakeDamage)).with_effect(
                AbilityEffect::new(EffectKind::Knockback { distance: fixed(40) }, TargetSelector::Attacker),
            ),
        )
        .unwrap();

    let units = vec![snapshot(1, Team::Player, 100), snapshot(2, Team::Enemy, 130)];
    let view = BattleView::new(&units);
    let context = TriggerContext::new().with_attacker(2).with_damage(fixed(12));

    let results = AbilityProcessor::new(&registry).process_trigger(
        1,
        &["repel".to_string()],
        &CooldownMap::new(),
        TriggerKind::OnTakeDamage,
        &context,
        &view,
        &mut BattleRng::new(1),
    );

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].effects.len(), 1);
    assert_eq!(results[0].effects[0].target_unit_ids, vec![2]);
}

// =============================================================================
// Upgrade purchase checks
// =============================================================================

fn two_tier_upgrades() -> UpgradeRegistry {
    let mut registry = UpgradeRegistry::new();
    let grant = |id: &str| UpgradeEffect::AbilityGrant { ability_id: id.to_string() };
    registry
        .register(UpgradeDefinition::new("a", UpgradeScope::Global, grant("x"), 10))
        .unwrap();
    registry
        .register(
            UpgradeDefinition::new("b", UpgradeScope::Global, grant("y"), 10).with_prerequisite(
                Prerequisite::Upgrade {
                    upgrade_id: "a".into(),
                    level: 2,
                },
            ),
        )
        .unwrap();
    registry
}

#[test]
fn test_base_cost_with_no_currency() {
    let check = two_tier_upgrades()
        .calculate_cost("a", 0, &PrerequisiteContext::new(), 0)
        .unwrap();
    assert_eq!(check.cost, 10);
    assert!(!check.can_purchase);
    assert_eq!(check.reason, Some(PurchaseBlock::InsufficientFunds));
}

#[test]
fn test_prerequisite_level_not_met_regardless_of_currency() {
    let ctx = PrerequisiteContext::new().with_upgrade_level("a", 1);
    let check = two_tier_upgrades().calculate_cost("b", 0, &ctx, 1_000_000).unwrap();

    assert!(!check.can_purchase);
    assert_eq!(check.reason, Some(PurchaseBlock::PrerequisiteNotMet));
    assert_eq!(
        check.missing_prerequisite,
        Some(MissingPrerequisite {
            kind: PrerequisiteKind::Upgrade,
            target_id: Some("a".into()),
            required: 2,
            current: 1,
        })
    );
}

#[test]
fn test_unknown_upgrade_is_an_error() {
    let result = two_tier_upgrades().calculate_cost("zzz", 0, &PrerequisiteContext::new(), 0);
    assert!(matches!(result, Err(GameError::UnknownUpgrade(_))));
}

// =============================================================================
// Sample data battles
// =============================================================================

#[test]
fn test_sample_purchases_follow_cost_curve() {
    let mut engine = BattleEngine::new(sample_game_data(), test_config(1))
        .with_progress(PlayerProgress::new().with_currency(1000));

    assert_eq!(engine.cost_check("toughness").unwrap().cost, 100);
    assert!(engine.purchase_upgrade("toughness"));
    assert_eq!(engine.cost_check("toughness").unwrap().cost, 115);
    assert_eq!(engine.progress().currency, 900);

    // Requires sharpened_blades at level 2.
    assert!(!engine.purchase_upgrade("war_cry"));
    let check = engine.cost_check("war_cry").unwrap();
    assert_eq!(check.reason, Some(PurchaseBlock::PrerequisiteNotMet));

    // Requires wave 2.
    assert!(!engine.purchase_upgrade("long_bows"));
    assert_eq!(engine.progress().currency, 900);

    let id = engine.spawn_unit("soldier", Team::Player, at(300, 300)).unwrap();
    let max_health = engine.unit(id).unwrap().stats.max_health;
    assert!((max_health - fixed(110)).abs() < fixed_f(0.001), "{max_health}");
}

#[test]
fn test_shaman_summons_linked_imps() {
    let mut engine = BattleEngine::new(sample_game_data(), test_config(2));
    let shaman = engine.spawn_unit("shaman", Team::Player, at(200, 300)).unwrap();
    engine.start();

    let events = engine.tick(STEP);

    // The shaman's deferred spawn is reported first, then its imps.
    assert_eq!(events.spawned.len(), 3);
    assert_eq!(events.spawned[0], shaman);
    assert_eq!(engine.living_count(Team::Player), 3);
    for imp in &events.spawned[1..] {
        let unit = engine.unit(*imp).unwrap();
        assert_eq!(unit.unit_type, "imp");
        assert_eq!(unit.linked_to, Some(shaman));
    }
    assert!(events.abilities.iter().any(|a| a.ability_id == "summon_imps"));
}

#[test]
fn test_ogre_quake_creates_shockwave() {
    let mut engine = BattleEngine::new(sample_game_data(), test_config(3));
    engine.spawn_unit("ogre", Team::Enemy, at(1200, 300)).unwrap();
    engine.start();

    let events = engine.tick(STEP);
    assert!(events.abilities.iter().any(|a| a.ability_id == "quake"));
    assert_eq!(engine.shockwaves().len(), 1);
    assert_eq!(engine.shockwaves()[0].team, Team::Enemy);

    // The interval keeps it quiet for a while.
    let later = engine.tick(STEP);
    assert!(later.abilities.iter().all(|a| a.ability_id != "quake"));
}

#[test]
fn test_towers_cannot_be_moved() {
    let mut engine = BattleEngine::new(sample_game_data(), test_config(4));
    let tower = engine.spawn_unit("tower", Team::Enemy, at(1400, 300)).unwrap();
    let soldier = engine.spawn_unit("soldier", Team::Player, at(100, 300)).unwrap();

    assert!(matches!(
        engine.move_unit(tower, at(1000, 300)),
        Err(GameError::ImmovableUnit(id)) if id == tower
    ));
    assert!(engine.move_unit(soldier, at(150, 200)).is_ok());
    assert_eq!(engine.unit(soldier).unwrap().position, at(150, 200));
}

#[test]
fn test_victory_awards_wave_and_persists() {
    let mut engine = BattleEngine::new(sample_game_data(), test_config(5));
    engine.set_wave(3);
    engine.spawn_unit("knight", Team::Player, at(760, 300)).unwrap();
    engine.spawn_unit("imp", Team::Enemy, at(840, 300)).unwrap();
    engine.start();

    let outcome = run_until_decided(&mut engine, 2_000, STEP);
    assert_eq!(outcome, Some(BattleOutcome::Victory));
    assert!(!engine.is_running());
    assert_eq!(engine.progress().highest_wave, 3);
    assert_eq!(engine.progress().currency, engine.config().wave_reward);

    let mut store = MemoryProgressStore::new();
    save_progress(&mut store, engine.progress()).unwrap();
    let loaded = load_progress(&store);
    assert_eq!(&loaded, engine.progress());

    // A decided battle stays put.
    let tick = engine.tick_count();
    engine.start();
    engine.tick(STEP);
    assert_eq!(engine.tick_count(), tick);
}

#[test]
fn test_reset_clears_battlefield_and_keeps_progress() {
    let mut engine = BattleEngine::new(sample_game_data(), test_config(6))
        .with_progress(PlayerProgress::new().with_currency(500));
    engine.spawn_unit("soldier", Team::Player, at(100, 300)).unwrap();
    engine.start();
    engine.tick(STEP);

    engine.reset();
    assert!(engine.unit_ids().is_empty());
    assert_eq!(engine.tick_count(), 0);
    assert!(!engine.is_running());
    assert_eq!(engine.progress().currency, 500);
}
