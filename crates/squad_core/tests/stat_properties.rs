//! Property tests for the modifier calculator, stat folding and cost curve.

use proptest::prelude::*;
use squad_core::math::Fixed;
use squad_core::modifiers::{
    calculate_modified_stat, resolve_stacking_groups, tick_modifiers, ActiveModifier, Modifier,
    ModifierKind, ModifierSource, StatTarget,
};
use squad_core::stats::{calculate_damage_after_armor, compute_all_stats, ComputedStats};
use squad_core::upgrades::upgrade_cost;
use squad_test_utils::fixtures::{fixed, fixed_f};
use squad_test_utils::strategies::{
    arb_base_stats, arb_fixed_quarters, arb_modifier, arb_modifier_list, arb_stat_value,
};

fn attach(modifiers: Vec<Modifier>) -> Vec<ActiveModifier> {
    modifiers
        .into_iter()
        .enumerate()
        .map(|(i, m)| ActiveModifier::permanent(m, ModifierSource::Buff, format!("src_{i}")))
        .collect()
}

// =============================================================================
// Modifier calculator
// =============================================================================

#[test]
fn test_stacking_group_keeps_highest() {
    let modifiers = attach(vec![
        Modifier::new("small", StatTarget::Armor, ModifierKind::Flat, fixed(10)).in_group("g"),
        Modifier::new("large", StatTarget::Armor, ModifierKind::Flat, fixed(25)).in_group("g"),
    ]);

    let resolved = resolve_stacking_groups(&modifiers);
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].modifier.value, fixed(25));
    assert_eq!(calculate_modified_stat(fixed(5), &modifiers).final_value, fixed(30));
}

#[test]
fn test_duration_one_expires_after_slightly_more() {
    let temporary = ActiveModifier::temporary(
        Modifier::new("slow", StatTarget::MoveSpeed, ModifierKind::Percent, fixed_f(-0.5)),
        ModifierSource::Debuff,
        "frost",
        Fixed::ONE,
    );
    let (remaining, expired) = tick_modifiers(vec![temporary], Fixed::ONE + Fixed::DELTA);
    assert!(remaining.is_empty());
    assert_eq!(expired.len(), 1);
}

proptest! {
    #[test]
    fn prop_flat_only_adds_up(
        base in arb_stat_value(),
        values in proptest::collection::vec(arb_fixed_quarters(-50, 50), 0..8),
    ) {
        let modifiers = attach(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| Modifier::new(format!("f{i}"), StatTarget::MaxHealth, ModifierKind::Flat, *v))
                .collect(),
        );
        let sum = values.iter().fold(Fixed::ZERO, |acc, v| acc + *v);

        let result = calculate_modified_stat(base, &modifiers);
        prop_assert_eq!(result.flat_bonus, sum);
        prop_assert_eq!(result.final_value, (base + sum).max(Fixed::ZERO));
    }

    #[test]
    fn prop_final_value_never_negative(base in arb_stat_value(), modifiers in arb_modifier_list(12)) {
        let modifiers = attach(modifiers);
        prop_assert!(calculate_modified_stat(base, &modifiers).final_value >= Fixed::ZERO);
    }

    #[test]
    fn prop_one_winner_per_group(modifiers in arb_modifier_list(12)) {
        let modifiers = attach(modifiers);
        let resolved = resolve_stacking_groups(&modifiers);

        let ungrouped_in = modifiers.iter().filter(|m| m.modifier.stacking_group.is_none()).count();
        let ungrouped_out = resolved.iter().filter(|m| m.modifier.stacking_group.is_none()).count();
        prop_assert_eq!(ungrouped_in, ungrouped_out);

        let mut groups: Vec<&str> = resolved
            .iter()
            .filter_map(|m| m.modifier.stacking_group.as_deref())
            .collect();
        let before = groups.len();
        groups.sort_unstable();
        groups.dedup();
        prop_assert_eq!(before, groups.len());

        for winner in resolved.iter().filter(|m| m.modifier.stacking_group.is_some()) {
            let best = modifiers
                .iter()
                .filter(|m| m.modifier.stacking_group == winner.modifier.stacking_group)
                .map(|m| m.modifier.value)
                .max();
            prop_assert_eq!(Some(winner.modifier.value), best);
        }
    }

    #[test]
    fn prop_tick_idempotent_at_zero(
        modifier in arb_modifier(),
        durations in proptest::collection::vec(arb_fixed_quarters(1, 20), 1..6),
    ) {
        let list: Vec<_> = durations
            .iter()
            .map(|d| ActiveModifier::temporary(modifier.clone(), ModifierSource::Buff, "x", *d))
            .collect();

        let (remaining, expired) = tick_modifiers(list.clone(), Fixed::ZERO);
        prop_assert!(expired.is_empty());
        prop_assert_eq!(remaining, list);
    }

    #[test]
    fn prop_tick_strictly_decreases(
        modifier in arb_modifier(),
        duration in arb_fixed_quarters(1, 20),
        delta in arb_fixed_quarters(0, 5),
    ) {
        let delta = delta + Fixed::DELTA;
        let list = vec![ActiveModifier::temporary(modifier, ModifierSource::Buff, "x", duration)];

        let (remaining, expired) = tick_modifiers(list, delta);
        for m in remaining.iter().chain(expired.iter()) {
            prop_assert!(m.duration.is_some_and(|d| d < duration));
        }
        prop_assert_eq!(expired.len(), usize::from(delta >= duration));
    }

    #[test]
    fn prop_damage_after_armor_at_least_one(
        damage in arb_fixed_quarters(-10, 200),
        armor in arb_fixed_quarters(-10, 200),
    ) {
        prop_assert!(calculate_damage_after_armor(damage, armor) >= Fixed::ONE);
    }

    // =========================================================================
    // Stat folding
    // =========================================================================

    #[test]
    fn prop_no_modifiers_keeps_base(base in arb_base_stats()) {
        let computed = compute_all_stats(&base, std::iter::empty());
        prop_assert_eq!(computed, ComputedStats::from_base(&base));
    }

    #[test]
    fn prop_modifiers_never_add_attack_modes(base in arb_base_stats(), modifiers in arb_modifier_list(10)) {
        let modifiers = attach(modifiers);
        let computed = compute_all_stats(&base, &modifiers);
        prop_assert_eq!(computed.melee.is_some(), base.melee.is_some());
        prop_assert_eq!(computed.ranged.is_some(), base.ranged.is_some());
        prop_assert!(computed.max_health >= Fixed::ZERO);
        prop_assert!(computed.armor >= Fixed::ZERO);
    }

    // =========================================================================
    // Cost curve
    // =========================================================================

    #[test]
    fn prop_cost_non_decreasing(
        base_cost in 1u64..10_000,
        multiplier in arb_fixed_quarters(1, 3),
        level in 0u32..30,
    ) {
        prop_assert!(upgrade_cost(base_cost, multiplier, level + 1) >= upgrade_cost(base_cost, multiplier, level));
    }

    #[test]
    fn prop_level_zero_costs_base(base_cost in 0u64..1_000_000, multiplier in arb_fixed_quarters(0, 4)) {
        prop_assert_eq!(upgrade_cost(base_cost, multiplier, 0), base_cost);
    }
}
