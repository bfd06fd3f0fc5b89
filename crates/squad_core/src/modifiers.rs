//! Stat modifiers and the arithmetic that folds them into final values.
//!
//! A [`Modifier`] is a reusable rule loaded from data; an
//! [`ActiveModifier`] is an instance attached to a unit with a source,
//! an optional duration and a stack count.
//!
//! ```text
//! final = (base + Σflat) × (1 + Σpercent) × Πmultiply      (floored at 0)
//! ```
//!
//! Modifiers sharing a stacking group collapse to the single highest-value
//! member before the formula runs. Everything else stacks freely.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::math::{decimal_serde, fixed_powi, fixed_serde, option_fixed_serde, Fixed};

/// Attack mode a nested stat belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttackMode {
    /// Close-range attack.
    Melee,
    /// Long-range attack, optionally projectile based.
    Ranged,
}

impl AttackMode {
    /// Prefix used in dotted stat paths.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Melee => "melee",
            Self::Ranged => "ranged",
        }
    }
}

/// Field of an attack profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttackStat {
    /// Damage per hit.
    Damage,
    /// Maximum reach.
    Range,
    /// Attacks per second.
    AttackSpeed,
}

/// Every stat a modifier can target.
///
/// Closed set: nested attack-mode stats are explicit variants rather than
/// string paths. [`StatTarget::path`] gives the dotted display form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatTarget {
    /// Maximum health.
    MaxHealth,
    /// Movement speed in world units per second.
    MoveSpeed,
    /// Flat damage reduction.
    Armor,
    /// `melee.damage`
    MeleeDamage,
    /// `melee.range`
    MeleeRange,
    /// `melee.attack_speed`
    MeleeAttackSpeed,
    /// `ranged.damage`
    RangedDamage,
    /// `ranged.range`
    RangedRange,
    /// `ranged.attack_speed`
    RangedAttackSpeed,
}

impl StatTarget {
    /// All stat targets in declaration order.
    pub const ALL: [Self; 9] = [
        Self::MaxHealth,
        Self::MoveSpeed,
        Self::Armor,
        Self::MeleeDamage,
        Self::MeleeRange,
        Self::MeleeAttackSpeed,
        Self::RangedDamage,
        Self::RangedRange,
        Self::RangedAttackSpeed,
    ];

    /// Dotted path used in tooling and logs (e.g. `melee.damage`).
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::MaxHealth => "max_health",
            Self::MoveSpeed => "move_speed",
            Self::Armor => "armor",
            Self::MeleeDamage => "melee.damage",
            Self::MeleeRange => "melee.range",
            Self::MeleeAttackSpeed => "melee.attack_speed",
            Self::RangedDamage => "ranged.damage",
            Self::RangedRange => "ranged.range",
            Self::RangedAttackSpeed => "ranged.attack_speed",
        }
    }

    /// The attack mode and field for nested stats, `None` for top-level ones.
    #[must_use]
    pub const fn attack_field(self) -> Option<(AttackMode, AttackStat)> {
        match self {
            Self::MaxHealth | Self::MoveSpeed | Self::Armor => None,
            Self::MeleeDamage => Some((AttackMode::Melee, AttackStat::Damage)),
            Self::MeleeRange => Some((AttackMode::Melee, AttackStat::Range)),
            Self::MeleeAttackSpeed => Some((AttackMode::Melee, AttackStat::AttackSpeed)),
            Self::RangedDamage => Some((AttackMode::Ranged, AttackStat::Damage)),
            Self::RangedRange => Some((AttackMode::Ranged, AttackStat::Range)),
            Self::RangedAttackSpeed => Some((AttackMode::Ranged, AttackStat::AttackSpeed)),
        }
    }
}

impl fmt::Display for StatTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for StatTarget {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|target| target.path() == s || target.path().replace('.', "_") == s)
            .ok_or_else(|| GameError::UnknownStatTarget(s.to_string()))
    }
}

/// How a modifier combines with the base value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifierKind {
    /// Added to the base before scaling.
    Flat,
    /// Fraction added to the percent pool (`0.25` = +25%).
    Percent,
    /// Multiplied into the final product.
    Multiply,
}

/// Reusable modifier template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifier {
    /// Identifier, unique within its source.
    pub id: String,
    /// Stat this modifier adjusts.
    pub target: StatTarget,
    /// Combination rule.
    pub kind: ModifierKind,
    /// Magnitude.
    #[serde(with = "decimal_serde")]
    pub value: Fixed,
    /// Only the highest-value member of a group applies.
    #[serde(default)]
    pub stacking_group: Option<String>,
}

impl Modifier {
    /// Create a new ungrouped modifier.
    #[must_use]
    pub fn new(id: impl Into<String>, target: StatTarget, kind: ModifierKind, value: Fixed) -> Self {
        Self {
            id: id.into(),
            target,
            kind,
            value,
            stacking_group: None,
        }
    }

    /// Builder method to place the modifier in a stacking group.
    #[must_use]
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.stacking_group = Some(group.into());
        self
    }
}

/// Where an active modifier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ModifierSource {
    /// Purchased upgrade.
    Upgrade,
    /// Ability effect.
    Ability,
    /// Equipped item.
    Equipment,
    /// Temporary positive effect.
    #[default]
    Buff,
    /// Temporary negative effect.
    Debuff,
    /// Trait built into the unit definition.
    Innate,
}

/// A modifier attached to a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveModifier {
    /// The rule being applied.
    pub modifier: Modifier,
    /// Source category.
    pub source: ModifierSource,
    /// Source identifier used for bulk removal.
    pub source_id: String,
    /// Remaining seconds; `None` means permanent.
    #[serde(with = "option_fixed_serde")]
    pub duration: Option<Fixed>,
    /// Stack count, always at least 1.
    pub stacks: u32,
    /// Battle time (seconds) at which the modifier was applied.
    #[serde(with = "fixed_serde")]
    pub applied_at: Fixed,
    /// Stack cap for ability-sourced stacks.
    pub max_stacks: Option<u32>,
}

impl ActiveModifier {
    /// Attach a permanent modifier.
    #[must_use]
    pub fn permanent(modifier: Modifier, source: ModifierSource, source_id: impl Into<String>) -> Self {
        Self {
            modifier,
            source,
            source_id: source_id.into(),
            duration: None,
            stacks: 1,
            applied_at: Fixed::ZERO,
            max_stacks: None,
        }
    }

    /// Attach a modifier that expires after `duration` seconds.
    #[must_use]
    pub fn temporary(
        modifier: Modifier,
        source: ModifierSource,
        source_id: impl Into<String>,
        duration: Fixed,
    ) -> Self {
        Self {
            duration: Some(duration),
            ..Self::permanent(modifier, source, source_id)
        }
    }

    /// Builder method to set the application time.
    #[must_use]
    pub fn applied_at(mut self, time: Fixed) -> Self {
        self.applied_at = time;
        self
    }

    /// Builder method to cap stacking.
    #[must_use]
    pub fn with_max_stacks(mut self, max_stacks: u32) -> Self {
        self.max_stacks = Some(max_stacks.max(1));
        self
    }

    /// Check whether the modifier never expires.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        self.duration.is_none()
    }

    /// Value this modifier contributes after stacking.
    ///
    /// Flat and percent stacks add up; multiplicative stacks compound.
    #[must_use]
    pub fn contribution(&self) -> Fixed {
        let stacks = self.stacks.max(1);
        match self.modifier.kind {
            ModifierKind::Flat | ModifierKind::Percent => {
                self.modifier.value.saturating_mul(Fixed::from_num(stacks))
            }
            ModifierKind::Multiply => fixed_powi(self.modifier.value, stacks),
        }
    }
}

/// Breakdown of a modified stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModifiedStat {
    /// Final value after all modifiers (never negative).
    pub final_value: Fixed,
    /// Sum of flat contributions.
    pub flat_bonus: Fixed,
    /// Sum of percent contributions.
    pub percent_bonus: Fixed,
    /// Product of multiplicative contributions.
    pub multiplier: Fixed,
}

/// Collapse stacking groups to their highest-value member.
///
/// Ungrouped modifiers pass through in input order, followed by one winner
/// per group in order of the group's first appearance. Ties on value go to
/// the latest `applied_at`, then to the later entry in the input.
pub fn resolve_stacking_groups<'a>(
    modifiers: impl IntoIterator<Item = &'a ActiveModifier>,
) -> Vec<&'a ActiveModifier> {
    let mut ungrouped = Vec::new();
    let mut winners: Vec<&'a ActiveModifier> = Vec::new();
    let mut slots: HashMap<&'a str, usize> = HashMap::new();

    for modifier in modifiers {
        let Some(group) = modifier.modifier.stacking_group.as_deref() else {
            ungrouped.push(modifier);
            continue;
        };

        match slots.get(group) {
            Some(&slot) => {
                let current = winners[slot];
                let better = (modifier.modifier.value, modifier.applied_at)
                    >= (current.modifier.value, current.applied_at);
                if better {
                    winners[slot] = modifier;
                }
            }
            None => {
                slots.insert(group, winners.len());
                winners.push(modifier);
            }
        }
    }

    ungrouped.extend(winners);
    ungrouped
}

/// Apply a set of modifiers to a base value.
///
/// Order-independent over the input set except for stacking-group
/// resolution, which is itself deterministic.
pub fn calculate_modified_stat<'a>(
    base: Fixed,
    modifiers: impl IntoIterator<Item = &'a ActiveModifier>,
) -> ModifiedStat {
    let resolved = resolve_stacking_groups(modifiers);

    let mut flat_bonus = Fixed::ZERO;
    let mut percent_bonus = Fixed::ZERO;
    let mut factors = Vec::new();

    for modifier in resolved {
        let contribution = modifier.contribution();
        match modifier.modifier.kind {
            ModifierKind::Flat => flat_bonus = flat_bonus.saturating_add(contribution),
            ModifierKind::Percent => percent_bonus = percent_bonus.saturating_add(contribution),
            ModifierKind::Multiply => factors.push(contribution),
        }
    }

    // Fixed-point products round, so fold in a canonical order.
    factors.sort_unstable();
    let multiplier = factors
        .into_iter()
        .fold(Fixed::ONE, |acc, factor| acc.saturating_mul(factor));

    let final_value = base
        .saturating_add(flat_bonus)
        .saturating_mul(Fixed::ONE.saturating_add(percent_bonus))
        .saturating_mul(multiplier)
        .max(Fixed::ZERO);

    ModifiedStat {
        final_value,
        flat_bonus,
        percent_bonus,
        multiplier,
    }
}

/// Partition modifiers by the stat they target.
pub fn group_modifiers_by_target<'a>(
    modifiers: impl IntoIterator<Item = &'a ActiveModifier>,
) -> BTreeMap<StatTarget, Vec<&'a ActiveModifier>> {
    let mut grouped: BTreeMap<StatTarget, Vec<&'a ActiveModifier>> = BTreeMap::new();
    for modifier in modifiers {
        grouped
            .entry(modifier.modifier.target)
            .or_default()
            .push(modifier);
    }
    grouped
}

/// Advance modifier durations by `delta` seconds.
///
/// Returns `(remaining, expired)`. Permanent modifiers always remain; a
/// timed modifier expires once its duration reaches zero or below.
/// Negative deltas are treated as zero.
#[must_use]
pub fn tick_modifiers(
    modifiers: Vec<ActiveModifier>,
    delta: Fixed,
) -> (Vec<ActiveModifier>, Vec<ActiveModifier>) {
    let delta = delta.max(Fixed::ZERO);
    let mut remaining = Vec::with_capacity(modifiers.len());
    let mut expired = Vec::new();

    for mut modifier in modifiers {
        match modifier.duration {
            None => remaining.push(modifier),
            Some(duration) => {
                let left = duration.saturating_sub(delta);
                modifier.duration = Some(left);
                if left <= Fixed::ZERO {
                    expired.push(modifier);
                } else {
                    remaining.push(modifier);
                }
            }
        }
    }

    (remaining, expired)
}

/// Result of [`add_or_stack_modifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackOutcome {
    /// A new entry was appended.
    Added,
    /// An existing entry gained a stack.
    Stacked {
        /// Stack count after merging.
        stacks: u32,
    },
    /// The existing entry is already at its cap; only its duration refreshed.
    AtCap,
}

/// Merge a modifier into a list.
///
/// An entry sharing `(modifier id, source id)` gains one stack, up to
/// `max_stacks` when a cap exists, and its duration is refreshed to the
/// longer of the two. Otherwise the modifier is appended with one stack.
pub fn add_or_stack_modifier(list: &mut Vec<ActiveModifier>, incoming: ActiveModifier) -> StackOutcome {
    let existing = list.iter_mut().find(|m| {
        m.modifier.id == incoming.modifier.id && m.source_id == incoming.source_id
    });

    let Some(existing) = existing else {
        list.push(ActiveModifier {
            stacks: 1,
            ..incoming
        });
        return StackOutcome::Added;
    };

    existing.duration = match (existing.duration, incoming.duration) {
        (Some(current), Some(new)) => Some(current.max(new)),
        _ => None,
    };
    existing.applied_at = incoming.applied_at;

    let cap = incoming.max_stacks.or(existing.max_stacks);
    if cap.is_some_and(|cap| existing.stacks >= cap) {
        return StackOutcome::AtCap;
    }

    existing.stacks += 1;
    StackOutcome::Stacked {
        stacks: existing.stacks,
    }
}

/// Remove every modifier issued by `source_id`, returning the removed entries.
pub fn remove_modifiers_by_source(list: &mut Vec<ActiveModifier>, source_id: &str) -> Vec<ActiveModifier> {
    let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(list)
        .into_iter()
        .partition(|m| m.source_id == source_id);
    *list = kept;
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fx(value: f64) -> Fixed {
        Fixed::from_num(value)
    }

    fn flat(id: &str, value: f64) -> ActiveModifier {
        ActiveModifier::permanent(
            Modifier::new(id, StatTarget::MaxHealth, ModifierKind::Flat, fx(value)),
            ModifierSource::Upgrade,
            "test",
        )
    }

    fn of_kind(id: &str, kind: ModifierKind, value: f64) -> ActiveModifier {
        ActiveModifier::permanent(
            Modifier::new(id, StatTarget::MaxHealth, kind, fx(value)),
            ModifierSource::Buff,
            "test",
        )
    }

    #[test]
    fn test_no_modifiers_returns_base() {
        let result = calculate_modified_stat(fx(42.0), &[]);
        assert_eq!(result.final_value, fx(42.0));
        assert_eq!(result.flat_bonus, Fixed::ZERO);
        assert_eq!(result.percent_bonus, Fixed::ZERO);
        assert_eq!(result.multiplier, Fixed::ONE);
    }

    #[test]
    fn test_flat_modifiers_sum() {
        let mods = vec![flat("a", 10.0), flat("b", 5.0), flat("c", -3.0)];
        let result = calculate_modified_stat(fx(100.0), &mods);
        assert_eq!(result.final_value, fx(112.0));
        assert_eq!(result.flat_bonus, fx(12.0));
    }

    #[test]
    fn test_full_formula() {
        let mods = vec![
            of_kind("flat", ModifierKind::Flat, 20.0),
            of_kind("pct_a", ModifierKind::Percent, 0.25),
            of_kind("pct_b", ModifierKind::Percent, 0.25),
            of_kind("mul", ModifierKind::Multiply, 2.0),
        ];
        // (100 + 20) × 1.5 × 2 = 360
        let result = calculate_modified_stat(fx(100.0), &mods);
        assert_eq!(result.final_value, fx(360.0));
        assert_eq!(result.percent_bonus, fx(0.5));
        assert_eq!(result.multiplier, fx(2.0));
    }

    #[test]
    fn test_final_value_floored_at_zero() {
        let mods = vec![flat("curse", -500.0)];
        let result = calculate_modified_stat(fx(100.0), &mods);
        assert_eq!(result.final_value, Fixed::ZERO);
    }

    #[test]
    fn test_stacks_scale_contribution() {
        let mut stacked = of_kind("rage", ModifierKind::Flat, 5.0);
        stacked.stacks = 3;
        let mut compounding = of_kind("frenzy", ModifierKind::Multiply, 2.0);
        compounding.stacks = 2;

        let result = calculate_modified_stat(fx(10.0), &[stacked, compounding]);
        // (10 + 15) × 4 = 100
        assert_eq!(result.final_value, fx(100.0));
    }

    #[test]
    fn test_stacking_group_keeps_highest() {
        let low = ActiveModifier::permanent(
            Modifier::new("aura_low", StatTarget::Armor, ModifierKind::Flat, fx(10.0)).in_group("g"),
            ModifierSource::Buff,
            "a",
        );
        let high = ActiveModifier::permanent(
            Modifier::new("aura_high", StatTarget::Armor, ModifierKind::Flat, fx(25.0)).in_group("g"),
            ModifierSource::Buff,
            "b",
        );

        let mods = [low, high];
        let resolved = resolve_stacking_groups(&mods);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].modifier.value, fx(25.0));

        let reversed = [mods[1].clone(), mods[0].clone()];
        assert_eq!(
            calculate_modified_stat(Fixed::ZERO, &mods).final_value,
            calculate_modified_stat(Fixed::ZERO, &reversed).final_value
        );
    }

    #[test]
    fn test_stacking_group_tie_prefers_latest_application() {
        let older = ActiveModifier::permanent(
            Modifier::new("old", StatTarget::Armor, ModifierKind::Flat, fx(5.0)).in_group("g"),
            ModifierSource::Buff,
            "a",
        )
        .applied_at(fx(2.0));
        let newer = ActiveModifier::permanent(
            Modifier::new("new", StatTarget::Armor, ModifierKind::Flat, fx(5.0)).in_group("g"),
            ModifierSource::Buff,
            "b",
        )
        .applied_at(fx(7.0));

        let mods = [newer, older];
        let resolved = resolve_stacking_groups(&mods);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].modifier.id, "new");
    }

    #[test]
    fn test_group_by_target() {
        let mods = vec![
            flat("hp", 10.0),
            ActiveModifier::permanent(
                Modifier::new("speed", StatTarget::MoveSpeed, ModifierKind::Percent, fx(0.1)),
                ModifierSource::Buff,
                "x",
            ),
            flat("hp2", 5.0),
        ];
        let grouped = group_modifiers_by_target(&mods);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[&StatTarget::MaxHealth].len(), 2);
        assert_eq!(grouped[&StatTarget::MoveSpeed].len(), 1);
    }

    #[test]
    fn test_tick_expires_and_keeps_permanent() {
        let timed = ActiveModifier::temporary(
            Modifier::new("slow", StatTarget::MoveSpeed, ModifierKind::Multiply, fx(0.5)),
            ModifierSource::Debuff,
            "frost",
            fx(1.0),
        );
        let permanent = flat("hp", 10.0);

        let epsilon = Fixed::from_bits(1);
        let (remaining, expired) = tick_modifiers(vec![timed, permanent], Fixed::ONE + epsilon);
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].is_permanent());
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].modifier.id, "slow");
    }

    #[test]
    fn test_tick_zero_delta_is_idempotent() {
        let timed = ActiveModifier::temporary(
            Modifier::new("haste", StatTarget::MoveSpeed, ModifierKind::Percent, fx(0.2)),
            ModifierSource::Buff,
            "x",
            fx(3.0),
        );
        let (remaining, expired) = tick_modifiers(vec![timed.clone()], Fixed::ZERO);
        assert!(expired.is_empty());
        assert_eq!(remaining, vec![timed]);
    }

    #[test]
    fn test_tick_decrement_is_exact() {
        let timed = ActiveModifier::temporary(
            Modifier::new("haste", StatTarget::MoveSpeed, ModifierKind::Percent, fx(0.2)),
            ModifierSource::Buff,
            "x",
            fx(3.0),
        );
        let (remaining, _) = tick_modifiers(vec![timed], fx(0.25));
        assert_eq!(remaining[0].duration, Some(fx(2.75)));
    }

    #[test]
    fn test_add_or_stack_respects_cap() {
        let base = ActiveModifier::temporary(
            Modifier::new("bleed", StatTarget::Armor, ModifierKind::Flat, fx(-1.0)),
            ModifierSource::Ability,
            "serrated",
            fx(2.0),
        )
        .with_max_stacks(2);

        let mut list = Vec::new();
        assert_eq!(add_or_stack_modifier(&mut list, base.clone()), StackOutcome::Added);
        assert_eq!(
            add_or_stack_modifier(&mut list, base.clone()),
            StackOutcome::Stacked { stacks: 2 }
        );
        assert_eq!(add_or_stack_modifier(&mut list, base), StackOutcome::AtCap);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].stacks, 2);
    }

    #[test]
    fn test_add_or_stack_different_source_appends() {
        let a = flat("hp", 1.0);
        let mut b = flat("hp", 1.0);
        b.source_id = "other".to_string();

        let mut list = vec![a];
        assert_eq!(add_or_stack_modifier(&mut list, b), StackOutcome::Added);
        assert_eq!(list.len(), 2);
        assert!(list.iter().all(|m| m.stacks == 1));
    }

    #[test]
    fn test_stack_refreshes_duration() {
        let first = ActiveModifier::temporary(
            Modifier::new("burn", StatTarget::Armor, ModifierKind::Flat, fx(-2.0)),
            ModifierSource::Debuff,
            "torch",
            fx(1.0),
        );
        let second = ActiveModifier::temporary(first.modifier.clone(), ModifierSource::Debuff, "torch", fx(4.0));

        let mut list = vec![first];
        add_or_stack_modifier(&mut list, second);
        assert_eq!(list[0].duration, Some(fx(4.0)));
    }

    #[test]
    fn test_remove_by_source() {
        let mut list = vec![flat("a", 1.0), flat("b", 2.0)];
        let mut foreign = flat("c", 3.0);
        foreign.source_id = "totem#7".to_string();
        list.push(foreign);

        let removed = remove_modifiers_by_source(&mut list, "totem#7");
        assert_eq!(removed.len(), 1);
        assert_eq!(list.len(), 2);
        assert!(remove_modifiers_by_source(&mut list, "missing").is_empty());
    }

    #[test]
    fn test_stat_target_paths() {
        assert_eq!(StatTarget::MeleeDamage.path(), "melee.damage");
        assert_eq!("ranged.range".parse::<StatTarget>().unwrap(), StatTarget::RangedRange);
        assert_eq!("max_health".parse::<StatTarget>().unwrap(), StatTarget::MaxHealth);
        assert_eq!("melee_attack_speed".parse::<StatTarget>().unwrap(), StatTarget::MeleeAttackSpeed);
        assert!("melee.mana".parse::<StatTarget>().is_err());
    }
}
