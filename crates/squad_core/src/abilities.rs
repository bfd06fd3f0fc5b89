//! Trigger-based abilities.
//!
//! Abilities are immutable definitions loaded from data. When a combat
//! event happens the engine asks the [`AbilityProcessor`] which of a unit's
//! abilities fire; the processor rolls chance, resolves effect targets
//! against a [`BattleView`] and returns results for the engine to apply.
//!
//! Chained abilities (`OnAbilityTrigger`) resolve inside the same call,
//! bounded by [`MAX_CHAIN_DEPTH`]. Each ability fires at most once per
//! dispatch.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::components::UnitId;
use crate::error::{GameError, Result};
use crate::math::{decimal_serde, option_decimal_serde, Fixed};
use crate::modifiers::{Modifier, ModifierSource};
use crate::rng::RandomSource;
use crate::snapshot::{BattleView, UnitSnapshot};

/// Maximum nesting of `OnAbilityTrigger` chains.
pub const MAX_CHAIN_DEPTH: u8 = 4;

/// Default threshold for `HealthBelow` (25%).
pub const DEFAULT_HEALTH_BELOW: Fixed = Fixed::from_bits(1 << 30);

/// Default threshold for `HealthAbove` (75%).
pub const DEFAULT_HEALTH_ABOVE: Fixed = Fixed::from_bits(3 << 30);

/// Default range for nearby selectors.
pub const DEFAULT_NEARBY_RANGE: Fixed = Fixed::from_bits(150 << 32);

// ============================================================================
// Definitions
// ============================================================================

/// Event that can fire an ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TriggerKind {
    /// The unit starts an attack.
    OnAttack,
    /// The unit's attack lands.
    OnHit,
    /// The unit is damaged.
    OnTakeDamage,
    /// The unit lands a killing blow.
    OnKill,
    /// The unit dies.
    OnDeath,
    /// The unit enters the battle.
    OnSpawn,
    /// A teammate dies.
    OnAllyDeath,
    /// Fires repeatedly on a timer.
    OnInterval,
    /// Health ratio drops below a threshold.
    HealthBelow,
    /// Health ratio rises above a threshold.
    HealthAbove,
    /// Another of the unit's abilities fired.
    OnAbilityTrigger,
}

/// When an ability fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityTrigger {
    /// Event kind.
    pub kind: TriggerKind,
    /// Health ratio threshold for health triggers.
    #[serde(default, with = "option_decimal_serde")]
    pub health_threshold: Option<Fixed>,
    /// Seconds between firings for interval triggers.
    #[serde(default, with = "option_decimal_serde")]
    pub interval: Option<Fixed>,
}

impl AbilityTrigger {
    /// Create a trigger with no threshold or interval.
    #[must_use]
    pub const fn new(kind: TriggerKind) -> Self {
        Self {
            kind,
            health_threshold: None,
            interval: None,
        }
    }

    /// Builder method to set the health threshold.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: Fixed) -> Self {
        self.health_threshold = Some(threshold);
        self
    }

    /// Builder method to set the interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Fixed) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Check the trigger's health condition against a unit.
    ///
    /// Non-health triggers always pass.
    #[must_use]
    pub fn condition_met(&self, unit: Option<&UnitSnapshot>) -> bool {
        match self.kind {
            TriggerKind::HealthBelow => unit.is_some_and(|u| {
                u.health_ratio() < self.health_threshold.unwrap_or(DEFAULT_HEALTH_BELOW)
            }),
            TriggerKind::HealthAbove => unit.is_some_and(|u| {
                u.health_ratio() > self.health_threshold.unwrap_or(DEFAULT_HEALTH_ABOVE)
            }),
            TriggerKind::OnAttack
            | TriggerKind::OnHit
            | TriggerKind::OnTakeDamage
            | TriggerKind::OnKill
            | TriggerKind::OnDeath
            | TriggerKind::OnSpawn
            | TriggerKind::OnAllyDeath
            | TriggerKind::OnInterval
            | TriggerKind::OnAbilityTrigger => true,
        }
    }
}

/// Which units an effect applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetSelector {
    /// The ability's owner.
    SelfUnit,
    /// The unit that caused the event.
    Attacker,
    /// The unit the event was aimed at.
    Target,
    /// Every living teammate, owner included.
    AllAllies,
    /// Every living opponent.
    AllEnemies,
    /// Living teammates within range, owner excluded.
    NearbyAllies,
    /// Living opponents within range.
    NearbyEnemies,
    /// One random living teammate, owner excluded.
    RandomAlly,
    /// One random living opponent.
    RandomEnemy,
}

/// What an effect does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    /// Direct damage, ignoring armor.
    Damage {
        /// Damage dealt.
        #[serde(with = "decimal_serde")]
        amount: Fixed,
    },
    /// Restore health.
    Heal {
        /// Health restored.
        #[serde(with = "decimal_serde")]
        amount: Fixed,
    },
    /// Attach a modifier.
    ApplyModifier {
        /// Modifier to attach.
        modifier: Modifier,
        /// Source category recorded on the active modifier.
        #[serde(default)]
        source: ModifierSource,
        /// Seconds until expiry; permanent when absent.
        #[serde(default, with = "option_decimal_serde")]
        duration: Option<Fixed>,
        /// Stack cap.
        #[serde(default)]
        max_stacks: Option<u32>,
        /// Removed when the caster dies.
        #[serde(default)]
        linked: bool,
    },
    /// Remove every modifier with a source id.
    RemoveModifier {
        /// Source id to strip.
        source_id: String,
    },
    /// Spawn units at each target's position.
    SpawnUnit {
        /// Unit definition id.
        unit_type: String,
        /// Units spawned per target.
        #[serde(default = "default_spawn_count")]
        count: u32,
        /// Spawned units die with the caster.
        #[serde(default)]
        linked: bool,
    },
    /// Expanding ring at each target's position.
    SpawnShockwave {
        /// Damage to each enemy hit.
        #[serde(with = "decimal_serde")]
        damage: Fixed,
        /// Final radius.
        #[serde(with = "decimal_serde")]
        radius: Fixed,
        /// Expansion speed.
        #[serde(with = "decimal_serde")]
        speed: Fixed,
        /// Push distance on hit.
        #[serde(default, with = "decimal_serde")]
        knockback: Fixed,
    },
    /// Push targets away from the caster.
    Knockback {
        /// Push distance.
        #[serde(with = "decimal_serde")]
        distance: Fixed,
    },
    /// Pull targets toward the caster.
    Pull {
        /// Pull distance.
        #[serde(with = "decimal_serde")]
        distance: Fixed,
    },
}

const fn default_spawn_count() -> u32 {
    1
}

/// One effect of an ability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityEffect {
    /// What happens.
    pub kind: EffectKind,
    /// Who it happens to.
    pub target: TargetSelector,
    /// Range for nearby and random selectors.
    #[serde(default, with = "option_decimal_serde")]
    pub range: Option<Fixed>,
}

impl AbilityEffect {
    /// Create an effect without an explicit range.
    #[must_use]
    pub const fn new(kind: EffectKind, target: TargetSelector) -> Self {
        Self {
            kind,
            target,
            range: None,
        }
    }

    /// Builder method to set the selector range.
    #[must_use]
    pub const fn with_range(mut self, range: Fixed) -> Self {
        self.range = Some(range);
        self
    }
}

/// Ability definition loaded from data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityDefinition {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Flavor text.
    #[serde(default)]
    pub description: String,
    /// Firing condition.
    pub trigger: AbilityTrigger,
    /// Seconds before the ability can fire again.
    #[serde(default = "default_cooldown", with = "decimal_serde")]
    pub cooldown: Fixed,
    /// Probability of firing, in `[0, 1]`.
    #[serde(default = "default_chance", with = "decimal_serde")]
    pub chance: Fixed,
    /// Effects applied when the ability fires.
    pub effects: Vec<AbilityEffect>,
}

const fn default_cooldown() -> Fixed {
    Fixed::ZERO
}

const fn default_chance() -> Fixed {
    Fixed::ONE
}

impl AbilityDefinition {
    /// Create an ability that always fires with no cooldown.
    #[must_use]
    pub fn new(id: impl Into<String>, trigger: AbilityTrigger) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            trigger,
            cooldown: Fixed::ZERO,
            chance: Fixed::ONE,
            effects: Vec::new(),
        }
    }

    /// Builder method to set the cooldown.
    #[must_use]
    pub fn with_cooldown(mut self, cooldown: Fixed) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Builder method to set the chance.
    #[must_use]
    pub fn with_chance(mut self, chance: Fixed) -> Self {
        self.chance = chance;
        self
    }

    /// Builder method to add an effect.
    #[must_use]
    pub fn with_effect(mut self, effect: AbilityEffect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Cooldown set after firing, or `None` when the ability has none.
    ///
    /// Interval abilities wait at least their interval.
    #[must_use]
    pub fn cooldown_after_firing(&self) -> Option<Fixed> {
        let cooldown = (self.cooldown > Fixed::ZERO).then_some(self.cooldown);
        if self.trigger.kind != TriggerKind::OnInterval {
            return cooldown;
        }
        match self.trigger.interval.filter(|i| *i > Fixed::ZERO) {
            Some(interval) => Some(cooldown.map_or(interval, |c| c.max(interval))),
            None => cooldown,
        }
    }
}

// ============================================================================
// Cooldowns
// ============================================================================

/// Remaining cooldown per ability id. Absent entries are ready.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CooldownMap {
    entries: BTreeMap<String, Fixed>,
}

impl CooldownMap {
    /// Create an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Seconds left for an ability (zero when ready).
    #[must_use]
    pub fn remaining(&self, ability_id: &str) -> Fixed {
        self.entries.get(ability_id).copied().unwrap_or(Fixed::ZERO)
    }

    /// Check whether an ability is off cooldown.
    #[must_use]
    pub fn is_ready(&self, ability_id: &str) -> bool {
        self.remaining(ability_id) <= Fixed::ZERO
    }

    /// Set the cooldown for an ability. Non-positive values clear it.
    pub fn set(&mut self, ability_id: impl Into<String>, seconds: Fixed) {
        let ability_id = ability_id.into();
        if seconds > Fixed::ZERO {
            self.entries.insert(ability_id, seconds);
        } else {
            self.entries.remove(&ability_id);
        }
    }

    /// Entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Fixed)> {
        self.entries.iter().map(|(id, remaining)| (id.as_str(), *remaining))
    }

    /// Number of abilities cooling down.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether every ability is ready.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for CooldownMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let bits: BTreeMap<&str, i64> = self
            .entries
            .iter()
            .map(|(id, remaining)| (id.as_str(), remaining.to_bits()))
            .collect();
        bits.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CooldownMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let bits = BTreeMap::<String, i64>::deserialize(deserializer)?;
        Ok(Self {
            entries: bits
                .into_iter()
                .map(|(id, raw)| (id, Fixed::from_bits(raw)))
                .collect(),
        })
    }
}

/// Decrement every cooldown by `delta`, dropping those that reach zero.
#[must_use]
pub fn tick_cooldowns(cooldowns: &CooldownMap, delta: Fixed) -> CooldownMap {
    let delta = delta.max(Fixed::ZERO);
    CooldownMap {
        entries: cooldowns
            .entries
            .iter()
            .filter_map(|(id, remaining)| {
                let left = remaining.saturating_sub(delta);
                (left > Fixed::ZERO).then(|| (id.clone(), left))
            })
            .collect(),
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Registry of ability definitions, indexed by id and trigger kind.
#[derive(Debug, Clone, Default)]
pub struct AbilityRegistry {
    abilities: HashMap<String, AbilityDefinition>,
    by_trigger: HashMap<TriggerKind, Vec<String>>,
    order: Vec<String>,
}

impl AbilityRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an ability. Duplicate ids are rejected.
    pub fn register(&mut self, ability: AbilityDefinition) -> Result<()> {
        if self.abilities.contains_key(&ability.id) {
            return Err(GameError::DuplicateDefinition {
                kind: "ability",
                id: ability.id,
            });
        }
        self.by_trigger
            .entry(ability.trigger.kind)
            .or_default()
            .push(ability.id.clone());
        self.order.push(ability.id.clone());
        self.abilities.insert(ability.id.clone(), ability);
        Ok(())
    }

    /// Get an ability by id.
    pub fn get(&self, id: &str) -> Result<&AbilityDefinition> {
        self.try_get(id)
            .ok_or_else(|| GameError::UnknownAbility(id.to_string()))
    }

    /// Get an ability by id, if registered.
    #[must_use]
    pub fn try_get(&self, id: &str) -> Option<&AbilityDefinition> {
        self.abilities.get(id)
    }

    /// Check whether an id is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.abilities.contains_key(id)
    }

    /// Abilities with the given trigger kind, in registration order.
    pub fn by_trigger(&self, kind: TriggerKind) -> impl Iterator<Item = &AbilityDefinition> {
        self.by_trigger
            .get(&kind)
            .into_iter()
            .flatten()
            .filter_map(|id| self.abilities.get(id))
    }

    /// All abilities in registration order.
    pub fn all(&self) -> impl Iterator<Item = &AbilityDefinition> {
        self.order.iter().filter_map(|id| self.abilities.get(id))
    }

    /// Check whether any of `ability_ids` uses the trigger kind.
    #[must_use]
    pub fn any_with_trigger(&self, ability_ids: &[String], kind: TriggerKind) -> bool {
        ability_ids
            .iter()
            .filter_map(|id| self.abilities.get(id))
            .any(|ability| ability.trigger.kind == kind)
    }

    /// Number of registered abilities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.abilities.len()
    }

    /// Check whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.abilities.is_empty()
    }
}

// ============================================================================
// Processor
// ============================================================================

/// Event details handed to the processor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerContext {
    /// Unit that caused the event.
    pub attacker: Option<UnitId>,
    /// Unit the event was aimed at.
    pub target: Option<UnitId>,
    /// Damage involved, if any.
    pub damage: Option<Fixed>,
    /// Ability that caused a chained trigger.
    pub source_ability: Option<String>,
}

impl TriggerContext {
    /// Empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the attacker.
    #[must_use]
    pub fn with_attacker(mut self, attacker: UnitId) -> Self {
        self.attacker = Some(attacker);
        self
    }

    /// Builder method to set the target.
    #[must_use]
    pub fn with_target(mut self, target: UnitId) -> Self {
        self.target = Some(target);
        self
    }

    /// Builder method to set the damage.
    #[must_use]
    pub fn with_damage(mut self, damage: Fixed) -> Self {
        self.damage = Some(damage);
        self
    }
}

/// An effect paired with the units it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEffect {
    /// The effect to apply.
    pub effect: AbilityEffect,
    /// Resolved targets, in id order.
    pub target_unit_ids: Vec<UnitId>,
}

/// An ability that fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbilityTriggerResult {
    /// Owner of the ability.
    pub unit_id: UnitId,
    /// Ability that fired.
    pub ability_id: String,
    /// Trigger kind that fired it.
    pub trigger: TriggerKind,
    /// Chain nesting (0 for the original trigger).
    pub chain_depth: u8,
    /// Effects with their targets.
    pub effects: Vec<ResolvedEffect>,
    /// Cooldown to set on the owner; `None` if the ability has none.
    pub new_cooldown: Option<Fixed>,
}

/// Resolves which abilities fire for a trigger.
#[derive(Debug, Clone, Copy)]
pub struct AbilityProcessor<'a> {
    registry: &'a AbilityRegistry,
    nearby_range: Fixed,
}

struct Dispatch<'b> {
    unit_id: UnitId,
    ability_ids: &'b [String],
    battle: &'b BattleView<'b>,
    cooldowns: CooldownMap,
    fired: BTreeSet<String>,
    results: Vec<AbilityTriggerResult>,
}

impl<'a> AbilityProcessor<'a> {
    /// Create a processor with the default nearby range.
    #[must_use]
    pub const fn new(registry: &'a AbilityRegistry) -> Self {
        Self {
            registry,
            nearby_range: DEFAULT_NEARBY_RANGE,
        }
    }

    /// Builder method to change the default nearby range.
    #[must_use]
    pub const fn with_nearby_range(mut self, range: Fixed) -> Self {
        self.nearby_range = range;
        self
    }

    /// Find every ability of `unit_id` that fires for `trigger`.
    ///
    /// Cooldowns are read from `cooldowns` and never written; callers apply
    /// `new_cooldown` from each result.
    pub fn process_trigger<R: RandomSource + ?Sized>(
        &self,
        unit_id: UnitId,
        ability_ids: &[String],
        cooldowns: &CooldownMap,
        trigger: TriggerKind,
        context: &TriggerContext,
        battle: &BattleView<'_>,
        rng: &mut R,
    ) -> Vec<AbilityTriggerResult> {
        let mut dispatch = Dispatch {
            unit_id,
            ability_ids,
            battle,
            cooldowns: cooldowns.clone(),
            fired: BTreeSet::new(),
            results: Vec::new(),
        };
        self.dispatch(&mut dispatch, trigger, context, 0, rng);
        dispatch.results
    }

    fn dispatch<R: RandomSource + ?Sized>(
        &self,
        dispatch: &mut Dispatch<'_>,
        trigger: TriggerKind,
        context: &TriggerContext,
        depth: u8,
        rng: &mut R,
    ) {
        let battle = dispatch.battle;
        let ability_ids = dispatch.ability_ids;
        let owner = battle.get(dispatch.unit_id);

        for ability_id in ability_ids {
            let Some(ability) = self.registry.try_get(ability_id) else {
                warn!(ability = %ability_id, unit = dispatch.unit_id, "Unit references unknown ability");
                continue;
            };
            if ability.trigger.kind != trigger
                || dispatch.fired.contains(ability_id)
                || !dispatch.cooldowns.is_ready(ability_id)
                || !ability.trigger.condition_met(owner)
                || !roll(ability.chance, rng)
            {
                continue;
            }

            let effects = ability
                .effects
                .iter()
                .map(|effect| ResolvedEffect {
                    effect: effect.clone(),
                    target_unit_ids: self.resolve_targets(effect, dispatch.unit_id, context, battle, rng),
                })
                .collect();

            let new_cooldown = ability.cooldown_after_firing();
            if let Some(cooldown) = new_cooldown {
                dispatch.cooldowns.set(ability_id.clone(), cooldown);
            }
            dispatch.fired.insert(ability_id.clone());
            dispatch.results.push(AbilityTriggerResult {
                unit_id: dispatch.unit_id,
                ability_id: ability_id.clone(),
                trigger,
                chain_depth: depth,
                effects,
                new_cooldown,
            });

            if depth < MAX_CHAIN_DEPTH {
                let chained = TriggerContext {
                    source_ability: Some(ability_id.clone()),
                    ..context.clone()
                };
                self.dispatch(dispatch, TriggerKind::OnAbilityTrigger, &chained, depth + 1, rng);
            }
        }
    }

    /// Resolve an effect's target selector to unit ids.
    pub fn resolve_targets<R: RandomSource + ?Sized>(
        &self,
        effect: &AbilityEffect,
        unit_id: UnitId,
        context: &TriggerContext,
        battle: &BattleView<'_>,
        rng: &mut R,
    ) -> Vec<UnitId> {
        let context_unit = |id: Option<UnitId>| -> Vec<UnitId> {
            id.and_then(|id| battle.get_alive(id)).map(|u| u.id).into_iter().collect()
        };

        match effect.target {
            TargetSelector::SelfUnit => battle.get(unit_id).map(|u| u.id).into_iter().collect(),
            TargetSelector::Attacker => context_unit(context.attacker),
            TargetSelector::Target => context_unit(context.target),
            TargetSelector::AllAllies
            | TargetSelector::AllEnemies
            | TargetSelector::NearbyAllies
            | TargetSelector::NearbyEnemies
            | TargetSelector::RandomAlly
            | TargetSelector::RandomEnemy => {
                let Some(owner) = battle.get(unit_id) else {
                    return Vec::new();
                };
                self.resolve_team_targets(effect, owner, battle, rng)
            }
        }
    }

    fn resolve_team_targets<R: RandomSource + ?Sized>(
        &self,
        effect: &AbilityEffect,
        owner: &UnitSnapshot,
        battle: &BattleView<'_>,
        rng: &mut R,
    ) -> Vec<UnitId> {
        let allies = owner.team;
        let enemies = owner.team.opponent();
        let within = |range: Fixed| {
            let range_sq = range.saturating_mul(range);
            move |u: &&UnitSnapshot| owner.position.distance_squared(u.position) <= range_sq
        };
        let nearby_range = effect.range.unwrap_or(self.nearby_range);
        let random_range = effect.range.unwrap_or(Fixed::MAX);
        let not_owner = |u: &&UnitSnapshot| u.id != owner.id;

        match effect.target {
            TargetSelector::AllAllies => collect_ids(battle.alive_on(allies)),
            TargetSelector::AllEnemies => collect_ids(battle.alive_on(enemies)),
            TargetSelector::NearbyAllies => collect_ids(
                battle
                    .alive_on(allies)
                    .filter(not_owner)
                    .filter(within(nearby_range)),
            ),
            TargetSelector::NearbyEnemies => {
                collect_ids(battle.alive_on(enemies).filter(within(nearby_range)))
            }
            TargetSelector::RandomAlly => pick_one(
                collect_ids(
                    battle
                        .alive_on(allies)
                        .filter(not_owner)
                        .filter(within(random_range)),
                ),
                rng,
            ),
            TargetSelector::RandomEnemy => pick_one(
                collect_ids(battle.alive_on(enemies).filter(within(random_range))),
                rng,
            ),
            TargetSelector::SelfUnit | TargetSelector::Attacker | TargetSelector::Target => {
                Vec::new()
            }
        }
    }
}

fn collect_ids<'u>(units: impl Iterator<Item = &'u UnitSnapshot>) -> Vec<UnitId> {
    units.map(|u| u.id).collect()
}

fn pick_one<R: RandomSource + ?Sized>(candidates: Vec<UnitId>, rng: &mut R) -> Vec<UnitId> {
    if candidates.is_empty() {
        return candidates;
    }
    vec![candidates[rng.next_index(candidates.len())]]
}

/// Roll an ability's chance.
///
/// Chance at or above 1 always fires without drawing; chance at or below 0
/// never fires. Otherwise a draw in `[0, 1)` fires when it does not exceed
/// the chance.
pub fn roll<R: RandomSource + ?Sized>(chance: Fixed, rng: &mut R) -> bool {
    if chance >= Fixed::ONE {
        return true;
    }
    if chance <= Fixed::ZERO {
        return false;
    }
    rng.next_fraction() <= chance
}
