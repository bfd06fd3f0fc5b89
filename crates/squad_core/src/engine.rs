//! Battle engine.
//!
//! The engine owns every unit, projectile and shockwave and advances them
//! with a variable-delta tick. Behavior systems read a single snapshot per
//! pass and return results; the engine applies those results afterwards.
//!
//! # Determinism
//!
//! Within a session the engine is fully reproducible:
//! - All math is fixed-point ([`Fixed`])
//! - Randomness comes from a seeded [`BattleRng`]
//! - Units are always processed in ascending id order
//!
//! # Tick Order
//!
//! 1. Deferred `OnSpawn` triggers, cooldowns, modifier expiry, flash decay
//! 2. Targeting, combat and movement from one snapshot, then applied
//! 3. Projectiles, then shockwaves
//! 4. Interval abilities
//! 5. Deaths (`OnDeath`, `OnAllyDeath`, `OnKill`, linked cleanup)
//! 6. Removal of the dead and the outcome check
//!
//! Ability results are queued and resolved after each phase. Effects may
//! dispatch further triggers; the queue drains until empty or until the
//! per-tick resolution budget runs out.
//!
//! # Example
//!
//! ```
//! use squad_core::prelude::*;
//! use squad_core::stats::{AttackProfile, BaseStats};
//!
//! let grunt = UnitDefinition::new(
//!     "grunt",
//!     "melee",
//!     BaseStats::new(Fixed::from_num(100), Fixed::from_num(40))
//!         .with_melee(AttackProfile::new(Fixed::from_num(10), Fixed::from_num(30), Fixed::ONE)),
//! );
//! let data = GameData::from_definitions([grunt], [], []).unwrap();
//!
//! let mut engine = BattleEngine::new(data, BattleConfig::default());
//! engine.spawn_unit("grunt", Team::Player, Vec2Fixed::from_ints(100, 300)).unwrap();
//! engine.start();
//! engine.tick(Fixed::from_num(0.05));
//! assert_eq!(engine.tick_count(), 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::abilities::{
    tick_cooldowns, AbilityProcessor, AbilityTriggerResult, EffectKind, TriggerContext,
    TriggerKind,
};
use crate::components::{
    EffectId, Health, Projectile, Shockwave, Team, Unit, UnitId,
};
use crate::config::BattleConfig;
use crate::data::GameData;
use crate::error::{GameError, Result};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::modifiers::{
    add_or_stack_modifier, remove_modifiers_by_source, tick_modifiers, ActiveModifier, AttackMode,
    ModifierSource, StackOutcome,
};
use crate::progress::PlayerProgress;
use crate::rng::BattleRng;
use crate::snapshot::{
    BattleSnapshot, BattleView, ProjectileView, ShockwaveView, UnitSnapshot, UnitView,
};
use crate::stats::calculate_damage_after_armor;
use crate::systems::{
    advance_projectile, advance_shockwave, decay_visual_state, find_target, resolve_combat,
    resolve_movement, Delivery, ProjectileUpdate,
};
use crate::upgrades::{merge_abilities, CostCheck, PrerequisiteContext};

/// Ability results resolved per tick before the queue is cut off.
pub const MAX_RESOLUTIONS_PER_TICK: u32 = 512;

// ============================================================================
// Storage
// ============================================================================

/// Storage for all units in a battle.
///
/// Uses a `HashMap` for O(1) lookup by ID, with deterministic iteration via
/// sorted keys when processing systems.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitStorage {
    /// Map of unit ID to unit data.
    units: HashMap<UnitId, Unit>,
    /// Next unit ID to assign.
    next_id: UnitId,
}

impl UnitStorage {
    /// Create empty unit storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            units: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert a unit, assigning it the next ID.
    pub fn insert(&mut self, mut unit: Unit) -> UnitId {
        let id = self.next_id;
        self.next_id += 1;
        unit.id = id;
        self.units.insert(id, unit);
        id
    }

    /// Remove a unit by ID.
    pub fn remove(&mut self, id: UnitId) -> Option<Unit> {
        self.units.remove(&id)
    }

    /// Get a unit by ID.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Get a mutable reference to a unit by ID.
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Check if a unit exists.
    #[must_use]
    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains_key(&id)
    }

    /// Get the number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Get sorted unit IDs for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<UnitId> {
        let mut ids: Vec<_> = self.units.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Units in ascending id order.
    #[must_use]
    pub fn sorted(&self) -> Vec<&Unit> {
        let mut units: Vec<_> = self.units.values().collect();
        units.sort_unstable_by_key(|u| u.id);
        units
    }

    /// Iterate over all units (not in deterministic order).
    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }
}

// ============================================================================
// Events
// ============================================================================

/// Final result of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleOutcome {
    /// Every enemy unit and structure is destroyed.
    Victory,
    /// Every player unit and structure is destroyed.
    Defeat,
}

/// Damage dealt during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageEvent {
    /// Unit responsible, if any.
    pub attacker: Option<UnitId>,
    /// Unit damaged.
    pub target: UnitId,
    /// Health actually removed.
    pub amount: Fixed,
    /// Attack mode, or `None` for ability damage.
    pub mode: Option<AttackMode>,
}

/// An ability that fired during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbilityEvent {
    /// Owner of the ability.
    pub unit_id: UnitId,
    /// Ability id.
    pub ability_id: String,
    /// Trigger that fired it.
    pub trigger: TriggerKind,
}

/// Events generated during a battle tick.
///
/// The presentation layer uses these for effects and sounds.
#[derive(Debug, Clone, Default)]
pub struct TickEvents {
    /// Damage dealt, in resolution order.
    pub damage_events: Vec<DamageEvent>,
    /// Units that died this tick.
    pub deaths: Vec<UnitId>,
    /// Units that entered the battle this tick.
    pub spawned: Vec<UnitId>,
    /// Abilities that fired.
    pub abilities: Vec<AbilityEvent>,
    /// Set on the tick the battle is decided.
    pub outcome: Option<BattleOutcome>,
}

// ============================================================================
// State
// ============================================================================

/// Serializable battle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleState {
    /// Ticks simulated.
    tick: u64,
    /// Battle time in seconds.
    #[serde(with = "fixed_serde")]
    elapsed: Fixed,
    /// All units.
    units: UnitStorage,
    /// Projectiles in flight.
    projectiles: Vec<Projectile>,
    /// Expanding shockwaves.
    shockwaves: Vec<Shockwave>,
    /// Next projectile or shockwave id.
    next_effect_id: EffectId,
    /// Battle randomness.
    rng: BattleRng,
    /// Result, once decided.
    outcome: Option<BattleOutcome>,
    /// Current wave number.
    wave: u32,
    /// Units whose `OnSpawn` trigger runs at the start of the next tick.
    pending_spawns: Vec<UnitId>,
}

impl BattleState {
    fn new(seed: u64) -> Self {
        Self {
            tick: 0,
            elapsed: Fixed::ZERO,
            units: UnitStorage::new(),
            projectiles: Vec::new(),
            shockwaves: Vec::new(),
            next_effect_id: 1,
            rng: BattleRng::new(seed),
            outcome: None,
            wave: 1,
            pending_spawns: Vec::new(),
        }
    }

    fn next_effect_id(&mut self) -> EffectId {
        let id = self.next_effect_id;
        self.next_effect_id += 1;
        id
    }
}

// ============================================================================
// Engine
// ============================================================================

/// The battle simulation.
///
/// Owns registries, battle state and player progress. Rendering and input
/// layers read [`BattleEngine::snapshot`] and issue commands through the
/// public methods.
#[derive(Debug, Clone)]
pub struct BattleEngine {
    config: BattleConfig,
    data: GameData,
    state: BattleState,
    progress: PlayerProgress,
    running: bool,
    selected: BTreeSet<UnitId>,
    pending: VecDeque<AbilityTriggerResult>,
    budget: u32,
}

impl BattleEngine {
    /// Create a stopped engine with no units and fresh progress.
    #[must_use]
    pub fn new(data: GameData, config: BattleConfig) -> Self {
        Self {
            state: BattleState::new(config.seed),
            config,
            data,
            progress: PlayerProgress::default(),
            running: false,
            selected: BTreeSet::new(),
            pending: VecDeque::new(),
            budget: MAX_RESOLUTIONS_PER_TICK,
        }
    }

    /// Builder method to start from saved progress.
    #[must_use]
    pub fn with_progress(mut self, progress: PlayerProgress) -> Self {
        self.progress = progress;
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Battle configuration.
    #[must_use]
    pub const fn config(&self) -> &BattleConfig {
        &self.config
    }

    /// Loaded registries.
    #[must_use]
    pub const fn data(&self) -> &GameData {
        &self.data
    }

    /// Player progress.
    #[must_use]
    pub const fn progress(&self) -> &PlayerProgress {
        &self.progress
    }

    /// Replace player progress and re-apply upgrades to living player units.
    pub fn set_progress(&mut self, progress: PlayerProgress) {
        self.progress = progress;
        self.reapply_upgrades();
    }

    /// Ticks simulated.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.state.tick
    }

    /// Battle time in seconds.
    #[must_use]
    pub const fn elapsed(&self) -> Fixed {
        self.state.elapsed
    }

    /// Whether ticks advance the battle.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Result, once decided.
    #[must_use]
    pub const fn outcome(&self) -> Option<BattleOutcome> {
        self.state.outcome
    }

    /// Current wave number.
    #[must_use]
    pub const fn wave(&self) -> u32 {
        self.state.wave
    }

    /// Set the wave number recorded on victory.
    pub fn set_wave(&mut self, wave: u32) {
        self.state.wave = wave;
    }

    /// Look up a unit.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.state.units.get(id)
    }

    /// Unit ids in ascending order.
    #[must_use]
    pub fn unit_ids(&self) -> Vec<UnitId> {
        self.state.units.sorted_ids()
    }

    /// Living units on a team.
    #[must_use]
    pub fn living_count(&self, team: Team) -> usize {
        self.state
            .units
            .iter()
            .filter(|u| u.team == team && u.is_alive())
            .count()
    }

    /// Projectiles in flight.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.state.projectiles
    }

    /// Active shockwaves.
    #[must_use]
    pub fn shockwaves(&self) -> &[Shockwave] {
        &self.state.shockwaves
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Start or resume the battle. A decided battle stays stopped.
    pub fn start(&mut self) {
        if self.state.outcome.is_some() {
            warn!(outcome = ?self.state.outcome, "Battle already decided; reset to fight again");
            return;
        }
        if !self.running {
            info!(tick = self.state.tick, units = self.state.units.len(), "Battle started");
        }
        self.running = true;
    }

    /// Pause the battle.
    pub fn stop(&mut self) {
        if self.running {
            info!(tick = self.state.tick, "Battle stopped");
        }
        self.running = false;
    }

    /// Clear the battlefield. Progress is kept.
    pub fn reset(&mut self) {
        self.state = BattleState::new(self.config.seed);
        self.selected.clear();
        self.pending.clear();
        self.running = false;
        info!("Battle reset");
    }

    // ------------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------------

    /// Advance the battle by `delta` seconds.
    ///
    /// `delta` is capped at [`BattleConfig::max_tick_delta`]; negative
    /// deltas count as zero. A stopped or decided battle does not advance.
    pub fn tick(&mut self, delta: Fixed) -> TickEvents {
        let mut events = TickEvents::default();
        if !self.running || self.state.outcome.is_some() {
            return events;
        }

        let delta = delta.min(self.config.max_tick_delta).max(Fixed::ZERO);
        self.state.tick += 1;
        self.state.elapsed = self.state.elapsed.saturating_add(delta);
        self.budget = MAX_RESOLUTIONS_PER_TICK;

        // 1. Timers
        self.run_spawn_triggers(&mut events);
        let unit_ids = self.state.units.sorted_ids();
        self.run_timer_system(&unit_ids, delta);

        // 2. Behavior
        self.run_behavior_systems(&unit_ids, delta, &mut events);
        self.resolve_pending(&mut events);

        // 3. Projectiles and shockwaves
        self.run_projectile_system(delta, &mut events);
        self.resolve_pending(&mut events);
        self.run_shockwave_system(delta, &mut events);
        self.resolve_pending(&mut events);

        // 4. Interval abilities
        self.run_interval_system(&mut events);
        self.resolve_pending(&mut events);

        // 5. Deaths
        self.run_death_system(&mut events);

        // 6. Cleanup
        let removed = self.remove_dead();
        if removed > 0 {
            self.check_outcome(&mut events);
        }

        #[cfg(any(debug_assertions, feature = "debug-validation"))]
        {
            let hash = self.state_hash();
            debug!(tick = self.state.tick, state_hash = hash, "Battle state hash");
        }

        events
    }

    fn run_spawn_triggers(&mut self, events: &mut TickEvents) {
        for id in std::mem::take(&mut self.state.pending_spawns) {
            if self.state.units.contains(id) {
                events.spawned.push(id);
                self.dispatch(id, TriggerKind::OnSpawn, TriggerContext::new(), events);
            }
        }
        self.resolve_pending(events);
    }

    fn run_timer_system(&mut self, unit_ids: &[UnitId], delta: Fixed) {
        for &id in unit_ids {
            let Some(unit) = self.state.units.get_mut(id) else {
                continue;
            };
            unit.cooldowns = tick_cooldowns(&unit.cooldowns, delta);
            unit.visual = decay_visual_state(unit.visual, delta);

            let (remaining, expired) = tick_modifiers(std::mem::take(&mut unit.modifiers), delta);
            unit.modifiers = remaining;
            if !expired.is_empty() {
                unit.recompute_stats();
                debug!(unit = id, expired = expired.len(), "Modifiers expired");
            }
        }
    }

    fn run_behavior_systems(&mut self, unit_ids: &[UnitId], delta: Fixed, events: &mut TickEvents) {
        let snapshots = self.snapshots();
        let battle = BattleView::new(&snapshots);

        let mut plans = Vec::with_capacity(unit_ids.len());
        for &id in unit_ids {
            let (Some(unit), Some(me)) = (self.state.units.get(id), battle.get_alive(id)) else {
                continue;
            };
            let targeting = find_target(me, &battle, &self.config);
            let combat = resolve_combat(unit, targeting.target, &battle, &self.config, delta);
            let movement = resolve_movement(unit, targeting.target, &battle, &self.config, delta);
            plans.push((targeting, combat, movement));
        }

        for (targeting, combat, movement) in plans {
            let id = targeting.unit_id;
            let Some(unit) = self.state.units.get_mut(id) else {
                continue;
            };
            unit.targeting.target = targeting.target;
            unit.combat.attack_cooldown = combat.attack_cooldown;

            let from = unit.position;
            let to = self.config.clamp_to_arena(from + movement.displacement);
            unit.position = to;
            unit.movement.last_displacement = to - from;

            let Some(attack) = combat.attack else {
                continue;
            };
            unit.combat.last_mode = Some(attack.mode);
            unit.visual.attack_flash = self.config.attack_flash_duration;
            let team = unit.team;

            self.dispatch(
                id,
                TriggerKind::OnAttack,
                TriggerContext::new().with_target(attack.target),
                events,
            );
            match attack.delivery {
                Delivery::Instant => {
                    self.deal_attack_damage(id, attack.target, attack.damage, attack.mode, events);
                }
                Delivery::Projectile { speed } => {
                    let projectile_id = self.state.next_effect_id();
                    self.state.projectiles.push(Projectile {
                        id: projectile_id,
                        source: id,
                        team,
                        target: attack.target,
                        position: to,
                        damage: attack.damage,
                        speed,
                    });
                }
            }
        }
    }

    fn run_projectile_system(&mut self, delta: Fixed, events: &mut TickEvents) {
        if self.state.projectiles.is_empty() {
            return;
        }
        let snapshots = self.snapshots();
        let battle = BattleView::new(&snapshots);

        let mut hits = Vec::new();
        let mut in_flight = Vec::with_capacity(self.state.projectiles.len());
        for mut projectile in std::mem::take(&mut self.state.projectiles) {
            match advance_projectile(&projectile, &battle, delta) {
                ProjectileUpdate::InFlight { position, .. } => {
                    projectile.position = position;
                    in_flight.push(projectile);
                }
                ProjectileUpdate::Hit { target, .. } => {
                    hits.push((projectile.source, target, projectile.damage));
                }
                ProjectileUpdate::Fizzled { projectile_id } => {
                    debug!(projectile = projectile_id, "Projectile lost its target");
                }
            }
        }
        self.state.projectiles = in_flight;

        for (source, target, damage) in hits {
            self.deal_attack_damage(source, target, damage, AttackMode::Ranged, events);
        }
    }

    fn run_shockwave_system(&mut self, delta: Fixed, events: &mut TickEvents) {
        if self.state.shockwaves.is_empty() {
            return;
        }
        let snapshots = self.snapshots();
        let battle = BattleView::new(&snapshots);

        let mut hits = Vec::new();
        let mut active = Vec::with_capacity(self.state.shockwaves.len());
        for mut shockwave in std::mem::take(&mut self.state.shockwaves) {
            let update = advance_shockwave(&shockwave, &battle, &self.config, delta);
            shockwave.radius = update.radius;
            shockwave.age = update.age;
            for &target in &update.hits {
                shockwave.hit.insert(target);
                hits.push((shockwave.source, shockwave.origin, shockwave.damage, shockwave.knockback, target));
            }
            if !update.finished {
                active.push(shockwave);
            }
        }
        self.state.shockwaves = active;

        for (source, origin, damage, knockback, target) in hits {
            self.deal_effect_damage(source, target, damage, events);
            if knockback > Fixed::ZERO {
                self.push_away(target, origin, knockback, Vec2Fixed::ZERO);
            }
        }
    }

    fn run_interval_system(&mut self, events: &mut TickEvents) {
        for id in self.state.units.sorted_ids() {
            self.dispatch(id, TriggerKind::OnInterval, TriggerContext::new(), events);
        }
    }

    fn run_death_system(&mut self, events: &mut TickEvents) {
        loop {
            let newly_dead: Vec<UnitId> = self
                .state
                .units
                .sorted()
                .into_iter()
                .filter(|u| !u.is_alive() && !u.death_processed)
                .map(|u| u.id)
                .collect();
            if newly_dead.is_empty() {
                break;
            }

            for id in newly_dead {
                let Some(unit) = self.state.units.get_mut(id) else {
                    continue;
                };
                unit.death_processed = true;
                let team = unit.team;
                let killer = unit.last_attacker;
                events.deaths.push(id);
                debug!(unit = id, killer = ?killer, "Unit died");

                let mut context = TriggerContext::new().with_target(id);
                if let Some(killer) = killer {
                    context = context.with_attacker(killer);
                }
                self.dispatch(id, TriggerKind::OnDeath, context.clone(), events);

                let allies: Vec<UnitId> = self
                    .state
                    .units
                    .sorted()
                    .into_iter()
                    .filter(|u| u.team == team && u.is_alive())
                    .map(|u| u.id)
                    .collect();
                for ally in allies {
                    self.dispatch(ally, TriggerKind::OnAllyDeath, context.clone(), events);
                }
                if let Some(killer) = killer {
                    self.dispatch(killer, TriggerKind::OnKill, TriggerContext::new().with_target(id), events);
                }
                self.resolve_pending(events);
                self.release_links(id);
            }
        }
    }

    /// Undo everything tied to a dead caster.
    fn release_links(&mut self, caster: UnitId) {
        let sources = self
            .state
            .units
            .get_mut(caster)
            .map(|u| std::mem::take(&mut u.linked_sources))
            .unwrap_or_default();

        for id in self.state.units.sorted_ids() {
            let Some(unit) = self.state.units.get_mut(id) else {
                continue;
            };
            let mut changed = false;
            for source in &sources {
                changed |= !remove_modifiers_by_source(&mut unit.modifiers, source).is_empty();
            }
            if changed {
                unit.recompute_stats();
            }
            if unit.linked_to == Some(caster) && unit.is_alive() {
                unit.health.kill();
                debug!(unit = id, caster, "Linked unit released");
            }
        }
    }

    fn remove_dead(&mut self) -> usize {
        let dead: Vec<UnitId> = self
            .state
            .units
            .iter()
            .filter(|u| !u.is_alive())
            .map(|u| u.id)
            .collect();
        for id in &dead {
            self.state.units.remove(*id);
            self.selected.remove(id);
        }
        dead.len()
    }

    fn check_outcome(&mut self, events: &mut TickEvents) {
        let players = self.living_count(Team::Player);
        let enemies = self.living_count(Team::Enemy);
        let outcome = if players == 0 {
            BattleOutcome::Defeat
        } else if enemies == 0 {
            BattleOutcome::Victory
        } else {
            return;
        };

        self.state.outcome = Some(outcome);
        self.running = false;
        events.outcome = Some(outcome);

        if outcome == BattleOutcome::Victory {
            self.progress.record_wave(self.state.wave);
            self.progress.add_currency(self.config.wave_reward);
        }
        info!(
            outcome = ?outcome,
            wave = self.state.wave,
            tick = self.state.tick,
            currency = self.progress.currency,
            "Battle decided"
        );
    }

    // ------------------------------------------------------------------------
    // Damage
    // ------------------------------------------------------------------------

    fn deal_attack_damage(
        &mut self,
        attacker: UnitId,
        target: UnitId,
        damage: Fixed,
        mode: AttackMode,
        events: &mut TickEvents,
    ) {
        let Some(unit) = self.state.units.get_mut(target) else {
            return;
        };
        if !unit.is_alive() {
            return;
        }
        let amount = calculate_damage_after_armor(damage, unit.stats.armor);
        let dealt = unit.health.apply_damage(amount);
        unit.visual.hit_flash = self.config.hit_flash_duration;
        unit.last_attacker = Some(attacker);
        events.damage_events.push(DamageEvent {
            attacker: Some(attacker),
            target,
            amount: dealt,
            mode: Some(mode),
        });

        let context = TriggerContext::new().with_attacker(attacker).with_target(target).with_damage(dealt);
        self.dispatch(attacker, TriggerKind::OnHit, context.clone(), events);
        self.dispatch(target, TriggerKind::OnTakeDamage, context.clone(), events);
        self.dispatch(target, TriggerKind::HealthBelow, context, events);
    }

    /// Ability and shockwave damage ignores armor.
    fn deal_effect_damage(&mut self, source: UnitId, target: UnitId, amount: Fixed, events: &mut TickEvents) {
        if amount <= Fixed::ZERO {
            return;
        }
        let Some(unit) = self.state.units.get_mut(target) else {
            return;
        };
        if !unit.is_alive() {
            return;
        }
        let dealt = unit.health.apply_damage(amount);
        unit.visual.hit_flash = self.config.hit_flash_duration;
        if source != target {
            unit.last_attacker = Some(source);
        }
        events.damage_events.push(DamageEvent {
            attacker: Some(source),
            target,
            amount: dealt,
            mode: None,
        });

        let context = TriggerContext::new().with_attacker(source).with_target(target).with_damage(dealt);
        self.dispatch(target, TriggerKind::OnTakeDamage, context.clone(), events);
        self.dispatch(target, TriggerKind::HealthBelow, context, events);
    }

    // ------------------------------------------------------------------------
    // Abilities
    // ------------------------------------------------------------------------

    /// Find abilities that fire and queue their results.
    ///
    /// Cooldowns are applied to the owner immediately so a second dispatch
    /// in the same tick sees them.
    fn dispatch(&mut self, unit_id: UnitId, trigger: TriggerKind, context: TriggerContext, events: &mut TickEvents) {
        let Some(unit) = self.state.units.get(unit_id) else {
            return;
        };
        if !unit.is_alive() && trigger != TriggerKind::OnDeath {
            return;
        }
        if !self.data.abilities.any_with_trigger(&unit.abilities, trigger) {
            return;
        }

        let snapshots = self.snapshots();
        let battle = BattleView::new(&snapshots);
        let processor = AbilityProcessor::new(&self.data.abilities).with_nearby_range(self.config.nearby_range);
        let results = processor.process_trigger(
            unit_id,
            &unit.abilities,
            &unit.cooldowns,
            trigger,
            &context,
            &battle,
            &mut self.state.rng,
        );
        if results.is_empty() {
            return;
        }

        if let Some(unit) = self.state.units.get_mut(unit_id) {
            for result in &results {
                if let Some(cooldown) = result.new_cooldown {
                    unit.cooldowns.set(result.ability_id.clone(), cooldown);
                }
            }
        }
        for result in results {
            debug!(
                unit = unit_id,
                ability = %result.ability_id,
                trigger = ?result.trigger,
                depth = result.chain_depth,
                "Ability fired"
            );
            events.abilities.push(AbilityEvent {
                unit_id,
                ability_id: result.ability_id.clone(),
                trigger: result.trigger,
            });
            self.pending.push_back(result);
        }
    }

    fn resolve_pending(&mut self, events: &mut TickEvents) {
        while let Some(result) = self.pending.pop_front() {
            if self.budget == 0 {
                warn!(
                    tick = self.state.tick,
                    dropped = self.pending.len() + 1,
                    "Ability resolution budget exhausted"
                );
                self.pending.clear();
                return;
            }
            self.budget -= 1;
            self.apply_ability(result, events);
        }
    }

    fn apply_ability(&mut self, result: AbilityTriggerResult, events: &mut TickEvents) {
        let Some(caster) = self.state.units.get(result.unit_id) else {
            return;
        };
        let caster_team = caster.team;
        let caster_position = caster.position;

        for resolved in &result.effects {
            for &target in &resolved.target_unit_ids {
                self.apply_effect(
                    &result,
                    &resolved.effect.kind,
                    caster_team,
                    caster_position,
                    target,
                    events,
                );
            }
        }
    }

    fn apply_effect(
        &mut self,
        result: &AbilityTriggerResult,
        kind: &EffectKind,
        caster_team: Team,
        caster_position: Vec2Fixed,
        target: UnitId,
        events: &mut TickEvents,
    ) {
        let caster = result.unit_id;
        let Some(target_unit) = self.state.units.get(target) else {
            return;
        };
        let target_alive = target_unit.is_alive();
        let target_position = target_unit.position;

        match kind {
            EffectKind::Damage { amount } => {
                self.deal_effect_damage(caster, target, *amount, events);
            }
            EffectKind::Heal { amount } => {
                let Some(unit) = self.state.units.get_mut(target).filter(|u| u.is_alive()) else {
                    return;
                };
                if unit.health.heal(*amount) > Fixed::ZERO {
                    let context = TriggerContext::new().with_attacker(caster).with_target(target);
                    self.dispatch(target, TriggerKind::HealthAbove, context, events);
                }
            }
            EffectKind::ApplyModifier {
                modifier,
                source,
                duration,
                max_stacks,
                linked,
            } => {
                if !target_alive {
                    return;
                }
                let source_id = if *linked {
                    format!("{}#{caster}", result.ability_id)
                } else {
                    result.ability_id.clone()
                };
                let mut active = ActiveModifier::permanent(modifier.clone(), *source, source_id.clone())
                    .applied_at(self.state.elapsed);
                active.duration = *duration;
                if let Some(cap) = max_stacks {
                    active = active.with_max_stacks(*cap);
                }
                if let Some(unit) = self.state.units.get_mut(target) {
                    add_or_stack_modifier(&mut unit.modifiers, active);
                    unit.recompute_stats();
                }
                if *linked {
                    if let Some(owner) = self.state.units.get_mut(caster) {
                        owner.linked_sources.insert(source_id);
                    }
                }
            }
            EffectKind::RemoveModifier { source_id } => {
                if let Some(unit) = self.state.units.get_mut(target) {
                    if !remove_modifiers_by_source(&mut unit.modifiers, source_id).is_empty() {
                        unit.recompute_stats();
                    }
                }
            }
            EffectKind::SpawnUnit {
                unit_type,
                count,
                linked,
            } => {
                for _ in 0..*count {
                    match self.spawn_internal(unit_type, caster_team, target_position) {
                        Ok(id) => {
                            if *linked {
                                if let Some(unit) = self.state.units.get_mut(id) {
                                    unit.linked_to = Some(caster);
                                }
                            }
                            events.spawned.push(id);
                            self.dispatch(id, TriggerKind::OnSpawn, TriggerContext::new(), events);
                        }
                        Err(e) => {
                            warn!(ability = %result.ability_id, error = %e, "Spawn effect failed");
                            return;
                        }
                    }
                }
            }
            EffectKind::SpawnShockwave {
                damage,
                radius,
                speed,
                knockback,
            } => {
                let id = self.state.next_effect_id();
                self.state.shockwaves.push(Shockwave {
                    id,
                    source: caster,
                    team: caster_team,
                    origin: target_position,
                    radius: Fixed::ZERO,
                    max_radius: *radius,
                    speed: *speed,
                    damage: *damage,
                    knockback: *knockback,
                    age: Fixed::ZERO,
                    hit: BTreeSet::new(),
                });
            }
            EffectKind::Knockback { distance } => {
                if target_alive {
                    self.push_away(target, caster_position, *distance, caster_team.forward());
                }
            }
            EffectKind::Pull { distance } => {
                if target_alive {
                    self.pull_toward(target, caster_position, *distance);
                }
            }
        }
    }

    /// Push a unit directly away from `origin`. Structures do not move.
    fn push_away(&mut self, target: UnitId, origin: Vec2Fixed, distance: Fixed, fallback: Vec2Fixed) {
        let Some(unit) = self.state.units.get_mut(target) else {
            return;
        };
        if unit.is_structure() || distance <= Fixed::ZERO {
            return;
        }
        let away = (unit.position - origin).normalize();
        let direction = if away.is_zero() { fallback } else { away };
        unit.position = self.config.clamp_to_arena(unit.position + direction.scale(distance));
    }

    /// Pull a unit toward `origin`, stopping at contact distance.
    fn pull_toward(&mut self, target: UnitId, origin: Vec2Fixed, distance: Fixed) {
        let Some(unit) = self.state.units.get_mut(target) else {
            return;
        };
        if unit.is_structure() || distance <= Fixed::ZERO {
            return;
        }
        let contact = self.config.unit_radius.saturating_mul(Fixed::from_num(2));
        let gap = (unit.position.distance(origin) - contact).max(Fixed::ZERO);
        let position = unit.position.step_toward(origin, distance.min(gap));
        unit.position = self.config.clamp_to_arena(position);
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Spawn a unit. Its `OnSpawn` abilities fire at the start of the next tick.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownUnitType`] for unregistered types.
    pub fn spawn_unit(&mut self, unit_type: &str, team: Team, position: Vec2Fixed) -> Result<UnitId> {
        let id = self.spawn_internal(unit_type, team, position)?;
        self.state.pending_spawns.push(id);
        Ok(id)
    }

    fn spawn_internal(&mut self, unit_type: &str, team: Team, position: Vec2Fixed) -> Result<UnitId> {
        let definition = self.data.units.get(unit_type)?;

        let mut unit = Unit::new(
            0,
            definition.id.clone(),
            team,
            self.config.clamp_to_arena(position),
            definition.stats.clone(),
        )
        .with_kind(definition.kind)
        .with_category(definition.category.clone());

        unit.modifiers = definition
            .innate_modifiers
            .iter()
            .map(|m| ActiveModifier::permanent(m.clone(), ModifierSource::Innate, definition.id.clone()))
            .collect();
        unit.abilities = definition.abilities.clone();
        if team == Team::Player {
            let upgrades = self.data.upgrades.compute_for_unit(definition, &self.progress.upgrades);
            unit.modifiers.extend(upgrades.modifiers);
            unit.abilities = merge_abilities(&definition.abilities, &upgrades.granted_abilities);
        }
        unit.recompute_stats();
        unit.health = Health::new(unit.stats.max_health);

        let id = self.state.units.insert(unit);
        debug!(unit = id, unit_type, team = ?team, "Unit spawned");
        Ok(id)
    }

    /// Move a unit to a position inside the arena.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnitNotFound`] for unknown ids and
    /// [`GameError::ImmovableUnit`] for structures.
    pub fn move_unit(&mut self, id: UnitId, position: Vec2Fixed) -> Result<()> {
        let Some(unit) = self.state.units.get_mut(id) else {
            warn!(unit = id, "Move rejected: unknown unit");
            return Err(GameError::UnitNotFound(id));
        };
        if unit.is_structure() {
            warn!(unit = id, "Move rejected: unit is immovable");
            return Err(GameError::ImmovableUnit(id));
        }
        unit.position = self.config.clamp_to_arena(position);
        Ok(())
    }

    /// Move several units, returning the ids that were rejected.
    pub fn move_units(&mut self, moves: &[(UnitId, Vec2Fixed)]) -> Vec<UnitId> {
        moves
            .iter()
            .filter_map(|&(id, position)| self.move_unit(id, position).err().map(|_| id))
            .collect()
    }

    /// Add a living unit to the selection.
    pub fn select_unit(&mut self, id: UnitId) -> bool {
        if self.state.units.get(id).is_some_and(Unit::is_alive) {
            self.selected.insert(id);
            true
        } else {
            false
        }
    }

    /// Clear the selection.
    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Selected unit ids in ascending order.
    #[must_use]
    pub fn selected_units(&self) -> Vec<UnitId> {
        self.selected.iter().copied().collect()
    }

    /// Attach a modifier to a unit and recompute its stats.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnitNotFound`] for unknown ids.
    pub fn add_modifier(&mut self, id: UnitId, modifier: ActiveModifier) -> Result<StackOutcome> {
        let Some(unit) = self.state.units.get_mut(id) else {
            return Err(GameError::UnitNotFound(id));
        };
        let outcome = add_or_stack_modifier(&mut unit.modifiers, modifier);
        unit.recompute_stats();
        Ok(outcome)
    }

    /// Facts for prerequisite checks: owned levels, highest wave and living
    /// player units by type.
    #[must_use]
    pub fn prerequisite_context(&self) -> PrerequisiteContext {
        let mut ctx = PrerequisiteContext::from_states(&self.progress.upgrades).with_wave(self.progress.highest_wave);
        for unit in self.state.units.iter().filter(|u| u.team == Team::Player && u.is_alive()) {
            *ctx.unit_counts.entry(unit.unit_type.clone()).or_insert(0) += 1;
        }
        ctx
    }

    /// Price and eligibility of an upgrade's next level.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownUpgrade`] for unregistered ids.
    pub fn cost_check(&self, upgrade_id: &str) -> Result<CostCheck> {
        self.data.upgrades.calculate_cost(
            upgrade_id,
            self.progress.level(upgrade_id),
            &self.prerequisite_context(),
            self.progress.currency,
        )
    }

    /// Buy the next level of an upgrade.
    ///
    /// Returns `false` when the upgrade is unknown or the purchase is
    /// refused. On success living player units pick up the new level.
    pub fn purchase_upgrade(&mut self, upgrade_id: &str) -> bool {
        let check = match self.cost_check(upgrade_id) {
            Ok(check) => check,
            Err(e) => {
                warn!(upgrade = %upgrade_id, error = %e, "Purchase rejected");
                return false;
            }
        };
        if !check.can_purchase {
            debug!(upgrade = %upgrade_id, reason = ?check.reason, cost = check.cost, "Purchase refused");
            return false;
        }

        let level = self.progress.record_purchase(upgrade_id, check.cost);
        info!(upgrade = %upgrade_id, level, cost = check.cost, currency = self.progress.currency, "Upgrade purchased");
        self.reapply_upgrades();
        true
    }

    /// Rebuild upgrade modifiers and granted abilities on living player units.
    ///
    /// Current health is clamped, never raised.
    fn reapply_upgrades(&mut self) {
        for id in self.state.units.sorted_ids() {
            let Some(unit) = self.state.units.get_mut(id) else {
                continue;
            };
            if unit.team != Team::Player || !unit.is_alive() {
                continue;
            }
            let Some(definition) = self.data.units.try_get(&unit.unit_type) else {
                continue;
            };
            let upgrades = self.data.upgrades.compute_for_unit(definition, &self.progress.upgrades);
            unit.modifiers.retain(|m| m.source != ModifierSource::Upgrade);
            unit.modifiers.extend(upgrades.modifiers);
            unit.abilities = merge_abilities(&definition.abilities, &upgrades.granted_abilities);
            unit.recompute_stats();
        }
    }

    // ------------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------------

    fn snapshots(&self) -> Vec<UnitSnapshot> {
        self.state
            .units
            .sorted()
            .into_iter()
            .map(UnitSnapshot::of)
            .collect()
    }

    /// Read-only view for renderers.
    #[must_use]
    pub fn snapshot(&self) -> BattleSnapshot {
        let units = self
            .state
            .units
            .sorted()
            .into_iter()
            .map(|u| UnitView {
                id: u.id,
                unit_type: u.unit_type.clone(),
                team: u.team,
                x: u.position.x,
                y: u.position.y,
                health: u.health.current,
                max_health: u.health.max,
                target: u.targeting.target,
                is_structure: u.is_structure(),
                selected: self.selected.contains(&u.id),
                hit_flash: u.visual.hit_flash,
                attack_flash: u.visual.attack_flash,
                modifiers: u.modifiers.iter().map(|m| m.modifier.id.clone()).collect(),
            })
            .collect();

        BattleSnapshot {
            tick: self.state.tick,
            elapsed: self.state.elapsed,
            running: self.running,
            wave: self.state.wave,
            outcome: self.state.outcome,
            units,
            projectiles: self
                .state
                .projectiles
                .iter()
                .map(|p| ProjectileView {
                    id: p.id,
                    team: p.team,
                    x: p.position.x,
                    y: p.position.y,
                })
                .collect(),
            shockwaves: self
                .state
                .shockwaves
                .iter()
                .map(|s| ShockwaveView {
                    id: s.id,
                    team: s.team,
                    x: s.origin.x,
                    y: s.origin.y,
                    radius: s.radius,
                })
                .collect(),
            selected: self.selected_units(),
        }
    }

    /// Calculate a hash of the current battle state.
    ///
    /// Two engines with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.state.tick.hash(&mut hasher);
        self.state.elapsed.to_bits().hash(&mut hasher);
        self.state.rng.state().hash(&mut hasher);
        self.state.outcome.hash(&mut hasher);

        let units = self.state.units.sorted();
        units.len().hash(&mut hasher);
        for unit in units {
            unit.id.hash(&mut hasher);
            unit.team.hash(&mut hasher);
            unit.position.x.to_bits().hash(&mut hasher);
            unit.position.y.to_bits().hash(&mut hasher);
            unit.health.current.to_bits().hash(&mut hasher);
            unit.health.max.to_bits().hash(&mut hasher);
            unit.combat.attack_cooldown.to_bits().hash(&mut hasher);
            unit.targeting.target.hash(&mut hasher);
            unit.modifiers.len().hash(&mut hasher);
            for modifier in &unit.modifiers {
                modifier.modifier.id.hash(&mut hasher);
                modifier.source_id.hash(&mut hasher);
                modifier.stacks.hash(&mut hasher);
                modifier.duration.map(Fixed::to_bits).hash(&mut hasher);
            }
            for (ability, remaining) in unit.cooldowns.iter() {
                ability.hash(&mut hasher);
                remaining.to_bits().hash(&mut hasher);
            }
        }

        for projectile in &self.state.projectiles {
            projectile.id.hash(&mut hasher);
            projectile.target.hash(&mut hasher);
            projectile.position.x.to_bits().hash(&mut hasher);
            projectile.position.y.to_bits().hash(&mut hasher);
        }
        for shockwave in &self.state.shockwaves {
            shockwave.id.hash(&mut hasher);
            shockwave.radius.to_bits().hash(&mut hasher);
            shockwave.hit.hash(&mut hasher);
        }

        hasher.finish()
    }

    /// Serialize battle state.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn save_state(&self) -> Result<Vec<u8>> {
        bincode::serialize(&self.state)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize battle: {e}")))
    }

    /// Replace battle state with a saved one. The engine is left stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a saved battle.
    pub fn restore_state(&mut self, data: &[u8]) -> Result<()> {
        let state: BattleState = bincode::deserialize(data)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize battle: {e}")))?;
        self.state = state;
        self.selected.retain(|id| self.state.units.contains(*id));
        self.pending.clear();
        self.running = false;
        Ok(())
    }
}
