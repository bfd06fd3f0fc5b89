//! Upgrade definitions, purchase checks and conversion into unit modifiers.
//!
//! Upgrades are bought with currency outside of battle and persist in
//! [`crate::progress::PlayerProgress`]. Each purchased level turns into
//! permanent modifiers or granted abilities on every unit the upgrade's
//! scope covers.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::data::UnitDefinition;
use crate::error::{GameError, Result};
use crate::math::{decimal_serde, fixed_powi, Fixed};
use crate::modifiers::{ActiveModifier, Modifier, ModifierSource};

/// Added before flooring a cost so values like `114.99999998` land on 115.
const COST_EPSILON: Fixed = Fixed::from_bits(1 << 16);

/// Which units an upgrade affects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeScope {
    /// Every unit.
    Global,
    /// Units of one type.
    UnitType(String),
    /// Units in one category.
    UnitCategory(String),
}

impl UpgradeScope {
    /// The unit type or category this scope names, if any.
    #[must_use]
    pub fn target_id(&self) -> Option<&str> {
        match self {
            Self::Global => None,
            Self::UnitType(id) | Self::UnitCategory(id) => Some(id),
        }
    }

    /// Check whether the scope covers a unit definition.
    #[must_use]
    pub fn applies_to(&self, unit: &UnitDefinition) -> bool {
        match self {
            Self::Global => true,
            Self::UnitType(unit_type) => unit.id == *unit_type,
            Self::UnitCategory(category) => unit.category == *category,
        }
    }
}

/// What a purchased upgrade does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpgradeEffect {
    /// Permanent modifiers, scaled by level.
    StatModifier {
        /// Modifiers granted per level.
        modifiers: Vec<Modifier>,
    },
    /// Grants an ability.
    AbilityGrant {
        /// Ability id.
        ability_id: String,
    },
    /// Makes a unit type available.
    UnlockUnit {
        /// Unit definition id.
        unit_type: String,
    },
}

/// Condition that must hold before an upgrade can be bought.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prerequisite {
    /// Another upgrade at a minimum level.
    Upgrade {
        /// Required upgrade id.
        upgrade_id: String,
        /// Minimum level.
        level: u32,
    },
    /// A wave reached.
    Wave {
        /// Minimum wave.
        wave: u32,
    },
    /// A number of units of a type on the field.
    UnitCount {
        /// Unit definition id.
        unit_type: String,
        /// Minimum count.
        count: u32,
    },
}

/// Kind of a failed prerequisite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrerequisiteKind {
    /// [`Prerequisite::Upgrade`].
    Upgrade,
    /// [`Prerequisite::Wave`].
    Wave,
    /// [`Prerequisite::UnitCount`].
    UnitCount,
}

/// Details of the first prerequisite that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingPrerequisite {
    /// Prerequisite kind.
    pub kind: PrerequisiteKind,
    /// Upgrade or unit type involved.
    pub target_id: Option<String>,
    /// Required amount.
    pub required: u32,
    /// Current amount.
    pub current: u32,
}

/// Facts prerequisites are checked against, assembled per query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrerequisiteContext {
    /// Current level per upgrade id.
    pub upgrade_levels: BTreeMap<String, u32>,
    /// Highest wave reached.
    pub wave: u32,
    /// Living player units per unit type.
    pub unit_counts: BTreeMap<String, u32>,
}

impl PrerequisiteContext {
    /// Empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Context seeded with levels from upgrade states.
    #[must_use]
    pub fn from_states(states: &UpgradeStates) -> Self {
        Self {
            upgrade_levels: states.iter().map(|(id, s)| (id.clone(), s.level)).collect(),
            ..Self::default()
        }
    }

    /// Builder method to set an upgrade level.
    #[must_use]
    pub fn with_upgrade_level(mut self, upgrade_id: impl Into<String>, level: u32) -> Self {
        self.upgrade_levels.insert(upgrade_id.into(), level);
        self
    }

    /// Builder method to set the wave.
    #[must_use]
    pub fn with_wave(mut self, wave: u32) -> Self {
        self.wave = wave;
        self
    }

    /// Builder method to set a unit count.
    #[must_use]
    pub fn with_unit_count(mut self, unit_type: impl Into<String>, count: u32) -> Self {
        self.unit_counts.insert(unit_type.into(), count);
        self
    }

    fn level_of(&self, upgrade_id: &str) -> u32 {
        self.upgrade_levels.get(upgrade_id).copied().unwrap_or(0)
    }

    fn count_of(&self, unit_type: &str) -> u32 {
        self.unit_counts.get(unit_type).copied().unwrap_or(0)
    }
}

impl Prerequisite {
    /// Evaluate against a context, returning what is missing if unmet.
    #[must_use]
    pub fn check(&self, ctx: &PrerequisiteContext) -> Option<MissingPrerequisite> {
        let (kind, target_id, required, current) = match self {
            Self::Upgrade { upgrade_id, level } => (
                PrerequisiteKind::Upgrade,
                Some(upgrade_id.clone()),
                *level,
                ctx.level_of(upgrade_id),
            ),
            Self::Wave { wave } => (PrerequisiteKind::Wave, None, *wave, ctx.wave),
            Self::UnitCount { unit_type, count } => (
                PrerequisiteKind::UnitCount,
                Some(unit_type.clone()),
                *count,
                ctx.count_of(unit_type),
            ),
        };

        (current < required).then_some(MissingPrerequisite {
            kind,
            target_id,
            required,
            current,
        })
    }
}

/// Upgrade definition loaded from data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeDefinition {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Flavor text.
    #[serde(default)]
    pub description: String,
    /// Units affected.
    pub scope: UpgradeScope,
    /// What each level does.
    pub effect: UpgradeEffect,
    /// Price of level 1.
    pub base_cost: u64,
    /// Price growth per level.
    #[serde(default = "default_cost_multiplier", with = "decimal_serde")]
    pub cost_multiplier: Fixed,
    /// Level cap; 0 means unlimited.
    #[serde(default)]
    pub max_level: u32,
    /// Conditions checked in order.
    #[serde(default)]
    pub prerequisites: Vec<Prerequisite>,
}

const fn default_cost_multiplier() -> Fixed {
    Fixed::ONE
}

impl UpgradeDefinition {
    /// Create an upgrade with a flat cost curve and no level cap.
    #[must_use]
    pub fn new(id: impl Into<String>, scope: UpgradeScope, effect: UpgradeEffect, base_cost: u64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            scope,
            effect,
            base_cost,
            cost_multiplier: Fixed::ONE,
            max_level: 0,
            prerequisites: Vec::new(),
        }
    }

    /// Builder method to set the cost multiplier.
    #[must_use]
    pub fn with_cost_multiplier(mut self, multiplier: Fixed) -> Self {
        self.cost_multiplier = multiplier;
        self
    }

    /// Builder method to cap the level.
    #[must_use]
    pub fn with_max_level(mut self, max_level: u32) -> Self {
        self.max_level = max_level;
        self
    }

    /// Builder method to add a prerequisite.
    #[must_use]
    pub fn with_prerequisite(mut self, prerequisite: Prerequisite) -> Self {
        self.prerequisites.push(prerequisite);
        self
    }

    /// Price of the next level when `current_level` levels are owned.
    #[must_use]
    pub fn cost_at(&self, current_level: u32) -> u64 {
        upgrade_cost(self.base_cost, self.cost_multiplier, current_level)
    }
}

/// `floor(base_cost × multiplier^level)`, saturating.
#[must_use]
pub fn upgrade_cost(base_cost: u64, multiplier: Fixed, level: u32) -> u64 {
    let base = Fixed::saturating_from_num(base_cost);
    let scaled = base.saturating_mul(fixed_powi(multiplier.max(Fixed::ZERO), level));
    let floored = scaled.saturating_add(COST_EPSILON).floor();
    floored.to_num::<i64>().max(0) as u64
}

/// Purchase progress for one upgrade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeState {
    /// Levels owned.
    pub level: u32,
    /// Currency spent so far.
    pub total_spent: u64,
}

/// Upgrade states keyed by upgrade id.
pub type UpgradeStates = BTreeMap<String, UpgradeState>;

/// Why a purchase is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseBlock {
    /// The level cap is reached.
    MaxLevel,
    /// A prerequisite is not met.
    PrerequisiteNotMet,
    /// Not enough currency.
    InsufficientFunds,
}

/// Price and eligibility of an upgrade's next level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostCheck {
    /// Price of the next level.
    pub cost: u64,
    /// Whether the purchase would succeed.
    pub can_purchase: bool,
    /// Why not, when refused.
    pub reason: Option<PurchaseBlock>,
    /// First failed prerequisite.
    pub missing_prerequisite: Option<MissingPrerequisite>,
}

impl CostCheck {
    fn blocked(cost: u64, reason: PurchaseBlock) -> Self {
        Self {
            cost,
            can_purchase: false,
            reason: Some(reason),
            missing_prerequisite: None,
        }
    }
}

/// Modifiers and abilities a unit receives from upgrades.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitUpgradeEffects {
    /// Permanent upgrade modifiers.
    pub modifiers: Vec<ActiveModifier>,
    /// Granted ability ids, without duplicates.
    pub granted_abilities: Vec<String>,
}

/// Registry of upgrade definitions.
#[derive(Debug, Clone, Default)]
pub struct UpgradeRegistry {
    upgrades: HashMap<String, UpgradeDefinition>,
    order: Vec<String>,
}

impl UpgradeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an upgrade. Duplicate ids are rejected.
    pub fn register(&mut self, upgrade: UpgradeDefinition) -> Result<()> {
        if self.upgrades.contains_key(&upgrade.id) {
            return Err(GameError::DuplicateDefinition {
                kind: "upgrade",
                id: upgrade.id,
            });
        }
        self.order.push(upgrade.id.clone());
        self.upgrades.insert(upgrade.id.clone(), upgrade);
        Ok(())
    }

    /// Get an upgrade by id.
    pub fn get(&self, id: &str) -> Result<&UpgradeDefinition> {
        self.try_get(id)
            .ok_or_else(|| GameError::UnknownUpgrade(id.to_string()))
    }

    /// Get an upgrade by id, if registered.
    #[must_use]
    pub fn try_get(&self, id: &str) -> Option<&UpgradeDefinition> {
        self.upgrades.get(id)
    }

    /// Check whether an id is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.upgrades.contains_key(id)
    }

    /// Upgrades with exactly this scope, in registration order.
    pub fn by_scope<'a>(&'a self, scope: &'a UpgradeScope) -> impl Iterator<Item = &'a UpgradeDefinition> + 'a {
        self.all().filter(move |u| u.scope == *scope)
    }

    /// Upgrades whose scope covers a unit, in registration order.
    pub fn applicable_to<'a>(&'a self, unit: &'a UnitDefinition) -> impl Iterator<Item = &'a UpgradeDefinition> + 'a {
        self.all().filter(move |u| u.scope.applies_to(unit))
    }

    /// All upgrades in registration order.
    pub fn all(&self) -> impl Iterator<Item = &UpgradeDefinition> {
        self.order.iter().filter_map(|id| self.upgrades.get(id))
    }

    /// Number of registered upgrades.
    #[must_use]
    pub fn len(&self) -> usize {
        self.upgrades.len()
    }

    /// Check whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.upgrades.is_empty()
    }

    /// Price and eligibility of the next level.
    ///
    /// Checks run in order: level cap, prerequisites (first failure wins),
    /// then funds.
    pub fn calculate_cost(
        &self,
        upgrade_id: &str,
        current_level: u32,
        ctx: &PrerequisiteContext,
        currency: u64,
    ) -> Result<CostCheck> {
        let upgrade = self.get(upgrade_id)?;
        let cost = upgrade.cost_at(current_level);

        if upgrade.max_level > 0 && current_level >= upgrade.max_level {
            return Ok(CostCheck::blocked(cost, PurchaseBlock::MaxLevel));
        }

        if let Some(missing) = upgrade.prerequisites.iter().find_map(|p| p.check(ctx)) {
            return Ok(CostCheck {
                missing_prerequisite: Some(missing),
                ..CostCheck::blocked(cost, PurchaseBlock::PrerequisiteNotMet)
            });
        }

        if currency < cost {
            return Ok(CostCheck::blocked(cost, PurchaseBlock::InsufficientFunds));
        }

        Ok(CostCheck {
            cost,
            can_purchase: true,
            reason: None,
            missing_prerequisite: None,
        })
    }

    /// Modifiers and granted abilities for a unit type at the given levels.
    #[must_use]
    pub fn compute_for_unit(&self, unit: &UnitDefinition, states: &UpgradeStates) -> UnitUpgradeEffects {
        let mut effects = UnitUpgradeEffects::default();

        for upgrade in self.applicable_to(unit) {
            let level = states.get(&upgrade.id).map_or(0, |s| s.level);
            if level == 0 {
                continue;
            }

            match &upgrade.effect {
                UpgradeEffect::StatModifier { modifiers } => {
                    let scale = Fixed::saturating_from_num(level);
                    effects.modifiers.extend(modifiers.iter().map(|modifier| {
                        let scaled = Modifier {
                            id: format!("{}@lv{level}", modifier.id),
                            value: modifier.value.saturating_mul(scale),
                            ..modifier.clone()
                        };
                        ActiveModifier::permanent(scaled, ModifierSource::Upgrade, upgrade.id.clone())
                    }));
                }
                UpgradeEffect::AbilityGrant { ability_id } => {
                    if !effects.granted_abilities.contains(ability_id) {
                        effects.granted_abilities.push(ability_id.clone());
                    }
                }
                UpgradeEffect::UnlockUnit { .. } => {}
            }
        }

        effects
    }

    /// Unit types unlocked by owned upgrades.
    #[must_use]
    pub fn unlocked_units(&self, states: &UpgradeStates) -> BTreeSet<String> {
        self.all()
            .filter(|u| states.get(&u.id).is_some_and(|s| s.level > 0))
            .filter_map(|u| match &u.effect {
                UpgradeEffect::UnlockUnit { unit_type } => Some(unit_type.clone()),
                UpgradeEffect::StatModifier { .. } | UpgradeEffect::AbilityGrant { .. } => None,
            })
            .collect()
    }
}

/// Innate abilities followed by granted ones, without duplicates.
#[must_use]
pub fn merge_abilities(innate: &[String], granted: &[String]) -> Vec<String> {
    let mut merged = Vec::with_capacity(innate.len() + granted.len());
    for id in innate.iter().chain(granted) {
        if !merged.contains(id) {
            merged.push(id.clone());
        }
    }
    merged
}
