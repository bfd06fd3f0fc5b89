//! # Squad Core
//!
//! Deterministic battle simulation for squad combat.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No IO
//! - No system randomness (a seeded RNG lives in the battle state)
//! - No floating-point math (uses fixed-point)
//!
//! Renderers and input layers read [`snapshot::BattleSnapshot`] values and
//! issue commands through [`engine::BattleEngine`].
//!
//! ## Crate Structure
//!
//! - [`modifiers`] - Modifier arithmetic, stacking groups and durations
//! - [`stats`] - Base and computed unit statistics
//! - [`abilities`] - Ability definitions, registry and trigger processing
//! - [`upgrades`] - Upgrade definitions, costs, prerequisites and effects
//! - [`systems`] - Per-unit targeting, combat, movement and visual systems
//! - [`engine`] - Battle loop and command surface
//! - [`progress`] - Persisted player progress
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod abilities;
pub mod components;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod math;
pub mod modifiers;
pub mod progress;
pub mod rng;
pub mod snapshot;
pub mod stats;
pub mod systems;
pub mod upgrades;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::abilities::{
        AbilityDefinition, AbilityEffect, AbilityProcessor, AbilityRegistry, AbilityTrigger,
        EffectKind, TargetSelector, TriggerContext, TriggerKind,
    };
    pub use crate::components::*;
    pub use crate::config::{BattleConfig, Obstacle};
    pub use crate::data::{GameData, UnitDefinition, UnitRegistry};
    pub use crate::engine::{BattleEngine, BattleOutcome, TickEvents};
    pub use crate::error::{GameError, Result};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::modifiers::{
        ActiveModifier, Modifier, ModifierKind, ModifierSource, StatTarget,
    };
    pub use crate::progress::{PlayerProgress, ProgressStore};
    pub use crate::snapshot::BattleSnapshot;
    pub use crate::stats::{BaseStats, ComputedStats};
    pub use crate::upgrades::{
        CostCheck, Prerequisite, PrerequisiteContext, UpgradeDefinition, UpgradeEffect,
        UpgradeRegistry, UpgradeScope,
    };
}
