//! Unit behavior systems.
//!
//! Systems contain the logic that decides what units do each tick.
//! Each system should do one thing well.
//!
//! All systems are pure functions over a [`BattleView`](crate::snapshot::BattleView)
//! snapshot. They return result structs; the engine applies them after every
//! unit has been evaluated, so no unit sees another's partial update.

pub mod combat;
pub mod movement;
pub mod projectiles;
pub mod targeting;
pub mod visual;

pub use combat::{resolve_combat, select_attack_mode, AttackIntent, CombatResult, Delivery};
pub use movement::{avoidance_displacement, resolve_movement, MovementResult};
pub use projectiles::{advance_projectile, advance_shockwave, ProjectileUpdate, ShockwaveUpdate};
pub use targeting::{find_target, TargetingResult};
pub use visual::decay_visual_state;
