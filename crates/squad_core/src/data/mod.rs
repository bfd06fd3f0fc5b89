//! Data-driven definitions.
//!
//! This module contains pure data structures for units plus the
//! [`GameData`] bundle the engine is built from. Ability and upgrade
//! definitions live next to their processors.
//!
//! **Note:** This module contains no IO. File loading is handled by
//! `squad_tools`.

mod game_data;
mod unit_data;

pub use game_data::GameData;
pub use unit_data::{UnitDefinition, UnitRegistry};
