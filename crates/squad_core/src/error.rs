//! Error types for the battle simulation.

use thiserror::Error;

use crate::components::UnitId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all battle simulation errors.
///
/// Registry lookups that must succeed (data integrity) return these;
/// player-driven outcomes such as a refused purchase are reported through
/// structured results instead.
#[derive(Debug, Error)]
pub enum GameError {
    /// Unit definition not present in the registry.
    #[error("Unknown unit type: {0}")]
    UnknownUnitType(String),

    /// Ability definition not present in the registry.
    #[error("Unknown ability: {0}")]
    UnknownAbility(String),

    /// Upgrade definition not present in the registry.
    #[error("Unknown upgrade: {0}")]
    UnknownUpgrade(String),

    /// Two definitions share an identifier.
    #[error("Duplicate {kind} definition: {id}")]
    DuplicateDefinition {
        /// Kind of definition (unit, ability, upgrade).
        kind: &'static str,
        /// The duplicated identifier.
        id: String,
    },

    /// Invalid unit reference.
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    /// The unit type cannot be repositioned.
    #[error("Unit {0} is immovable")]
    ImmovableUnit(UnitId),

    /// Unknown stat path in a data file.
    #[error("Unknown stat target: {0}")]
    UnknownStatTarget(String),

    /// Data file parsing error.
    #[error("Failed to parse data '{source_name}': {message}")]
    DataParseError {
        /// Name of the data source that failed to parse.
        source_name: String,
        /// Error message.
        message: String,
    },

    /// Cross-reference validation failed.
    #[error("Data validation failed: {0:?}")]
    ValidationFailed(Vec<String>),

    /// Invalid battle state.
    #[error("Invalid battle state: {0}")]
    InvalidState(String),
}
