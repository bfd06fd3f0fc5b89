//! Data loader for RON definition files.
//!
//! Reads unit, ability and upgrade definitions from a data directory and
//! builds validated [`GameData`]. Expected layout:
//!
//! ```text
//! assets/data/
//!   units.ron      (required)
//!   abilities.ron  (optional)
//!   upgrades.ron   (optional)
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use squad_core::abilities::AbilityDefinition;
use squad_core::config::BattleConfig;
use squad_core::data::{GameData, UnitDefinition};
use squad_core::error::GameError;
use squad_core::upgrades::UpgradeDefinition;

/// Unit definitions file name.
pub const UNITS_FILE: &str = "units.ron";
/// Ability definitions file name.
pub const ABILITIES_FILE: &str = "abilities.ron";
/// Upgrade definitions file name.
pub const UPGRADES_FILE: &str = "upgrades.ron";

/// Errors that can occur when loading data.
#[derive(Debug, Error)]
pub enum DataLoadError {
    /// Failed to read file from disk.
    #[error("Failed to read file '{path}': {source}")]
    IoError {
        /// Path to the file that failed to load.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse RON content.
    #[error("Failed to parse RON in '{path}': {source}")]
    ParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Underlying RON parsing error.
        #[source]
        source: ron::error::SpannedError,
    },

    /// A required file is missing.
    #[error("Required data file not found: {0}")]
    MissingFile(String),

    /// Definitions could not be registered.
    #[error(transparent)]
    Registry(#[from] GameError),

    /// Cross-reference validation failed.
    #[error("Validation failed with {} issue(s): {}", .errors.len(), .errors.join("; "))]
    ValidationError {
        /// List of validation errors.
        errors: Vec<String>,
    },
}

/// Result type for data loading operations.
pub type DataLoadResult<T> = std::result::Result<T, DataLoadError>;

/// Definitions read from a data directory, not yet registered.
#[derive(Debug, Clone, Default)]
pub struct RawDefinitions {
    /// Unit definitions.
    pub units: Vec<UnitDefinition>,
    /// Ability definitions.
    pub abilities: Vec<AbilityDefinition>,
    /// Upgrade definitions.
    pub upgrades: Vec<UpgradeDefinition>,
}

fn read_file(path: &Path) -> DataLoadResult<String> {
    let path_str = path.display().to_string();

    let mut file = std::fs::File::open(path).map_err(|e| DataLoadError::IoError {
        path: path_str.clone(),
        source: e,
    })?;

    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| DataLoadError::IoError {
            path: path_str,
            source: e,
        })?;

    Ok(contents)
}

/// Load any RON value from a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_ron_file<T: DeserializeOwned>(path: &Path) -> DataLoadResult<T> {
    let contents = read_file(path)?;
    ron::from_str(&contents).map_err(|e| DataLoadError::ParseError {
        path: path.display().to_string(),
        source: e,
    })
}

fn load_optional_list<T: DeserializeOwned>(path: &Path) -> DataLoadResult<Vec<T>> {
    if !path.exists() {
        tracing::warn!("Optional data file does not exist: {}", path.display());
        return Ok(Vec::new());
    }
    load_ron_file(path)
}

/// Read every definition file in a directory without registering them.
///
/// # Arguments
///
/// * `dir` - Directory containing the definition files.
///
/// # Errors
///
/// Returns an error if `units.ron` is missing or any file fails to read or
/// parse.
pub fn load_raw_definitions(dir: &Path) -> DataLoadResult<RawDefinitions> {
    let units_path = dir.join(UNITS_FILE);
    if !units_path.exists() {
        return Err(DataLoadError::MissingFile(units_path.display().to_string()));
    }

    let raw = RawDefinitions {
        units: load_ron_file(&units_path)?,
        abilities: load_optional_list(&dir.join(ABILITIES_FILE))?,
        upgrades: load_optional_list(&dir.join(UPGRADES_FILE))?,
    };

    tracing::info!(
        "Read {} units, {} abilities, {} upgrades from {}",
        raw.units.len(),
        raw.abilities.len(),
        raw.upgrades.len(),
        dir.display()
    );

    Ok(raw)
}

/// Load and validate game data from a directory.
///
/// # Errors
///
/// Returns an error if any file fails to load, an id is duplicated, or a
/// cross-reference is broken.
pub fn load_game_data(dir: &Path) -> DataLoadResult<GameData> {
    let raw = load_raw_definitions(dir)?;
    let data = GameData::from_definitions(raw.units, raw.abilities, raw.upgrades)?;

    let errors = data.validate();
    if !errors.is_empty() {
        return Err(DataLoadError::ValidationError { errors });
    }

    tracing::info!(
        "Loaded game data with {} units, {} abilities, {} upgrades",
        data.units.len(),
        data.abilities.len(),
        data.upgrades.len()
    );

    Ok(data)
}

/// Load a battle config, or the defaults when no path is given.
///
/// Fields missing from the file keep their default values.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> DataLoadResult<BattleConfig> {
    match path {
        Some(path) => {
            let config: BattleConfig = load_ron_file(path)?;
            tracing::info!("Loaded battle config from {}", path.display());
            Ok(config)
        }
        None => Ok(BattleConfig::default()),
    }
}

/// Default data directory (`assets/data`), checked from the workspace root
/// and from a crate directory.
#[must_use]
pub fn default_data_dir() -> PathBuf {
    let candidates = [PathBuf::from("assets/data"), PathBuf::from("../../assets/data")];
    candidates
        .iter()
        .find(|p| p.join(UNITS_FILE).exists())
        .cloned()
        .unwrap_or_else(|| candidates[0].clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_units_file() {
        let dir = std::env::temp_dir().join("squad_tools_definitely_missing_dir");
        let result = load_raw_definitions(&dir);
        assert!(matches!(result, Err(DataLoadError::MissingFile(_))));
    }

    #[test]
    fn test_no_config_path_gives_defaults() {
        assert_eq!(load_config(None).unwrap(), BattleConfig::default());
    }

    #[test]
    fn test_validation_error_lists_issues() {
        let err = DataLoadError::ValidationError {
            errors: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.to_string(), "Validation failed with 2 issue(s): a; b");
    }
}
