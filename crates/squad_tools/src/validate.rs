//! Data validation utilities.

use std::path::Path;

use serde::Serialize;
use squad_core::data::GameData;

use crate::data_loader::{load_raw_definitions, DataLoadResult};

/// Summary of a data directory check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Unit definitions read.
    pub units: usize,
    /// Ability definitions read.
    pub abilities: usize,
    /// Upgrade definitions read.
    pub upgrades: usize,
    /// Every problem found.
    pub issues: Vec<String>,
}

impl ValidationReport {
    /// Check if no problems were found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Validate all RON data files in a directory.
///
/// Duplicate ids and broken cross-references are collected as issues
/// instead of stopping at the first one.
///
/// # Errors
///
/// Returns an error if a data file cannot be read or parsed.
pub fn validate_data_directory(path: &Path) -> DataLoadResult<ValidationReport> {
    let raw = load_raw_definitions(path)?;
    let mut report = ValidationReport {
        units: raw.units.len(),
        abilities: raw.abilities.len(),
        upgrades: raw.upgrades.len(),
        issues: Vec::new(),
    };

    let mut data = GameData::new();
    for unit in raw.units {
        if let Err(e) = data.units.register(unit) {
            report.issues.push(e.to_string());
        }
    }
    for ability in raw.abilities {
        if let Err(e) = data.abilities.register(ability) {
            report.issues.push(e.to_string());
        }
    }
    for upgrade in raw.upgrades {
        if let Err(e) = data.upgrades.register(upgrade) {
            report.issues.push(e.to_string());
        }
    }
    report.issues.extend(data.validate());

    for issue in &report.issues {
        tracing::warn!("{issue}");
    }

    Ok(report)
}
