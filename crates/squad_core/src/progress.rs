//! Persisted player progress.
//!
//! Progress is a small versioned record: upgrade levels, the highest wave
//! won and banked currency. It is stored as RON through a [`ProgressStore`]
//! so the core stays free of IO. Loading never fails: missing fields take
//! their defaults and unreadable or mismatched records fall back to a fresh
//! profile.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{GameError, Result};
use crate::upgrades::{UpgradeState, UpgradeStates};

/// Current progress format version.
pub const PROGRESS_VERSION: u32 = 1;

/// Persisted progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerProgress {
    /// Format version.
    pub version: u32,
    /// Upgrade levels and spend.
    pub upgrades: UpgradeStates,
    /// Highest wave won.
    pub highest_wave: u32,
    /// Currency available.
    pub currency: u64,
}

impl Default for PlayerProgress {
    fn default() -> Self {
        Self {
            version: PROGRESS_VERSION,
            upgrades: UpgradeStates::new(),
            highest_wave: 0,
            currency: 0,
        }
    }
}

impl PlayerProgress {
    /// Fresh profile.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set currency.
    #[must_use]
    pub fn with_currency(mut self, currency: u64) -> Self {
        self.currency = currency;
        self
    }

    /// Owned level of an upgrade.
    #[must_use]
    pub fn level(&self, upgrade_id: &str) -> u32 {
        self.upgrades.get(upgrade_id).map_or(0, |s| s.level)
    }

    /// State of an upgrade (default when never bought).
    #[must_use]
    pub fn upgrade_state(&self, upgrade_id: &str) -> UpgradeState {
        self.upgrades.get(upgrade_id).copied().unwrap_or_default()
    }

    /// Deduct `cost` and add a level. Returns the new level.
    ///
    /// Callers check affordability first; currency saturates at zero.
    pub fn record_purchase(&mut self, upgrade_id: &str, cost: u64) -> u32 {
        self.currency = self.currency.saturating_sub(cost);
        let state = self.upgrades.entry(upgrade_id.to_string()).or_default();
        state.level = state.level.saturating_add(1);
        state.total_spent = state.total_spent.saturating_add(cost);
        state.level
    }

    /// Record a won wave, keeping the highest.
    pub fn record_wave(&mut self, wave: u32) {
        self.highest_wave = self.highest_wave.max(wave);
    }

    /// Add currency.
    pub fn add_currency(&mut self, amount: u64) {
        self.currency = self.currency.saturating_add(amount);
    }

    /// Serialize to RON.
    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize progress: {e}")))
    }

    /// Parse a RON record, rejecting unknown versions.
    pub fn from_ron(source: &str) -> Result<Self> {
        let progress: Self = ron::from_str(source).map_err(|e| GameError::DataParseError {
            source_name: "progress".to_string(),
            message: e.to_string(),
        })?;
        if progress.version != PROGRESS_VERSION {
            return Err(GameError::InvalidState(format!(
                "Unsupported progress version {} (expected {PROGRESS_VERSION})",
                progress.version
            )));
        }
        Ok(progress)
    }

    /// Parse a RON record, falling back to a fresh profile on any problem.
    #[must_use]
    pub fn from_ron_or_default(source: &str) -> Self {
        Self::from_ron(source).unwrap_or_else(|e| {
            warn!(error = %e, "Discarding unreadable progress");
            Self::default()
        })
    }
}

/// Storage backend for the progress record.
pub trait ProgressStore {
    /// Read the stored record, if one exists.
    fn load(&self) -> Result<Option<String>>;

    /// Replace the stored record.
    fn save(&mut self, contents: &str) -> Result<()>;
}

/// Progress store held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryProgressStore {
    contents: Option<String>,
}

impl MemoryProgressStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with a record.
    #[must_use]
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Some(contents.into()),
        }
    }
}

impl ProgressStore for MemoryProgressStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.contents.clone())
    }

    fn save(&mut self, contents: &str) -> Result<()> {
        self.contents = Some(contents.to_string());
        Ok(())
    }
}

/// Load progress from a store, never failing.
#[must_use]
pub fn load_progress(store: &dyn ProgressStore) -> PlayerProgress {
    match store.load() {
        Ok(Some(contents)) => PlayerProgress::from_ron_or_default(&contents),
        Ok(None) => PlayerProgress::default(),
        Err(e) => {
            warn!(error = %e, "Progress store unavailable, starting fresh");
            PlayerProgress::default()
        }
    }
}

/// Save progress to a store.
pub fn save_progress(store: &mut dyn ProgressStore, progress: &PlayerProgress) -> Result<()> {
    store.save(&progress.to_ron()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_store() {
        let mut progress = PlayerProgress::new().with_currency(500);
        progress.record_purchase("toughness", 100);
        progress.record_purchase("toughness", 115);
        progress.record_wave(4);

        let mut store = MemoryProgressStore::new();
        save_progress(&mut store, &progress).unwrap();
        let loaded = load_progress(&store);

        assert_eq!(loaded, progress);
        assert_eq!(loaded.level("toughness"), 2);
        assert_eq!(loaded.upgrade_state("toughness").total_spent, 215);
        assert_eq!(loaded.currency, 285);
    }

    #[test]
    fn test_missing_fields_default() {
        let progress = PlayerProgress::from_ron_or_default("(currency: 42)");
        assert_eq!(progress.currency, 42);
        assert_eq!(progress.version, PROGRESS_VERSION);
        assert_eq!(progress.highest_wave, 0);
        assert!(progress.upgrades.is_empty());
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let progress = PlayerProgress::from_ron_or_default("(currency: 7, prestige: 3)");
        assert_eq!(progress.currency, 7);
    }

    #[test]
    fn test_corrupt_input_loads_defaults() {
        let store = MemoryProgressStore::with_contents("{{ not ron");
        assert_eq!(load_progress(&store), PlayerProgress::default());
    }

    #[test]
    fn test_version_mismatch_loads_defaults() {
        let progress = PlayerProgress::from_ron_or_default("(version: 99, currency: 1000)");
        assert_eq!(progress, PlayerProgress::default());
        assert!(PlayerProgress::from_ron("(version: 99)").is_err());
    }

    #[test]
    fn test_empty_store_is_fresh() {
        assert_eq!(load_progress(&MemoryProgressStore::new()), PlayerProgress::default());
    }
}
