//! Progress stored in a RON file on disk.

use std::path::{Path, PathBuf};

use squad_core::error::{GameError, Result};
use squad_core::progress::ProgressStore;

/// [`ProgressStore`] backed by a single file.
///
/// A missing file reads as "no progress yet". Writes go to a sibling
/// temporary file first and are renamed into place.
#[derive(Debug, Clone)]
pub struct FileProgressStore {
    path: PathBuf,
}

impl FileProgressStore {
    /// Store at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File the store reads and writes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProgressStore for FileProgressStore {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        std::fs::read_to_string(&self.path).map(Some).map_err(|e| {
            GameError::InvalidState(format!("Failed to read progress '{}': {e}", self.path.display()))
        })
    }

    fn save(&mut self, contents: &str) -> Result<()> {
        let io_error =
            |e: std::io::Error| GameError::InvalidState(format!("Failed to write progress '{}': {e}", self.path.display()));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let temp = self.path.with_extension("ron.tmp");
        std::fs::write(&temp, contents).map_err(io_error)?;
        std::fs::rename(&temp, &self.path).map_err(io_error)?;
        tracing::debug!("Saved progress to {}", self.path.display());
        Ok(())
    }
}
