//! Persists categories discovered at runtime outside the six built-in labels.
//!
//! The fact store's category set is open (spec §9): rather than mutable
//! module-level state, discovered categories are owned by a `CategoryRegistry`
//! that the engine reads once at open and appends to on disk as new
//! categories appear, so a new name written by one process run is visible to
//! the next without code changes.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::Result;

/// Tracks category labels seen outside the built-in set.
#[derive(Debug)]
pub struct CategoryRegistry {
    path: PathBuf,
    discovered: RwLock<BTreeSet<String>>,
}

impl CategoryRegistry {
    /// Load the registry from `<root>/.discovered-categories.json`, creating
    /// an empty one if the file does not yet exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn open(root: &Path) -> Result<Self> {
        let path = root.join(".discovered-categories.json");
        let discovered = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            let set: BTreeSet<String> = serde_json::from_str(&text)
                .map_err(|e| crate::Error::Serialization(e.to_string()))?;
            debug!(count = set.len(), "loaded discovered category registry");
            set
        } else {
            BTreeSet::new()
        };
        Ok(Self {
            path,
            discovered: RwLock::new(discovered),
        })
    }

    /// Register `label` if it is not already known, persisting the updated
    /// set to disk. Returns whether the label was newly added.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry file cannot be written.
    pub fn register(&self, label: &str) -> Result<bool> {
        {
            let guard = self.discovered.read();
            if guard.contains(label) {
                return Ok(false);
            }
        }
        let mut guard = self.discovered.write();
        if !guard.insert(label.to_string()) {
            return Ok(false);
        }
        let text = serde_json::to_string_pretty(&*guard)
            .map_err(|e| crate::Error::Serialization(e.to_string()))?;
        std::fs::write(&self.path, text)?;
        info!(category = label, "registered new discovered category");
        Ok(true)
    }

    /// All categories discovered so far, beyond the built-in set.
    #[must_use]
    pub fn all(&self) -> Vec<String> {
        self.discovered.read().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_persists_and_deduplicates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = CategoryRegistry::open(dir.path()).expect("open");

        assert!(registry.register("mood").expect("register"));
        assert!(!registry.register("mood").expect("register again"));
        assert_eq!(registry.all(), vec!["mood".to_string()]);

        let reopened = CategoryRegistry::open(dir.path()).expect("reopen");
        assert_eq!(reopened.all(), vec!["mood".to_string()]);
    }
}
