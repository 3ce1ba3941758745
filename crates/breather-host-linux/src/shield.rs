//! Shield-list file restriction engine

use breather_api::Selection;
use breather_host_api::{HostError, HostResult, RestrictionEngine};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::{lock_exclusive, read_optional, write_atomic};

/// Contents of the shield file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShieldList {
    /// Whether anything is shielded
    pub active: bool,
    #[serde(default)]
    pub selection: Selection,
}

/// Publishes the restricted tokens to a JSON file.
///
/// `clear` always writes an inactive list, so stale lists left by an
/// earlier session are removed too. Writers in every process serialize on
/// the file's advisory lock.
pub struct ShieldFile {
    path: PathBuf,
}

impl ShieldFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current list; a missing or unreadable file is an empty list
    pub fn read(&self) -> ShieldList {
        let content = match read_optional(&self.path) {
            Ok(Some(content)) => content,
            Ok(None) => return ShieldList::default(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read shield file");
                return ShieldList::default();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Corrupt shield file, treating as empty");
            ShieldList::default()
        })
    }

    fn publish(&self, list: &ShieldList) -> HostResult<bool> {
        let _lock = lock_exclusive(&self.path)?;

        if self.path.exists() && self.read() == *list {
            return Ok(false);
        }

        let serialized = serde_json::to_vec_pretty(list)
            .map_err(|e| HostError::Internal(format!("failed to serialize shield list: {e}")))?;
        write_atomic(&self.path, &serialized)?;
        Ok(true)
    }
}

impl RestrictionEngine for ShieldFile {
    fn apply(&self, selection: &Selection) -> HostResult<()> {
        let list = ShieldList {
            active: true,
            selection: selection.clone(),
        };

        let written = self
            .publish(&list)
            .map_err(|e| HostError::ApplyFailed(e.to_string()))?;
        if written {
            info!(path = %self.path.display(), targets = selection.len(), "Shield applied");
        } else {
            debug!("Shield already applied");
        }
        Ok(())
    }

    fn clear(&self) -> HostResult<()> {
        let written = self
            .publish(&ShieldList::default())
            .map_err(|e| HostError::ClearFailed(e.to_string()))?;
        if written {
            info!(path = %self.path.display(), "Shield cleared");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use breather_api::SelectionToken;

    fn selection() -> Selection {
        let mut selection = Selection::default();
        selection.applications.insert(SelectionToken::from("org.example.Feed"));
        selection.web_domains.insert(SelectionToken::from("feed.example.com"));
        selection
    }

    #[test]
    fn apply_then_clear() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ShieldFile::new(dir.path().join("shield.json"));

        engine.apply(&selection()).unwrap();
        let list = engine.read();
        assert!(list.active);
        assert_eq!(list.selection, selection());

        engine.clear().unwrap();
        assert_eq!(engine.read(), ShieldList::default());
    }

    #[test]
    fn clear_without_apply_writes_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shield.json");
        let engine = ShieldFile::new(&path);

        engine.clear().unwrap();
        assert!(path.exists());
        assert!(!engine.read().active);
    }

    #[test]
    fn concurrent_handles_never_fail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shield.json");
        let applier = ShieldFile::new(&path);
        let clearer = ShieldFile::new(&path);

        let failures = std::thread::scope(|scope| {
            let applying = scope.spawn(|| {
                (0..200)
                    .filter(|_| applier.apply(&selection()).is_err())
                    .count()
            });
            let clearing = scope.spawn(|| (0..200).filter(|_| clearer.clear().is_err()).count());
            applying.join().unwrap() + clearing.join().unwrap()
        });

        assert_eq!(failures, 0);
        let list = applier.read();
        assert!(list == ShieldList::default() || list.selection == selection());

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert!(names.iter().all(|name| name.starts_with("shield.json")), "{names:?}");
    }

    #[test]
    fn corrupt_file_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shield.json");
        std::fs::write(&path, "{{{").unwrap();
        let engine = ShieldFile::new(&path);

        assert_eq!(engine.read(), ShieldList::default());
        engine.apply(&selection()).unwrap();
        assert!(engine.read().active);
    }
}
