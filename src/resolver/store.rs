//! Durable name→symbol resolution store.
//!
//! A single JSON object file mapping simplified names to accepted symbols.
//! The format version is encoded in the file name, so a scoring-logic
//! change that should invalidate old resolutions only has to bump
//! [`STORE_VERSION`] - the engine then reads and writes a fresh file and
//! the stale one is simply never touched again.
//!
//! Loads are best-effort: a missing or corrupt store is an empty store.
//! Writes read the file back, merge, and atomically replace it via a
//! temp-file rename, so concurrent writers can lose an update but can
//! never tear the file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use log::{info, warn};

use crate::normalize::simplify_name;

/// Bump to invalidate every previously stored resolution.
pub const STORE_VERSION: u32 = 4;

/// Durable mapping from simplified name to resolved symbol.
pub struct ResolutionStore {
    path: PathBuf,
    read_enabled: bool,
    write_enabled: bool,
    entries: Mutex<HashMap<String, String>>,
}

impl ResolutionStore {
    /// Open (or create the notion of) the store under `dir`.
    ///
    /// With `clear` set, any existing store file for the current version is
    /// deleted first.
    pub fn open(dir: &Path, read_enabled: bool, write_enabled: bool, clear: bool) -> Self {
        let path = dir.join(format!("symbol_resolve_v{}.json", STORE_VERSION));

        if clear && path.exists() {
            if let Err(e) = fs::remove_file(&path) {
                warn!("Could not clear resolution store {}: {}", path.display(), e);
            }
        }

        let entries = if read_enabled {
            Self::load(&path)
        } else {
            HashMap::new()
        };

        Self {
            path,
            read_enabled,
            write_enabled,
            entries: Mutex::new(entries),
        }
    }

    /// Best-effort load: missing or corrupt files are empty stores.
    fn load(path: &Path) -> HashMap<String, String> {
        match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, String>>(&raw) {
                Ok(map) => {
                    info!(
                        "Loaded resolution store {} with {} entries",
                        path.display(),
                        map.len()
                    );
                    map
                }
                Err(e) => {
                    warn!(
                        "Corrupt resolution store {}, starting empty: {}",
                        path.display(),
                        e
                    );
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        }
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!("Resolution store mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Resolved symbol for a name, if previously accepted.
    pub fn get(&self, name: &str) -> Option<String> {
        if !self.read_enabled {
            return None;
        }
        self.lock_entries().get(&simplify_name(name)).cloned()
    }

    /// Persist an accepted name→symbol mapping.
    ///
    /// Merges the on-disk state first so concurrent writers only race on
    /// individual keys (last writer wins), then replaces the file
    /// atomically. Failures are logged, never raised.
    pub fn put(&self, name: &str, symbol: &str) {
        if !self.write_enabled {
            return;
        }

        let mut entries = self.lock_entries();
        if self.read_enabled {
            for (k, v) in Self::load(&self.path) {
                entries.entry(k).or_insert(v);
            }
        }
        entries.insert(simplify_name(name), symbol.to_uppercase());

        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("Could not create store directory {}: {}", parent.display(), e);
                return;
            }
        }

        let tmp = self.path.with_extension("tmp");
        let serialized = match serde_json::to_string_pretty(&*entries) {
            Ok(s) => s,
            Err(e) => {
                warn!("Could not serialize resolution store: {}", e);
                return;
            }
        };
        if let Err(e) = fs::write(&tmp, serialized) {
            warn!("Could not write resolution store {}: {}", tmp.display(), e);
            return;
        }
        if let Err(e) = fs::rename(&tmp, &self.path) {
            warn!(
                "Could not replace resolution store {}: {}",
                self.path.display(),
                e
            );
        }
    }

    /// Number of in-memory entries.
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Path of the backing file (version-encoded).
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_path_encodes_version() {
        let dir = tempdir().unwrap();
        let store = ResolutionStore::open(dir.path(), true, true, false);
        assert!(store
            .path()
            .to_string_lossy()
            .contains(&format!("symbol_resolve_v{}", STORE_VERSION)));
    }

    #[test]
    fn test_put_get_roundtrip_keyed_by_simplified_name() {
        let dir = tempdir().unwrap();
        let store = ResolutionStore::open(dir.path(), true, true, false);
        store.put("Widget Corp", "wdgt");
        // Surface forms that simplify identically share one entry
        assert_eq!(store.get("The Widget Corporation").as_deref(), Some("WDGT"));
        assert_eq!(store.get("Widget Corp").as_deref(), Some("WDGT"));
        assert_eq!(store.get("Widget Industries"), None);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = ResolutionStore::open(dir.path(), true, true, false);
            store.put("Widget Corp", "WDGT");
        }
        let reopened = ResolutionStore::open(dir.path(), true, true, false);
        assert_eq!(reopened.get("Widget Corp").as_deref(), Some("WDGT"));
    }

    #[test]
    fn test_corrupt_store_treated_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir
            .path()
            .join(format!("symbol_resolve_v{}.json", STORE_VERSION));
        fs::write(&path, "{ not json").unwrap();
        let store = ResolutionStore::open(dir.path(), true, true, false);
        assert!(store.is_empty());
        assert_eq!(store.get("Widget Corp"), None);
    }

    #[test]
    fn test_clear_on_open() {
        let dir = tempdir().unwrap();
        {
            let store = ResolutionStore::open(dir.path(), true, true, false);
            store.put("Widget Corp", "WDGT");
        }
        let cleared = ResolutionStore::open(dir.path(), true, true, true);
        assert!(cleared.is_empty());
    }

    #[test]
    fn test_read_disabled_returns_nothing() {
        let dir = tempdir().unwrap();
        {
            let store = ResolutionStore::open(dir.path(), true, true, false);
            store.put("Widget Corp", "WDGT");
        }
        let no_read = ResolutionStore::open(dir.path(), false, true, false);
        assert_eq!(no_read.get("Widget Corp"), None);
    }

    #[test]
    fn test_write_disabled_persists_nothing() {
        let dir = tempdir().unwrap();
        {
            let store = ResolutionStore::open(dir.path(), true, false, false);
            store.put("Widget Corp", "WDGT");
        }
        let reopened = ResolutionStore::open(dir.path(), true, true, false);
        assert_eq!(reopened.get("Widget Corp"), None);
    }

    #[test]
    fn test_no_tmp_file_left_behind() {
        let dir = tempdir().unwrap();
        let store = ResolutionStore::open(dir.path(), true, true, false);
        store.put("Widget Corp", "WDGT");
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|x| x == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
