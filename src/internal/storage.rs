//! Best-effort durable key-value storage.
//!
//! Each key is one file inside the app data directory. Reads and writes never
//! fail from the caller's point of view: problems are logged and the store
//! degrades to "nothing stored" / "nothing written".

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const APP_DIR: &str = "tui-anime-app";

#[derive(Debug, Clone)]
pub struct KvStore {
    dir: Option<PathBuf>,
}

impl KvStore {
    /// Store rooted at `dir`, created on demand.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        match fs::create_dir_all(&dir) {
            Ok(()) => info!(data_dir = %dir.display(), "Using data directory"),
            Err(e) => warn!(data_dir = %dir.display(), error = %e, "Failed to create data directory"),
        }
        Self { dir: Some(dir) }
    }

    /// Store under the platform data directory, or `override_dir` when given.
    pub fn open_default(override_dir: Option<&Path>) -> Self {
        match override_dir {
            Some(dir) => Self::at(dir),
            None => match dirs::data_dir() {
                Some(base) => Self::at(base.join(APP_DIR)),
                None => {
                    warn!("Could not resolve a data directory; favorites will not persist");
                    Self::disabled()
                }
            },
        }
    }

    /// A store that remembers nothing.
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn path_for(&self, key: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| d.join(format!("{key}.json")))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(key, "No stored value");
                None
            }
            Err(e) => {
                warn!(key, path = %path.display(), error = %e, "Failed to read stored value");
                None
            }
        }
    }

    /// Overwrites `key`. The value lands in a sibling temp file first and is
    /// renamed into place so a crash never leaves a half-written blob.
    pub fn set(&self, key: &str, value: &str) {
        let Some(path) = self.path_for(key) else {
            debug!(key, "Storage disabled; skipping write");
            return;
        };
        if let Err(e) = write_replace(&path, value) {
            warn!(key, path = %path.display(), error = %e, "Failed to write stored value");
        }
    }
}

fn write_replace(path: &Path, value: &str) -> io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, value)?;
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::at(dir.path());

        store.set("theme", "light");
        assert_eq!(store.get("theme").as_deref(), Some("light"));

        store.set("theme", "dark");
        assert_eq!(store.get("theme").as_deref(), Some("dark"));
    }

    #[test]
    fn test_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::at(dir.path());
        assert_eq!(store.get("favorites-v1"), None);
    }

    #[test]
    fn test_disabled_store_swallows_everything() {
        let store = KvStore::disabled();
        store.set("theme", "light");
        assert_eq!(store.get("theme"), None);
        assert_eq!(store.path_for("theme"), None);
    }

    #[test]
    fn test_write_failure_is_absorbed() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::at(dir.path());
        // A directory squatting on the target path makes the rename fail.
        fs::create_dir_all(dir.path().join("blocked.json")).unwrap();

        store.set("blocked", "value");
        assert_eq!(store.get("blocked"), None);
    }
}
