// ── File-backed view preferences ──
//
// A flat TOML table of `key = "value"` strings. The whole table is held in
// memory and rewritten on every `set`; I/O failures are logged and the
// in-memory value still wins for the rest of the session.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use jmxtree_core::PreferenceStore;

use crate::ConfigError;

#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FilePreferences {
    /// Open the store at `path`. A missing or unreadable file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(raw) => toml::from_str(&raw).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "ignoring malformed preferences file");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read preferences file");
                BTreeMap::new()
            }
        };
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn values(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(values)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl PreferenceStore for FilePreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut values = self.values();
        if values.get(key).is_some_and(|v| v == value) {
            return;
        }
        values.insert(key.to_string(), value.to_string());
        match self.persist(&values) {
            Ok(()) => debug!(key, value, "preference saved"),
            Err(error) => {
                warn!(path = %self.path.display(), %error, "failed to save preferences");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs").join("preferences.toml");

        let prefs = FilePreferences::open(&path);
        assert_eq!(prefs.get("view/java.lang/Memory"), None);
        prefs.set("view/java.lang/Memory", "jmx/attributes");
        prefs.set("view/org.apache.camel/routes/folder", "camel/routes");

        let reopened = FilePreferences::open(&path);
        assert_eq!(
            reopened.get("view/java.lang/Memory").as_deref(),
            Some("jmx/attributes")
        );
        let routes = reopened.get("view/org.apache.camel/routes/folder");
        assert_eq!(routes.as_deref(), Some("camel/routes"));
    }

    #[test]
    fn malformed_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();

        let prefs = FilePreferences::open(&path);
        assert_eq!(prefs.get("anything"), None);
        prefs.set("view/java.lang/Memory", "jmx/operations");
        let reopened = FilePreferences::open(&path);
        assert_eq!(
            reopened.get("view/java.lang/Memory").as_deref(),
            Some("jmx/operations")
        );
    }

    #[test]
    fn unwritable_path_reports_io_error_and_keeps_value() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let prefs = FilePreferences::open(blocker.join("preferences.toml"));
        let values = BTreeMap::from([("k".to_string(), "v".to_string())]);
        assert!(matches!(prefs.persist(&values), Err(ConfigError::Io(_))));

        prefs.set("k", "v");
        assert_eq!(prefs.get("k").as_deref(), Some("v"));
    }
}
