//! Whole-file JSON persistence for the quota and interlock stores.
//!
//! A state file is always read in full and rewritten in full.  Writes go to a
//! sibling `*.tmp` file which is then renamed over the target, so a crash
//! leaves either the old or the new document on disk, never a torn one.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::CorruptStatePolicy;
use crate::error::{Error, Result};
use crate::trace::TraceEvent;

/// A JSON document on disk plus the policy for handling a corrupt copy.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
    on_corrupt: CorruptStatePolicy,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>, on_corrupt: CorruptStatePolicy) -> Self {
        Self {
            path: path.into(),
            on_corrupt,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document.  `Ok(None)` means the file does not exist.
    pub fn read<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .map_err(|e| Error::storage(&self.path, format!("unreadable: {e}")))?;
        let value = serde_json::from_str(&raw)
            .map_err(|e| Error::storage(&self.path, format!("malformed: {e}")))?;
        Ok(Some(value))
    }

    /// Load the document, materializing `init()` when it is missing.
    ///
    /// `validate` runs on every successfully parsed document and may migrate
    /// it or reject it with [`Error::Storage`].  A corrupt document is handled
    /// according to the configured [`CorruptStatePolicy`].
    pub fn load_or_init<T, V, I>(&self, now: DateTime<Utc>, validate: V, init: I) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        V: FnOnce(T) -> Result<T>,
        I: FnOnce() -> T,
    {
        match self.read::<T>().and_then(|doc| doc.map(validate).transpose()) {
            Ok(Some(value)) => Ok(value),
            Ok(None) => {
                let value = init();
                self.save(&value)?;
                TraceEvent::StateCreated {
                    path: self.path.display().to_string(),
                }
                .emit();
                Ok(value)
            }
            Err(err) if err.is_corrupt_state() => match self.on_corrupt {
                CorruptStatePolicy::Fail => Err(err),
                CorruptStatePolicy::Reinitialize => {
                    tracing::warn!(error = %err, "reinitializing corrupt state file");
                    let moved_to = self.quarantine(now)?;
                    TraceEvent::StateQuarantined {
                        path: self.path.display().to_string(),
                        moved_to: moved_to.display().to_string(),
                    }
                    .emit();
                    let value = init();
                    self.save(&value)?;
                    Ok(value)
                }
            },
            Err(err) => Err(err),
        }
    }

    /// Rewrite the whole document atomically.
    pub fn save<T: Serialize>(&self, value: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(value)?;
        let tmp = self.tmp_path();
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Move a corrupt document aside so reinitializing never destroys it.
    fn quarantine(&self, now: DateTime<Utc>) -> Result<PathBuf> {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".corrupt-{}", now.timestamp()));
        let target = self.path.with_file_name(name);
        fs::rename(&self.path, &target)?;
        Ok(target)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    type Doc = BTreeMap<String, u32>;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn seed() -> Doc {
        BTreeMap::from([("a".to_string(), 1)])
    }

    #[test]
    fn missing_file_is_created_from_init() {
        let dir = tempfile::tempdir().unwrap();
        let file = StateFile::new(dir.path().join("nested/doc.json"), CorruptStatePolicy::Fail);

        let doc: Doc = file.load_or_init(now(), Ok, seed).unwrap();
        assert_eq!(doc, seed());
        assert!(file.path().exists());

        let reread: Option<Doc> = file.read().unwrap();
        assert_eq!(reread, Some(seed()));
    }

    #[test]
    fn corrupt_file_fails_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(&path, "{not json").unwrap();

        let file = StateFile::new(&path, CorruptStatePolicy::Fail);
        let err = file.load_or_init::<Doc, _, _>(now(), Ok, seed).unwrap_err();
        assert!(err.is_corrupt_state());
        // Nothing was overwritten.
        assert_eq!(fs::read_to_string(&path).unwrap(), "{not json");
    }

    #[test]
    fn corrupt_file_is_quarantined_when_reinitializing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(&path, "[1, 2").unwrap();

        let file = StateFile::new(&path, CorruptStatePolicy::Reinitialize);
        let doc: Doc = file.load_or_init(now(), Ok, seed).unwrap();
        assert_eq!(doc, seed());

        let moved = dir
            .path()
            .join(format!("doc.json.corrupt-{}", now().timestamp()));
        assert_eq!(fs::read_to_string(moved).unwrap(), "[1, 2");
    }

    #[test]
    fn validation_failure_counts_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(&path, r#"{"a": 7}"#).unwrap();

        let file = StateFile::new(&path, CorruptStatePolicy::Fail);
        let err = file
            .load_or_init::<Doc, _, _>(
                now(),
                |_| Err(Error::storage(&path, "rejected")),
                seed,
            )
            .unwrap_err();
        assert!(err.to_string().contains("rejected"));
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = StateFile::new(dir.path().join("doc.json"), CorruptStatePolicy::Fail);
        file.save(&seed()).unwrap();
        assert!(!dir.path().join("doc.json.tmp").exists());
    }
}
