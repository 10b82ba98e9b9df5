//! RestartRecordStore: persistence for the last remediation time.
//!
//! The record is a one-field JSON document. It is read once at startup
//! and rewritten after every dispatched restart. Writes land in a
//! sibling temp file that is then renamed over the record, so a crash
//! mid-write leaves either the old record or the new one.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use camwatch_core::clock::{format_timestamp, parse_timestamp};

use crate::error::{StateError, StateResult};
use crate::types::RestartRecordDocument;

#[derive(Debug, Clone)]
pub struct RestartRecordStore {
    path: PathBuf,
}

impl RestartRecordStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the last restart time.
    ///
    /// Any failure is logged and treated as "no restart recorded": a
    /// corrupt record may allow one extra restart but never locks
    /// remediation out.
    pub fn load(&self) -> Option<NaiveDateTime> {
        match self.try_load() {
            Ok(last) => {
                if let Some(last) = last {
                    debug!(path = ?self.path, %last, "loaded last service restart time");
                }
                last
            }
            Err(e) => {
                warn!(error = %e, "could not load last restart time, assuming none");
                None
            }
        }
    }

    /// Load the last restart time, surfacing every failure.
    pub fn try_load(&self) -> StateResult<Option<NaiveDateTime>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StateError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let doc: RestartRecordDocument =
            serde_json::from_slice(&bytes).map_err(|source| StateError::Deserialize {
                path: self.path.clone(),
                source,
            })?;

        match doc.last_service_restarted.as_deref() {
            None | Some("") => Ok(None),
            Some(value) => parse_timestamp(value).map(Some).ok_or_else(|| {
                StateError::InvalidTimestamp {
                    path: self.path.clone(),
                    value: value.to_string(),
                }
            }),
        }
    }

    /// Persist `at` as the last restart time.
    pub fn save(&self, at: NaiveDateTime) -> StateResult<()> {
        let doc = RestartRecordDocument {
            last_service_restarted: Some(format_timestamp(at)),
        };
        let value = serde_json::to_vec(&doc)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StateError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let tmp = self.tmp_path();
        write_synced(&tmp, &value).map_err(|source| StateError::Write {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|source| StateError::Write {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = ?self.path, %at, "restart record stored");
        Ok(())
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

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let mut file = std::fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 3)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn missing_record_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = RestartRecordStore::open(dir.path().join("restart_info.json"));
        assert_eq!(store.try_load().unwrap(), None);
        assert_eq!(store.load(), None);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status").join("restart_info.json");
        let store = RestartRecordStore::open(&path);

        store.save(at(10, 15)).unwrap();
        assert_eq!(store.load(), Some(at(10, 15)));

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, r#"{"last_service_restarted":"2025-06-03 10:15:00"}"#);
        assert!(!store.tmp_path().exists());

        // A second instance sees the same record.
        let reopened = RestartRecordStore::open(&path);
        assert_eq!(reopened.load(), Some(at(10, 15)));
    }

    #[test]
    fn save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = RestartRecordStore::open(dir.path().join("restart_info.json"));
        store.save(at(10, 15)).unwrap();
        store.save(at(11, 0)).unwrap();
        assert_eq!(store.load(), Some(at(11, 0)));
    }

    #[test]
    fn truncated_record_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("restart_info.json");
        std::fs::write(&path, r#"{"last_service_restarted": "2025-06"#).unwrap();
        let store = RestartRecordStore::open(&path);
        assert!(matches!(
            store.try_load(),
            Err(StateError::Deserialize { .. })
        ));
        assert_eq!(store.load(), None);
    }

    #[test]
    fn bad_timestamp_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("restart_info.json");
        std::fs::write(&path, r#"{"last_service_restarted": "yesterday"}"#).unwrap();
        let store = RestartRecordStore::open(&path);
        assert!(matches!(
            store.try_load(),
            Err(StateError::InvalidTimestamp { .. })
        ));
        assert_eq!(store.load(), None);
    }

    #[test]
    fn empty_or_null_field_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("restart_info.json");
        let store = RestartRecordStore::open(&path);

        std::fs::write(&path, r#"{"last_service_restarted": null}"#).unwrap();
        assert_eq!(store.try_load().unwrap(), None);

        std::fs::write(&path, r#"{}"#).unwrap();
        assert_eq!(store.try_load().unwrap(), None);
    }

    #[test]
    fn save_to_unwritable_location_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a dir").unwrap();
        let store = RestartRecordStore::open(blocker.join("restart_info.json"));
        assert!(matches!(
            store.save(at(10, 0)),
            Err(StateError::Write { .. })
        ));
    }
}
