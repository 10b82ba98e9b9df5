//! Liveness feed reader.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, error, info};

use camwatch_core::Settings;

use crate::error::{StateError, StateResult};
use crate::types::{Feed, OverallUploadDocument, StatusSnapshot};

/// Reads the liveness feeds fresh on every call.
#[derive(Debug, Clone)]
pub struct StatusReader {
    frame_produced: PathBuf,
    liveframe_uploaded: PathBuf,
    overall_upload: Option<PathBuf>,
    timeout: Duration,
}

impl StatusReader {
    pub fn new(
        frame_produced: impl Into<PathBuf>,
        liveframe_uploaded: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            frame_produced: frame_produced.into(),
            liveframe_uploaded: liveframe_uploaded.into(),
            overall_upload: None,
            timeout,
        }
    }

    /// Also read and log the fleet-wide last upload feed.
    pub fn with_overall_upload(mut self, path: impl Into<PathBuf>) -> Self {
        self.overall_upload = Some(path.into());
        self
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.frame_produced_path(),
            settings.liveframe_uploaded_path(),
            settings.status.read_timeout,
        )
        .with_overall_upload(settings.overall_upload_path())
    }

    /// Read every feed. Never fails: a bad feed is logged and left empty.
    pub async fn read(&self) -> StatusSnapshot {
        let last_frame_produced = match read_feed(&self.frame_produced, self.timeout).await {
            Ok(feed) => feed,
            Err(e) => {
                error!(error = %e, feed = "last_frame_produced", "status feed unavailable");
                Feed::new()
            }
        };

        let last_live_uploaded = match read_feed(&self.liveframe_uploaded, self.timeout).await {
            Ok(feed) => feed,
            Err(e) => {
                error!(error = %e, feed = "last_liveframe_uploaded", "status feed unavailable");
                Feed::new()
            }
        };

        let last_overall_upload = match &self.overall_upload {
            Some(path) => match read_overall_upload(path, self.timeout).await {
                Ok(last) => {
                    info!(last_upload = last.as_deref().unwrap_or("none"), "last overall upload");
                    last
                }
                Err(e) => {
                    error!(error = %e, feed = "last_frame_uploaded", "status feed unavailable");
                    None
                }
            },
            None => None,
        };

        debug!(
            frame_produced = last_frame_produced.len(),
            live_uploaded = last_live_uploaded.len(),
            "status snapshot read"
        );

        StatusSnapshot {
            last_frame_produced,
            last_live_uploaded,
            last_overall_upload,
        }
    }
}

async fn read_bytes(path: &Path, timeout: Duration) -> StateResult<Vec<u8>> {
    match tokio::time::timeout(timeout, tokio::fs::read(path)).await {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(source)) => Err(StateError::Read {
            path: path.to_path_buf(),
            source,
        }),
        Err(_) => Err(StateError::Timeout {
            path: path.to_path_buf(),
        }),
    }
}

/// Read one `camera id → timestamp` feed.
///
/// Entries whose value is not a string are dropped, so the camera reads
/// as absent (and therefore stale).
pub async fn read_feed(path: &Path, timeout: Duration) -> StateResult<Feed> {
    let bytes = read_bytes(path, timeout).await?;
    let raw: HashMap<String, serde_json::Value> =
        serde_json::from_slice(&bytes).map_err(|source| StateError::Deserialize {
            path: path.to_path_buf(),
            source,
        })?;

    let feed = raw
        .into_iter()
        .filter_map(|(camera, value)| match value {
            serde_json::Value::String(ts) => Some((camera, ts)),
            other => {
                debug!(%camera, value = %other, path = ?path, "ignoring non-string feed entry");
                None
            }
        })
        .collect();
    Ok(feed)
}

async fn read_overall_upload(path: &Path, timeout: Duration) -> StateResult<Option<String>> {
    let bytes = read_bytes(path, timeout).await?;
    let doc: OverallUploadDocument =
        serde_json::from_slice(&bytes).map_err(|source| StateError::Deserialize {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(doc.last_upload)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(2);

    fn reader(dir: &Path) -> StatusReader {
        StatusReader::new(
            dir.join("last_frame_produced.json"),
            dir.join("last_liveframe_uploaded.json"),
            TIMEOUT,
        )
        .with_overall_upload(dir.join("last_frame_uploaded.json"))
    }

    #[tokio::test]
    async fn reads_both_feeds() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("last_frame_produced.json"),
            r#"{"cam-1": "2025-06-03 10:00:00", "cam-2": "2025-06-03 10:01:00"}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("last_liveframe_uploaded.json"),
            r#"{"cam-1": "2025-06-03 09:59:00"}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("last_frame_uploaded.json"),
            r#"{"LAST_UPLOAD": "2025-06-03 09:58:00"}"#,
        )
        .unwrap();

        let snapshot = reader(dir.path()).read().await;
        assert_eq!(snapshot.frame_produced("cam-2"), Some("2025-06-03 10:01:00"));
        assert_eq!(snapshot.live_uploaded("cam-1"), Some("2025-06-03 09:59:00"));
        assert_eq!(snapshot.live_uploaded("cam-2"), None);
        assert_eq!(
            snapshot.last_overall_upload.as_deref(),
            Some("2025-06-03 09:58:00")
        );
    }

    #[tokio::test]
    async fn missing_feed_does_not_affect_the_other() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("last_liveframe_uploaded.json"),
            r#"{"cam-1": "2025-06-03 09:59:00"}"#,
        )
        .unwrap();

        let snapshot = reader(dir.path()).read().await;
        assert!(snapshot.last_frame_produced.is_empty());
        assert_eq!(snapshot.last_live_uploaded.len(), 1);
        assert_eq!(snapshot.last_overall_upload, None);
    }

    #[tokio::test]
    async fn malformed_feed_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("last_frame_produced.json"), "{ not json").unwrap();
        std::fs::write(dir.path().join("last_liveframe_uploaded.json"), "[1, 2, 3]").unwrap();

        let snapshot = reader(dir.path()).read().await;
        assert_eq!(snapshot, StatusSnapshot::default());
    }

    #[tokio::test]
    async fn non_string_entries_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.json");
        std::fs::write(
            &path,
            r#"{"cam-1": "2025-06-03 10:00:00", "cam-2": 1717400000, "cam-3": null}"#,
        )
        .unwrap();

        let feed = read_feed(&path, TIMEOUT).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert!(feed.contains_key("cam-1"));
    }

    #[tokio::test]
    async fn read_feed_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_feed(&dir.path().join("absent.json"), TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, StateError::Read { .. }));
    }

    #[test]
    fn from_settings_joins_status_dir() {
        let settings = Settings::default();
        let reader = StatusReader::from_settings(&settings);
        assert_eq!(
            reader.frame_produced,
            PathBuf::from("status/last_frame_produced.json")
        );
        assert_eq!(
            reader.overall_upload,
            Some(PathBuf::from("status/last_frame_uploaded.json"))
        );
    }
}
