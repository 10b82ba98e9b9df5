//! On-disk document shapes and the per-cycle status snapshot.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use camwatch_core::CameraId;

/// One liveness feed: camera id → timestamp string.
pub type Feed = HashMap<CameraId, String>;

/// Both liveness feeds as read at the start of a cycle.
///
/// A camera with no entry in a feed is valid input; the evaluator treats
/// it as stale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSnapshot {
    pub last_frame_produced: Feed,
    pub last_live_uploaded: Feed,
    /// Fleet-wide last upload time, informational only.
    pub last_overall_upload: Option<String>,
}

impl StatusSnapshot {
    pub fn frame_produced(&self, camera: &str) -> Option<&str> {
        self.last_frame_produced.get(camera).map(String::as_str)
    }

    pub fn live_uploaded(&self, camera: &str) -> Option<&str> {
        self.last_live_uploaded.get(camera).map(String::as_str)
    }
}

/// `last_frame_uploaded.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverallUploadDocument {
    #[serde(rename = "LAST_UPLOAD", default)]
    pub last_upload: Option<String>,
}

/// `restart_info.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestartRecordDocument {
    #[serde(default)]
    pub last_service_restarted: Option<String>,
}
