//! camwatch-state: everything the monitor reads from or writes to disk
//! besides its configuration.
//!
//! # Inputs
//!
//! Two liveness feeds maintained by the ingestion pipeline, each a JSON
//! object of `camera id → "YYYY-MM-DD HH:MM:SS"`:
//!
//! - `last_frame_produced.json`: last frame produced per camera.
//! - `last_liveframe_uploaded.json`: last live frame uploaded per camera.
//!
//! plus an optional `last_frame_uploaded.json` with a single
//! `LAST_UPLOAD` timestamp that is only logged.
//!
//! Every feed is optional. A feed that is missing, unreadable or
//! malformed degrades to empty without affecting the other feeds.
//!
//! # Outputs
//!
//! The restart record (`restart_info.json`) holding the last time a
//! remediation was dispatched. Writes go through a temp file and a
//! rename, and anything unreadable loads as "no restart recorded".

pub mod error;
pub mod status;
pub mod store;
pub mod types;

pub use error::{StateError, StateResult};
pub use status::StatusReader;
pub use store::RestartRecordStore;
pub use types::*;
