//! camwatch-core: shared types for the camera fleet health monitor.
//!
//! Holds the two configuration layers (the per-cycle fleet document and
//! the daemon settings file), the store operating window, and the clock
//! abstraction every time comparison goes through.
//!
//! All times are naive wall-clock values in the store's fixed local
//! offset. Feed timestamps, the restart record and "now" share that
//! representation, so no comparison ever mixes aware and naive values.

pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock, TIMESTAMP_FORMAT};
pub use config::{CameraConfig, ConfigStore, FleetConfig, HourMinute, Settings, StoreTimings};
pub use error::{ConfigError, ConfigResult};
pub use types::*;
