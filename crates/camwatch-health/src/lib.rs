//! camwatch-health: camera fleet health checking and self-healing.
//!
//! Detects cameras whose ingestion pipeline has stalled, tells a dead
//! camera apart from a broken pipeline with an ICMP probe, and restarts
//! the ingestion service when the pipeline is at fault.
//!
//! # Architecture
//!
//! ```text
//! MonitorLoop (one cycle per interval)
//!   ├── ConfigStore::load()          fleet document, fresh each cycle
//!   ├── StatusReader::read()         liveness feeds, fresh each cycle
//!   ├── StoreWindow::phase()         before / active / after
//!   ├── per camera (active window only)
//!   │   ├── StalenessEvaluator       either feed stale?
//!   │   ├── ReachabilityProbe        camera answers ping?
//!   │   └── RestartThrottle          cooldown elapsed?
//!   └── Remediator ──mpsc──▶ run_dispatcher ──▶ sudo systemctl restart
//! ```
//!
//! # Failure policy
//!
//! Nothing below the loop can stop it. A bad fleet document fails one
//! cycle; a bad feed empties that feed; bad timestamps read as stale;
//! probe failures read as unreachable; dispatch failures are logged.
//! The restart is fire-and-forget and the throttle is updated before
//! dispatch, so a failed restart still counts against the cooldown.

pub mod checker;
pub mod error;
pub mod monitor;
pub mod probe;
pub mod remediate;
pub mod throttle;

pub use checker::{StalenessEvaluator, camera_ip};
pub use error::{HealthError, HealthResult};
pub use monitor::{CycleReport, LoopState, MonitorLoop, RestartOutcome};
pub use probe::{PingPlatform, PingProbe, ProbeResult, ReachabilityProbe};
pub use remediate::{
    Remediator, RestartReason, RestartRequest, ServiceCredential, SystemctlLauncher,
    run_dispatcher,
};
pub use throttle::RestartThrottle;
