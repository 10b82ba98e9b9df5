//! Restart cooldown.
//!
//! At most one remediation per `min_interval`. The last restart time
//! survives daemon restarts through [`RestartRecordStore`].

use std::time::Duration;

use chrono::{NaiveDateTime, SubsecRound};
use tracing::{error, info, warn};

use camwatch_state::RestartRecordStore;

use crate::error::HealthResult;

#[derive(Debug)]
pub struct RestartThrottle {
    min_interval: Duration,
    last_restart: Option<NaiveDateTime>,
    store: Option<RestartRecordStore>,
}

impl RestartThrottle {
    /// In-memory throttle with no prior restart.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_restart: None,
            store: None,
        }
    }

    /// Throttle backed by a restart record, loaded once here.
    pub fn load(store: RestartRecordStore, min_interval: Duration) -> Self {
        let last_restart = store.load();
        if let Some(last) = last_restart {
            info!(%last, "loaded last service restart time");
        }
        Self {
            min_interval,
            last_restart,
            store: Some(store),
        }
    }

    pub fn last_restart(&self) -> Option<NaiveDateTime> {
        self.last_restart
    }

    /// Whether a restart at `now` is allowed.
    ///
    /// A record dated after `now` means the clock went backwards; it is
    /// ignored rather than blocking remediation until the clock catches up.
    pub fn can_restart(&self, now: NaiveDateTime) -> bool {
        let Some(last) = self.last_restart else {
            return true;
        };
        match (now - last).to_std() {
            Ok(elapsed) => elapsed >= self.min_interval,
            Err(_) => {
                warn!(%last, %now, "last restart is in the future, ignoring it");
                true
            }
        }
    }

    /// Time left before the next restart is allowed.
    pub fn remaining(&self, now: NaiveDateTime) -> Duration {
        self.last_restart
            .and_then(|last| (now - last).to_std().ok())
            .map(|elapsed| self.min_interval.saturating_sub(elapsed))
            .unwrap_or_default()
    }

    /// Record a restart at `now` and persist it.
    ///
    /// `now` is cut to whole seconds, the resolution of the record on
    /// disk, so a reloaded throttle decides exactly as this one does.
    /// The in-memory value is updated even if persisting fails.
    pub fn record_restart(&mut self, now: NaiveDateTime) {
        let now = now.trunc_subsecs(0);
        self.last_restart = Some(now);
        if let Err(e) = self.persist(now) {
            error!(error = %e, "could not save last restart time");
        }
    }

    fn persist(&self, now: NaiveDateTime) -> HealthResult<()> {
        if let Some(store) = &self.store {
            store.save(now)?;
        }
        Ok(())
    }
}
