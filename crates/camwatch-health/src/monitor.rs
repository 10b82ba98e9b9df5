//! Monitor loop: the polling cycle that drives every other component.
//!
//! Each cycle reloads the fleet document, reads the liveness feeds,
//! works out the window phase and, inside the active window, checks
//! every camera. All mutable loop state lives in [`LoopState`], which
//! the caller owns and passes into each cycle.

use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use camwatch_core::{CameraConfig, CameraId, Clock, ConfigStore, WindowPhase};
use camwatch_state::{StatusReader, StatusSnapshot};

use crate::checker::{StalenessEvaluator, camera_ip};
use crate::error::HealthResult;
use crate::probe::ReachabilityProbe;
use crate::remediate::{Remediator, RestartReason};
use crate::throttle::RestartThrottle;

/// State carried from one cycle to the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopState {
    /// The one-shot pre-opening restart has fired in the current window.
    pub pre_opening_done: bool,
    /// Phase seen by the previous cycle, for transition logging.
    pub last_phase: Option<WindowPhase>,
}

/// What happened to one restart attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartOutcome {
    Dispatched(RestartReason),
    Throttled(RestartReason),
    DispatchFailed(RestartReason),
}

/// Summary of a single cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub phase: WindowPhase,
    /// Cameras evaluated this cycle.
    pub checked: usize,
    pub stale: Vec<CameraId>,
    /// Stale and not answering ping.
    pub offline: Vec<CameraId>,
    /// Stale, but no IP could be derived from the endpoint.
    pub invalid_endpoints: Vec<CameraId>,
    pub restarts: Vec<RestartOutcome>,
}

impl CycleReport {
    fn new(phase: WindowPhase) -> Self {
        Self {
            phase,
            checked: 0,
            stale: Vec::new(),
            offline: Vec::new(),
            invalid_endpoints: Vec::new(),
            restarts: Vec::new(),
        }
    }

    /// Number of restart requests actually sent this cycle.
    pub fn dispatched(&self) -> usize {
        self.restarts
            .iter()
            .filter(|o| matches!(o, RestartOutcome::Dispatched(_)))
            .count()
    }
}

/// The camera fleet health monitor.
pub struct MonitorLoop<C, P> {
    config: ConfigStore,
    status: StatusReader,
    evaluator: StalenessEvaluator,
    probe: P,
    throttle: RestartThrottle,
    remediator: Remediator,
    clock: C,
    interval: Duration,
    pre_opening_lead: Duration,
}

impl<C: Clock, P: ReachabilityProbe> MonitorLoop<C, P> {
    pub fn new(
        config: ConfigStore,
        status: StatusReader,
        probe: P,
        throttle: RestartThrottle,
        remediator: Remediator,
        clock: C,
    ) -> Self {
        Self {
            config,
            status,
            evaluator: StalenessEvaluator::default(),
            probe,
            throttle,
            remediator,
            clock,
            interval: Duration::from_secs(60),
            pre_opening_lead: Duration::from_secs(5 * 60),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_stale_threshold(mut self, threshold: Duration) -> Self {
        self.evaluator = StalenessEvaluator::new(threshold);
        self
    }

    pub fn with_pre_opening_lead(mut self, lead: Duration) -> Self {
        self.pre_opening_lead = lead;
        self
    }

    pub fn throttle(&self) -> &RestartThrottle {
        &self.throttle
    }

    /// Run cycles until `shutdown` fires.
    ///
    /// A failed cycle is logged and the loop sleeps as usual; nothing a
    /// cycle does can end the loop.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut state = LoopState::default();
        info!(
            interval_secs = self.interval.as_secs(),
            config = ?self.config.path(),
            "camera health monitor started"
        );

        loop {
            match self.run_cycle(&mut state).await {
                Ok(report) => debug!(?report, "monitor cycle complete"),
                Err(e) => error!(error = %e, "monitor cycle failed"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => {
                    info!("camera health monitor shutting down");
                    break;
                }
            }
        }
    }

    /// Run one cycle.
    ///
    /// Fails only when the fleet document cannot be loaded; every other
    /// failure is absorbed and reported through logs.
    pub async fn run_cycle(&mut self, state: &mut LoopState) -> HealthResult<CycleReport> {
        let fleet = self.config.load().await?;
        let window = fleet.store_timings.window(self.pre_opening_lead)?;
        let snapshot = self.status.read().await;

        let now = self.clock.now();
        let phase = window.phase(now.time());
        if state.last_phase != Some(phase) {
            let from = state
                .last_phase
                .map_or_else(|| "none".to_string(), |p| p.to_string());
            info!(
                %from,
                to = %phase,
                pre_opening = %window.pre_opening,
                close = %window.close,
                "window phase changed"
            );
        }
        state.last_phase = Some(phase);

        let mut report = CycleReport::new(phase);

        match phase {
            WindowPhase::ActiveWindow => {
                if !state.pre_opening_done {
                    info!(at = %now.format("%H:%M:%S"), "pre-opening restart triggered");
                    let outcome = self.attempt_restart(RestartReason::PreOpening, now);
                    report.restarts.push(outcome);
                    state.pre_opening_done = true;
                }

                let cameras = fleet.camera_list();
                info!(
                    at = %now.format("%Y-%m-%d %H:%M:%S"),
                    cameras = cameras.len(),
                    "checking camera health"
                );
                for camera in &cameras {
                    self.check_camera(camera, &snapshot, now, &mut report).await;
                }
            }
            WindowPhase::BeforeWindow | WindowPhase::AfterWindow => {
                if state.pre_opening_done {
                    debug!(%phase, "pre-opening restart re-armed");
                }
                state.pre_opening_done = false;
            }
        }

        Ok(report)
    }

    async fn check_camera(
        &mut self,
        camera: &CameraConfig,
        snapshot: &StatusSnapshot,
        now: NaiveDateTime,
        report: &mut CycleReport,
    ) {
        report.checked += 1;

        let frame_time = snapshot.frame_produced(&camera.id);
        let live_time = snapshot.live_uploaded(&camera.id);
        debug!(camera = %camera.id, ?frame_time, ?live_time, "camera feed times");

        let frame_stale = self.evaluator.is_stale(frame_time, now);
        let live_stale = self.evaluator.is_stale(live_time, now);
        if !frame_stale && !live_stale {
            return;
        }

        warn!(camera = %camera.id, frame_stale, live_stale, "camera feed is stale");
        report.stale.push(camera.id.clone());

        let Some(ip) = camera_ip(&camera.endpoint) else {
            error!(camera = %camera.id, "invalid camera endpoint, no ip to probe");
            report.invalid_endpoints.push(camera.id.clone());
            return;
        };

        if self.probe.probe(ip).await.is_reachable() {
            warn!(camera = %camera.id, %ip, "camera is stale but reachable, restarting service");
            let reason = RestartReason::StaleCamera {
                camera: camera.id.clone(),
            };
            let outcome = self.attempt_restart(reason, now);
            report.restarts.push(outcome);
        } else {
            error!(camera = %camera.id, %ip, "camera is offline");
            report.offline.push(camera.id.clone());
        }
    }

    /// Throttle check, optimistic record, then dispatch.
    fn attempt_restart(&mut self, reason: RestartReason, now: NaiveDateTime) -> RestartOutcome {
        if !self.throttle.can_restart(now) {
            warn!(
                %reason,
                remaining_secs = self.throttle.remaining(now).as_secs(),
                "service restart skipped: too soon since last restart"
            );
            return RestartOutcome::Throttled(reason);
        }

        self.throttle.record_restart(now);
        match self.remediator.restart_service(reason.clone(), now) {
            Ok(()) => RestartOutcome::Dispatched(reason),
            Err(e) => {
                error!(critical = true, %reason, error = %e, "failed to restart service");
                RestartOutcome::DispatchFailed(reason)
            }
        }
    }
}
