//! Service remediation.
//!
//! The monitor never runs the restart itself. It sends a
//! [`RestartRequest`] through a [`Remediator`]; a dispatcher task
//! ([`run_dispatcher`]) owns the receiving end and launches the
//! privileged command without waiting for it.

use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use camwatch_core::CameraId;

use crate::error::{HealthError, HealthResult};

/// Why a restart was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartReason {
    /// Daily preventive restart at the start of the window.
    PreOpening,
    /// A camera's feeds went stale while it still answers ping.
    StaleCamera { camera: CameraId },
}

impl fmt::Display for RestartReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartReason::PreOpening => write!(f, "pre-opening"),
            RestartReason::StaleCamera { camera } => write!(f, "stale camera {camera}"),
        }
    }
}

/// A one-way request to restart the ingestion service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartRequest {
    pub service: String,
    pub reason: RestartReason,
    pub requested_at: NaiveDateTime,
}

/// Sending half of the remediation channel.
#[derive(Debug, Clone)]
pub struct Remediator {
    service: String,
    tx: mpsc::Sender<RestartRequest>,
}

impl Remediator {
    /// Create a remediator and the receiver its requests arrive on.
    pub fn channel(
        service: impl Into<String>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<RestartRequest>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                service: service.into(),
                tx,
            },
            rx,
        )
    }

    /// Request a restart. Returns once the request is queued.
    pub fn restart_service(&self, reason: RestartReason, now: NaiveDateTime) -> HealthResult<()> {
        error!(
            critical = true,
            service = %self.service,
            %reason,
            "restarting service due to upload delay"
        );
        self.tx
            .try_send(RestartRequest {
                service: self.service.clone(),
                reason,
                requested_at: now,
            })
            .map_err(|e| HealthError::Remediation(format!("restart request not queued: {e}")))
    }
}

/// Credential for `sudo -S`. Never printed.
#[derive(Clone)]
pub struct ServiceCredential(String);

impl ServiceCredential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Read from an environment variable; empty or unset means none.
    pub fn from_env(var: &str) -> Option<Self> {
        std::env::var(var)
            .ok()
            .filter(|v| !v.is_empty())
            .map(Self)
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ServiceCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ServiceCredential(<redacted>)")
    }
}

/// Launches `sudo systemctl restart <service>`.
#[derive(Debug, Clone)]
pub struct SystemctlLauncher {
    program: String,
    credential: Option<ServiceCredential>,
    delay: Duration,
}

impl SystemctlLauncher {
    pub fn new(credential: Option<ServiceCredential>) -> Self {
        Self {
            program: "sudo".to_string(),
            credential,
            delay: Duration::ZERO,
        }
    }

    /// Wait this long before launching, so the log line goes out first.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Arguments passed to the privilege-escalation program.
    ///
    /// With a credential it is read from stdin (`-S`) with an empty
    /// prompt; without one sudo must not prompt at all (`-n`).
    pub fn args(&self, service: &str) -> Vec<String> {
        let mut args: Vec<String> = match self.credential {
            Some(_) => vec!["-S".into(), "-p".into(), String::new()],
            None => vec!["-n".into()],
        };
        args.extend(["systemctl".into(), "restart".into(), service.to_string()]);
        args
    }

    async fn execute(self, request: RestartRequest) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(self.args(&request.service))
            .stdin(if self.credential.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!(
                    critical = true,
                    service = %request.service,
                    error = %e,
                    "failed to restart service"
                );
                return;
            }
        };

        if let (Some(credential), Some(mut stdin)) = (&self.credential, child.stdin.take()) {
            let line = format!("{}\n", credential.expose());
            if let Err(e) = stdin.write_all(line.as_bytes()).await {
                warn!(service = %request.service, error = %e, "could not pass credential to sudo");
            }
        }

        match child.wait().await {
            Ok(status) => debug!(service = %request.service, %status, "restart command exited"),
            Err(e) => debug!(service = %request.service, error = %e, "restart command lost"),
        }
    }
}

/// Drain restart requests and launch each one without waiting for it.
///
/// Returns when every [`Remediator`] has been dropped, after the
/// launches still in flight have been reaped.
pub async fn run_dispatcher(mut rx: mpsc::Receiver<RestartRequest>, launcher: SystemctlLauncher) {
    let mut in_flight = JoinSet::new();
    debug!("remediation dispatcher starting");

    while let Some(request) = rx.recv().await {
        while in_flight.try_join_next().is_some() {}
        debug!(
            service = %request.service,
            reason = %request.reason,
            requested_at = %request.requested_at,
            "dispatching restart request"
        );
        in_flight.spawn(launcher.clone().execute(request));
    }

    while in_flight.join_next().await.is_some() {}
    debug!("remediation dispatcher stopped");
}
