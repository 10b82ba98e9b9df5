//! Network-layer reachability probes.
//!
//! The system `ping` binary is used rather than raw ICMP sockets so the
//! daemon needs no extra capabilities. How its result is read depends
//! on the platform; see [`PingPlatform`].

use std::future::Future;
use std::process::{Output, Stdio};
use std::time::Duration;

use tracing::{error, info, warn};

use crate::error::{HealthError, HealthResult};

/// Result of a single reachability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// The camera answered.
    Reachable,
    /// The camera did not answer.
    Unreachable,
    /// Ping ran but its output could not be classified.
    Inconclusive,
    /// The probe could not be executed (spawn error, timeout).
    Failed,
}

impl ProbeResult {
    /// Only a clear answer counts as reachable.
    pub fn is_reachable(self) -> bool {
        self == ProbeResult::Reachable
    }
}

/// Checks whether a camera IP answers on the network.
pub trait ReachabilityProbe: Send + Sync {
    fn probe(&self, ip: &str) -> impl Future<Output = ProbeResult> + Send;
}

/// How `ping` is invoked and how its result is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingPlatform {
    /// Exit status is unreliable; the output text decides.
    Windows,
    /// Linux and macOS: exit status alone decides.
    Unix,
}

impl PingPlatform {
    pub fn current() -> Self {
        if cfg!(windows) {
            PingPlatform::Windows
        } else {
            PingPlatform::Unix
        }
    }

    /// Flag that sets the echo request count.
    pub fn count_flag(self) -> &'static str {
        match self {
            PingPlatform::Windows => "-n",
            PingPlatform::Unix => "-c",
        }
    }

    /// Classify a finished ping run.
    pub fn interpret(self, success: bool, stdout: &str) -> ProbeResult {
        match self {
            PingPlatform::Windows => {
                let output = stdout.to_lowercase();
                if output.contains("destination host unreachable")
                    || output.contains("request timed out")
                {
                    ProbeResult::Unreachable
                } else if output.contains("reply from") {
                    ProbeResult::Reachable
                } else {
                    ProbeResult::Inconclusive
                }
            }
            PingPlatform::Unix => {
                if success {
                    ProbeResult::Reachable
                } else {
                    ProbeResult::Unreachable
                }
            }
        }
    }
}

/// Probe backed by the system `ping` command.
#[derive(Debug, Clone)]
pub struct PingProbe {
    platform: PingPlatform,
    program: String,
    count: u32,
    timeout: Duration,
}

impl PingProbe {
    pub fn new(count: u32, timeout: Duration) -> Self {
        Self {
            platform: PingPlatform::current(),
            program: "ping".to_string(),
            count: count.max(1),
            timeout,
        }
    }

    pub fn with_platform(mut self, platform: PingPlatform) -> Self {
        self.platform = platform;
        self
    }

    /// Use a different ping binary.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn args(&self, ip: &str) -> Vec<String> {
        vec![
            self.platform.count_flag().to_string(),
            self.count.to_string(),
            ip.to_string(),
        ]
    }

    async fn run(&self, ip: &str) -> HealthResult<Output> {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(self.args(ip))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(HealthError::Probe(format!("failed to run {}: {e}", self.program))),
            Err(_) => Err(HealthError::Probe(format!(
                "ping timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

impl ReachabilityProbe for PingProbe {
    async fn probe(&self, ip: &str) -> ProbeResult {
        let output = match self.run(ip).await {
            Ok(output) => output,
            Err(e) => {
                error!(%ip, error = %e, "ping failed");
                return ProbeResult::Failed;
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let result = self.platform.interpret(output.status.success(), &stdout);
        match result {
            ProbeResult::Reachable => info!(%ip, "camera is reachable"),
            ProbeResult::Unreachable => warn!(%ip, "camera is NOT reachable"),
            ProbeResult::Inconclusive => warn!(%ip, "camera ping response unclear"),
            ProbeResult::Failed => {}
        }
        result
    }
}
