//! camwatchd: the camera fleet health monitor daemon.
//!
//! Assembles the monitor from its parts:
//! - Fleet document store (reloaded every cycle)
//! - Liveness feed reader
//! - ICMP reachability probe
//! - Restart throttle backed by the restart record
//! - Remediation dispatcher (`sudo systemctl restart`)
//!
//! # Usage
//!
//! ```text
//! CAMWATCH_SUDO_PASSWORD=... camwatchd --config /etc/camwatch/camwatch.toml run
//! camwatchd --config camwatch.toml once
//! camwatchd --config camwatch.toml check-config
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use camwatch_core::{Clock, ConfigStore, Settings, SystemClock};
use camwatch_health::{
    LoopState, MonitorLoop, PingProbe, Remediator, RestartRequest, RestartThrottle,
    ServiceCredential, SystemctlLauncher, run_dispatcher,
};
use camwatch_state::{RestartRecordStore, StatusReader};

#[derive(Parser)]
#[command(name = "camwatchd", about = "Camera fleet health monitor")]
struct Cli {
    /// Daemon settings file (TOML). Built-in defaults apply when omitted.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the monitor loop until interrupted.
    Run {
        /// Polling interval in seconds, overriding the settings file.
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Run a single monitor cycle and exit.
    Once,
    /// Validate the settings and fleet document, then print the current window.
    CheckConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let mut settings = Settings::load_or_default(cli.config.as_deref())
        .context("failed to load daemon settings")?;

    match cli.command {
        Command::Run { interval } => {
            if let Some(secs) = interval.filter(|s| *s > 0) {
                settings.monitor.interval = Duration::from_secs(secs);
            }
            run(settings).await
        }
        Command::Once => once(settings).await,
        Command::CheckConfig => check_config(&settings).await,
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,camwatchd=debug,camwatch=debug"));

    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
    }
}

type Monitor = MonitorLoop<SystemClock, PingProbe>;

/// Wire the monitor and the dispatcher's launcher from settings.
fn build(
    settings: &Settings,
) -> anyhow::Result<(Monitor, mpsc::Receiver<RestartRequest>, SystemctlLauncher)> {
    let clock = SystemClock::new(settings.utc_offset()?);

    let credential = ServiceCredential::from_env(&settings.remediation.credential_env);
    if credential.is_none() {
        warn!(
            var = %settings.remediation.credential_env,
            "no sudo credential in environment, restarts will use sudo -n"
        );
    }
    let launcher =
        SystemctlLauncher::new(credential).with_delay(settings.remediation.restart_delay);

    let (remediator, rx) = Remediator::channel(settings.remediation.service.clone(), 16);

    let record = RestartRecordStore::open(&settings.remediation.record);
    info!(path = ?record.path(), "restart record opened");
    let throttle = RestartThrottle::load(record, settings.remediation.min_restart_interval);

    let probe = PingProbe::new(settings.probe.count, settings.probe.timeout);

    let monitor = MonitorLoop::new(
        ConfigStore::new(&settings.fleet_config).with_timeout(settings.status.read_timeout),
        StatusReader::from_settings(settings),
        probe,
        throttle,
        remediator,
        clock,
    )
    .with_interval(settings.monitor.interval)
    .with_stale_threshold(settings.monitor.stale_threshold)
    .with_pre_opening_lead(settings.monitor.pre_opening_lead);

    Ok((monitor, rx, launcher))
}

async fn run(settings: Settings) -> anyhow::Result<()> {
    info!(
        service = %settings.remediation.service,
        fleet = ?settings.fleet_config,
        "camwatch daemon starting"
    );

    let (monitor, rx, launcher) = build(&settings)?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start background tasks ─────────────────────────────────

    let dispatcher_handle = tokio::spawn(run_dispatcher(rx, launcher));
    let monitor_handle = tokio::spawn(monitor.run(shutdown_rx));

    shutdown_signal().await;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    // The monitor owns the last remediator, so the dispatcher drains
    // and stops once the monitor is gone.
    let _ = monitor_handle.await;
    let _ = dispatcher_handle.await;

    info!("camwatch daemon stopped");
    Ok(())
}

async fn once(settings: Settings) -> anyhow::Result<()> {
    let (mut monitor, rx, launcher) = build(&settings)?;
    let dispatcher_handle = tokio::spawn(run_dispatcher(rx, launcher));

    let mut state = LoopState::default();
    let result = monitor.run_cycle(&mut state).await;
    drop(monitor);
    let _ = dispatcher_handle.await;

    let report = result?;
    info!(
        phase = %report.phase,
        checked = report.checked,
        stale = report.stale.len(),
        offline = report.offline.len(),
        restarts = report.dispatched(),
        "single cycle complete"
    );
    Ok(())
}

async fn check_config(settings: &Settings) -> anyhow::Result<()> {
    settings.validate()?;
    let clock = SystemClock::new(settings.utc_offset()?);
    let fleet = ConfigStore::new(&settings.fleet_config)
        .with_timeout(settings.status.read_timeout)
        .load()
        .await
        .context("fleet document is invalid")?;
    let window = fleet
        .store_timings
        .window(settings.monitor.pre_opening_lead)?;
    let now = clock.now();

    println!("fleet document: {}", settings.fleet_config.display());
    println!("cameras:        {}", fleet.cameras.len());
    println!("timezone:       {}", clock.offset());
    println!(
        "window:         {} - {}",
        window.pre_opening.format("%H:%M"),
        window.close.format("%H:%M")
    );
    println!(
        "now:            {} ({})",
        now.format("%Y-%m-%d %H:%M:%S"),
        window.phase(now.time())
    );
    println!("service:        {}", settings.remediation.service);
    println!("restart record: {}", settings.remediation.record.display());
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
