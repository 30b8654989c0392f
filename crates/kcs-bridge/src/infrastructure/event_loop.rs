//! The single-threaded reactor driving one KCS channel.
//!
//! Three event sources feed one loop:
//!
//! - the KCS device becoming readable (a new host request),
//! - a completion arriving from an upstream call task,
//! - a shutdown request (SIGINT or SIGTERM in the daemon).
//!
//! Handlers run one at a time on the current-thread runtime, so the bridge's
//! outstanding-call slot is only ever touched from here.  The D-Bus object
//! server and the upstream call tasks share the same thread and only run at
//! the loop's await points.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sd_notify::NotifyState;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, info, warn};

use crate::application::{AttentionControl, BridgeStats, IpmiExecutor, KcsBridge};
use crate::domain::BridgeConfig;
use crate::infrastructure::ipmi_host::DbusIpmiExecutor;
use crate::infrastructure::kcs_device::KcsDevice;
use crate::infrastructure::sms_server::SmsHandler;

/// Opens the device, claims the channel's bus name and runs until SIGINT or
/// SIGTERM.
///
/// Returns the bridge counters at shutdown.
///
/// # Errors
///
/// Only setup can fail: opening the device, connecting to the system bus,
/// claiming the service name, or installing the signal handlers.  Nothing
/// that happens to an individual transaction ends the loop.
pub async fn run_bridge(config: &BridgeConfig) -> anyhow::Result<BridgeStats> {
    let device = Arc::new(KcsDevice::open(&config.device_path).with_context(|| {
        format!("failed to open KCS device {}", config.device_path.display())
    })?);
    info!("opened KCS device {}", config.device_path.display());

    let control: Arc<dyn AttentionControl> = device.clone();
    let connection = zbus::connection::Builder::system()
        .context("failed to prepare system bus connection")?
        .name(config.service_name.as_str())
        .with_context(|| format!("invalid service name {}", config.service_name))?
        .serve_at(config.object_path.as_str(), SmsHandler::new(control))
        .with_context(|| format!("invalid object path {}", config.object_path))?
        .build()
        .await
        .with_context(|| format!("failed to acquire bus name {}", config.service_name))?;
    info!(
        "serving {} at {} as {}",
        crate::domain::SMS_INTERFACE,
        config.object_path,
        config.service_name
    );
    notify_ready();

    let mut sigint = signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;
    let mut sigterm =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    let shutdown = async move {
        tokio::select! {
            _ = sigint.recv() => info!("SIGINT received; shutting down"),
            _ = sigterm.recv() => info!("SIGTERM received; shutting down"),
        }
    };

    let executor = DbusIpmiExecutor::new(connection);
    Ok(serve(device, executor, config.method_timeout, shutdown).await)
}

/// Tells the service manager the daemon is ready.
///
/// A no-op when `NOTIFY_SOCKET` is unset.  A failed notification is logged
/// and otherwise ignored.
fn notify_ready() {
    match sd_notify::notify(false, &[NotifyState::Ready]) {
        Ok(()) => debug!("readiness notification sent"),
        Err(e) => warn!("failed to notify service manager of readiness: {e}"),
    }
}

/// Runs the bridge loop over `device` until `shutdown` resolves.
///
/// Returns the bridge counters at shutdown.
pub async fn serve<E, F>(
    device: Arc<KcsDevice>,
    executor: E,
    timeout: Option<Duration>,
    shutdown: F,
) -> BridgeStats
where
    E: IpmiExecutor,
    F: Future<Output = ()>,
{
    let (mut bridge, mut completions) = KcsBridge::new(Arc::clone(&device), executor, timeout);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            frame = device.read_frame() => match frame {
                Ok(bytes) => {
                    bridge.on_frame(&bytes);
                }
                Err(e) => warn!("KCS read failed: {e}"),
            },
            Some(completion) = completions.recv() => {
                bridge.on_completion(completion);
            }
            _ = &mut shutdown => break,
        }
    }

    let stats = bridge.stats();
    info!("bridge stopped: {stats}");
    stats
}

// ── Tests ─────────────────────────────────────────────────────────────────────
