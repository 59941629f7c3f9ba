//! Health monitor — background task that probes every session service.
//!
//! One task per registry. It waits for the configured interval (or a
//! force trigger), probes each service in registration order, and on
//! the first failure evicts that service and restarts the scan from a
//! fresh snapshot.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use simhub_proto::{MessageChannel, WorkerId};

use crate::checker::probe_worker;

/// A service to probe, as seen when the snapshot was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub worker_id: WorkerId,
    pub url: String,
}

/// The monitor's view of whoever owns the worker records.
#[async_trait]
pub trait WorkerFleet: Send + Sync + 'static {
    /// Every registered service, in registration order.
    async fn probe_targets(&self) -> Vec<ProbeTarget>;

    /// Remove a service and every session it hosts.
    ///
    /// Returns false if the service was already gone.
    async fn evict(&self, worker_id: WorkerId) -> bool;
}

/// Monitor timing and identity.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Wait between passes when nothing forces one.
    pub interval: Duration,
    /// Deadline for a single probe.
    pub probe_timeout: Duration,
    /// The broker's own address, passed as the sender of every probe.
    pub self_address: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            probe_timeout: Duration::from_secs(5),
            self_address: "simhub".to_string(),
        }
    }
}

/// Lifecycle of the monitor task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    Idle,
    Running,
    Stopped,
}

/// Drives the health loop for one registry.
///
/// Holds the channel and the wake-up signals. The task handle itself is
/// kept in a `MonitorSlot` inside the owner's locked state.
pub struct HealthMonitor {
    config: MonitorConfig,
    channel: Arc<dyn MessageChannel>,
    /// Force trigger. `notify_one` stores a permit, so a trigger raised
    /// mid-pass shortens the next wait.
    trigger: Arc<Notify>,
    shutdown_tx: watch::Sender<bool>,
}

impl HealthMonitor {
    /// Create a new health monitor. Nothing runs until `spawn`.
    pub fn new(config: MonitorConfig, channel: Arc<dyn MessageChannel>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            channel,
            trigger: Arc::new(Notify::new()),
            shutdown_tx,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Start the background loop over `fleet`.
    pub fn spawn<F: WorkerFleet>(&self, fleet: F) -> JoinHandle<()> {
        let config = self.config.clone();
        let channel = Arc::clone(&self.channel);
        let trigger = Arc::clone(&self.trigger);
        let shutdown = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            run_health_loop(fleet, config, channel, trigger, shutdown).await;
        })
    }

    /// Cut the current wait short.
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    /// Signal the loop to stop and wait for it to observe the signal.
    ///
    /// A probe already in flight is allowed to finish.
    pub async fn stop(&self, handle: Option<JoinHandle<()>>) {
        self.shutdown_tx.send_replace(true);
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "health monitor task did not exit cleanly");
            }
        }
    }

    /// Run a single probe pass now, on the caller's task.
    pub async fn run_pass<F: WorkerFleet + ?Sized>(&self, fleet: &F) -> Vec<WorkerId> {
        let shutdown = self.shutdown_tx.subscribe();
        sweep(fleet, self.channel.as_ref(), &self.config, &shutdown).await
    }
}

/// Owner-side slot for the monitor task.
///
/// Kept inside the registry's locked state so starting, triggering and
/// stopping are serialized with every other registry operation.
#[derive(Debug, Default)]
pub struct MonitorSlot {
    phase: Phase,
}

#[derive(Debug, Default)]
enum Phase {
    #[default]
    Idle,
    Running(JoinHandle<()>),
    Stopped,
}

impl MonitorSlot {
    pub fn state(&self) -> MonitorState {
        match self.phase {
            Phase::Idle => MonitorState::Idle,
            Phase::Running(_) => MonitorState::Running,
            Phase::Stopped => MonitorState::Stopped,
        }
    }

    /// Spawn the loop if it has never run. Returns true if it was started now.
    ///
    /// `fleet` is only built when a spawn actually happens. A stopped
    /// slot stays stopped.
    pub fn ensure_running<F, B>(&mut self, monitor: &HealthMonitor, fleet: B) -> bool
    where
        F: WorkerFleet,
        B: FnOnce() -> F,
    {
        match self.phase {
            Phase::Idle => {
                self.phase = Phase::Running(monitor.spawn(fleet()));
                info!(
                    interval = ?monitor.config.interval,
                    probe_timeout = ?monitor.config.probe_timeout,
                    "health monitor started"
                );
                true
            }
            Phase::Running(_) | Phase::Stopped => false,
        }
    }

    /// Move to `Stopped` and hand back the task handle, if there was one.
    pub fn take_for_shutdown(&mut self) -> Option<JoinHandle<()>> {
        match std::mem::replace(&mut self.phase, Phase::Stopped) {
            Phase::Running(handle) => Some(handle),
            Phase::Idle | Phase::Stopped => None,
        }
    }
}

/// The health loop for one registry.
async fn run_health_loop<F: WorkerFleet>(
    fleet: F,
    config: MonitorConfig,
    channel: Arc<dyn MessageChannel>,
    trigger: Arc<Notify>,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!(interval = ?config.interval, "health loop starting");

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(config.interval) => {}
            _ = trigger.notified() => {
                debug!("forced health check");
            }
            _ = shutdown.changed() => {
                break;
            }
        }

        let evicted = sweep(&fleet, channel.as_ref(), &config, &shutdown).await;
        if !evicted.is_empty() {
            info!(evicted = evicted.len(), "health pass evicted session services");
        }
    }

    info!("health monitor stopped");
}

/// Probe every service; on the first failure evict it and rescan.
///
/// Returns the ids evicted by this pass. The stop signal is honored
/// between probes.
async fn sweep<F: WorkerFleet + ?Sized>(
    fleet: &F,
    channel: &dyn MessageChannel,
    config: &MonitorConfig,
    shutdown: &watch::Receiver<bool>,
) -> Vec<WorkerId> {
    let mut evicted = Vec::new();

    'scan: loop {
        let targets = fleet.probe_targets().await;
        debug!(targets = targets.len(), "health scan");

        for target in targets {
            if *shutdown.borrow() {
                break 'scan;
            }

            let result =
                probe_worker(channel, &config.self_address, &target.url, config.probe_timeout)
                    .await;
            if result.is_healthy() {
                continue;
            }

            warn!(
                worker_id = %target.worker_id,
                url = %target.url,
                ?result,
                "session service failed health probe, evicting"
            );
            if fleet.evict(target.worker_id).await {
                evicted.push(target.worker_id);
            }
            continue 'scan;
        }

        break;
    }

    evicted
}
