//! SessionRegistry — the broker.
//!
//! Owns every worker record behind one `tokio::sync::Mutex`, routes
//! sessions to the least-loaded worker, and owns the health monitor that
//! evicts workers which stop answering probes.
//!
//! No network I/O happens under the lock. Probes and broadcasts work on
//! a snapshot of `(id, url)` pairs and take the lock again only to apply
//! an eviction.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use simhub_health::{HealthMonitor, MonitorConfig, MonitorState, ProbeTarget, WorkerFleet};
use simhub_proto::channel::exchange_within;
use simhub_proto::{ChannelRequest, MessageChannel, MissingField, WorkerId};

use crate::error::{RegistryError, RegistryResult};
use crate::model::WorkerSummary;
use crate::state::{Registration, RegistryState};

/// Registry settings.
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    pub monitor: MonitorConfig,
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait between health passes.
    pub fn with_health_interval(mut self, interval: Duration) -> Self {
        self.monitor.interval = interval;
        self
    }

    /// Deadline for one probe or one broadcast delivery.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.monitor.probe_timeout = timeout;
        self
    }

    /// The broker's own address, sent as the origin of every message.
    pub fn with_self_address(mut self, address: impl Into<String>) -> Self {
        self.monitor.self_address = address.into();
        self
    }
}

/// Result of broadcasting a new directory-service address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastReport {
    pub directory_service: String,
    pub delivered: Vec<WorkerId>,
    /// Workers that failed delivery and were evicted.
    pub evicted: Vec<WorkerId>,
}

/// Point-in-time counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub workers: usize,
    pub sessions: usize,
    pub monitor: MonitorState,
    pub directory_service: Option<String>,
}

/// The monitor's handle on the registry state.
struct RegistryFleet {
    state: Arc<Mutex<RegistryState>>,
}

#[async_trait]
impl WorkerFleet for RegistryFleet {
    async fn probe_targets(&self) -> Vec<ProbeTarget> {
        self.state.lock().await.probe_targets()
    }

    async fn evict(&self, worker_id: WorkerId) -> bool {
        let mut state = self.state.lock().await;
        match state.evict(worker_id) {
            Some(worker) => {
                warn!(
                    %worker_id,
                    url = %worker.url(),
                    sessions = worker.session_count(),
                    "session service evicted"
                );
                true
            }
            None => false,
        }
    }
}

/// Central registry of session services and the sessions they host.
///
/// Constructed explicitly by the owning service and torn down with
/// [`SessionRegistry::shutdown`]. Must be used from within a tokio
/// runtime; the health monitor is spawned on first registration.
pub struct SessionRegistry {
    state: Arc<Mutex<RegistryState>>,
    monitor: HealthMonitor,
    channel: Arc<dyn MessageChannel>,
}

impl SessionRegistry {
    /// Create an empty registry. Nothing runs until the first registration.
    pub fn new(config: RegistryConfig, channel: Arc<dyn MessageChannel>) -> Self {
        Self {
            state: Arc::new(Mutex::new(RegistryState::default())),
            monitor: HealthMonitor::new(config.monitor, Arc::clone(&channel)),
            channel,
        }
    }

    fn fleet(&self) -> RegistryFleet {
        RegistryFleet {
            state: Arc::clone(&self.state),
        }
    }

    // ── Workers ────────────────────────────────────────────────────

    /// Register a session service, or return its id if the url is known.
    ///
    /// `sessions` lists sessions the service already hosts; they are
    /// imported unclaimed. Starts the health monitor on first use.
    pub async fn register_worker(&self, url: &str, sessions: Vec<String>) -> WorkerId {
        let mut state = self.state.lock().await;
        let registration = state.register(url, sessions);

        let state_handle = Arc::clone(&self.state);
        state.monitor.ensure_running(&self.monitor, || RegistryFleet {
            state: state_handle,
        });

        if let Registration::Existing(id) = registration {
            debug!(worker_id = %id, %url, "idempotent registration");
        }
        registration.worker_id()
    }

    /// Remove a worker and all of its sessions. Returns false if unknown.
    pub async fn deregister_worker(&self, worker_id: WorkerId) -> bool {
        let mut state = self.state.lock().await;
        match state.evict(worker_id) {
            Some(worker) => {
                info!(
                    %worker_id,
                    url = %worker.url(),
                    sessions = worker.session_count(),
                    "session service deregistered"
                );
                true
            }
            None => false,
        }
    }

    /// All workers in registration order.
    pub async fn workers(&self) -> Vec<WorkerSummary> {
        self.state.lock().await.summaries()
    }

    // ── Sessions ───────────────────────────────────────────────────

    /// Create-or-attach: return the url of the service hosting `session_id`.
    ///
    /// A new session is reserved on the least-loaded worker before this
    /// returns. Fails with `Conflict` if another user owns the session and
    /// `Unavailable` if no worker is registered.
    pub async fn route_session(&self, session_id: &str, user_name: &str) -> RegistryResult<String> {
        self.state.lock().await.route(session_id, user_name)
    }

    /// Forget a session. Unknown ids are a no-op; returns whether it existed.
    pub async fn shutdown_session(&self, session_id: &str) -> bool {
        self.state.lock().await.remove_session(session_id)
    }

    /// Owner of an open session, or `""` if it is not open (or unclaimed).
    pub async fn check_project_open(&self, session_id: &str) -> String {
        self.state
            .lock()
            .await
            .session_owner(session_id)
            .map(|s| s.owner_name().to_string())
            .unwrap_or_default()
    }

    // ── Health ─────────────────────────────────────────────────────

    /// Wake the health monitor now.
    ///
    /// Fails with `MonitorNotRunning` only if the monitor has never
    /// started. After shutdown the call succeeds without waking anything.
    pub async fn force_health_check(&self) -> RegistryResult<()> {
        let state = self.state.lock().await;
        match state.monitor.state() {
            MonitorState::Idle => Err(RegistryError::MonitorNotRunning),
            MonitorState::Running => {
                self.monitor.trigger();
                debug!("health check forced");
                Ok(())
            }
            MonitorState::Stopped => {
                debug!("health check forced after shutdown, ignored");
                Ok(())
            }
        }
    }

    /// Run one probe pass on the caller's task and return the evicted ids.
    pub async fn check_health_now(&self) -> Vec<WorkerId> {
        self.monitor.run_pass(&self.fleet()).await
    }

    pub async fn monitor_state(&self) -> MonitorState {
        self.state.lock().await.monitor.state()
    }

    // ── Configuration ──────────────────────────────────────────────

    /// Record a new directory-service address and broadcast it to every
    /// worker. Workers that fail delivery are evicted.
    pub async fn propagate_config(&self, url: &str) -> RegistryResult<BroadcastReport> {
        let url = url.trim();
        if url.is_empty() {
            return Err(MissingField("serviceUrl").into());
        }

        let targets = {
            let mut state = self.state.lock().await;
            state.set_directory_url(url);
            state.probe_targets()
        };
        info!(directory_service = %url, workers = targets.len(), "broadcasting directory service");

        let request = ChannelRequest::SetDirectoryService {
            url: url.to_string(),
        };
        let config = self.monitor.config();
        let fleet = self.fleet();

        let mut delivered = Vec::new();
        let mut evicted = Vec::new();
        for target in targets {
            let outcome = exchange_within(
                self.channel.as_ref(),
                &config.self_address,
                &target.url,
                &request,
                config.probe_timeout,
            )
            .await;

            match outcome {
                Ok(()) => delivered.push(target.worker_id),
                Err(e) => {
                    warn!(worker_id = %target.worker_id, url = %target.url, error = %e, "broadcast failed");
                    if fleet.evict(target.worker_id).await {
                        evicted.push(target.worker_id);
                    }
                }
            }
        }

        Ok(BroadcastReport {
            directory_service: url.to_string(),
            delivered,
            evicted,
        })
    }

    /// The last directory-service address propagated, if any.
    pub async fn directory_service(&self) -> Option<String> {
        self.state.lock().await.directory_url().map(str::to_string)
    }

    pub async fn stats(&self) -> RegistryStats {
        let state = self.state.lock().await;
        RegistryStats {
            workers: state.worker_count(),
            sessions: state.session_count(),
            monitor: state.monitor.state(),
            directory_service: state.directory_url().map(str::to_string),
        }
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Stop the health monitor and wait for it to exit.
    ///
    /// The registry stays usable for lookups afterwards, but the monitor
    /// never restarts.
    pub async fn shutdown(&self) {
        let handle = self.state.lock().await.monitor.take_for_shutdown();
        self.monitor.stop(handle).await;
        info!("session registry shut down");
    }
}
