//! simhub-health — failure detection for simhub session services.
//!
//! A single background task probes every registered session service
//! through a `MessageChannel` and evicts the ones that do not answer
//! `Ping` with `Pong`. The monitor does not own the worker records; it
//! reaches them through the `WorkerFleet` seam the registry implements.
//!
//! # Architecture
//!
//! ```text
//! HealthMonitor
//!   ├── background task (one per registry)
//!   │   ├── wait: interval | force trigger | stop signal
//!   │   ├── WorkerFleet::probe_targets() → snapshot (brief lock)
//!   │   ├── probe_worker() → ProbeResult (no lock held)
//!   │   └── WorkerFleet::evict() on first failure, then rescan
//!   └── MonitorSlot (Idle → Running → Stopped), stored by the owner
//! ```
//!
//! # Staleness
//!
//! Probes run against a snapshot. A service registered while a scan is
//! in flight is picked up by the next scan, and sessions routed to a
//! service whose probe is in flight go down with it if the probe fails.

pub mod checker;
pub mod monitor;

pub use checker::{parse_duration, probe_worker, ProbeResult};
pub use monitor::{HealthMonitor, MonitorConfig, MonitorSlot, MonitorState, ProbeTarget, WorkerFleet};
