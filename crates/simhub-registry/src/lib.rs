//! simhub-registry — the central session broker.
//!
//! Tracks the fleet of session services, routes session creation to
//! the least-loaded service, and evicts services that fail health
//! probes. All state is in memory.
//!
//! # Architecture
//!
//! ```text
//! SessionRegistry
//!   ├── Mutex<RegistryState>               (the one lock)
//!   │   ├── workers: WorkerId → Worker     (owns sessions)
//!   │   ├── session_index: session → WorkerId
//!   │   ├── ServiceIdAllocator             (monotonic ids)
//!   │   └── MonitorSlot                    (Idle → Running → Stopped)
//!   ├── HealthMonitor                      (background probe loop)
//!   └── MessageChannel                     (probes + broadcasts)
//! ```
//!
//! # Routing
//!
//! `route_session` either returns the service already hosting the
//! session (same user), fails with `Conflict` (different user), or
//! reserves the session on the service with the fewest sessions, the
//! earliest-registered service winning ties.

pub mod error;
pub mod id;
pub mod load_balancer;
pub mod model;
pub mod registry;
mod state;

pub use error::{RegistryError, RegistryResult};
pub use id::ServiceIdAllocator;
pub use load_balancer::least_loaded;
pub use model::{Session, Worker, WorkerSummary};
pub use registry::{BroadcastReport, RegistryConfig, RegistryStats, SessionRegistry};
pub use state::Registration;

pub use simhub_health::MonitorState;
pub use simhub_proto::WorkerId;
