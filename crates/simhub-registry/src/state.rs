//! The registry's linked indexes.
//!
//! `RegistryState` is plain data: it never locks and never awaits. The
//! `SessionRegistry` wraps it in its single mutex, so every method here
//! runs with exclusive access.
//!
//! Invariant: `session_index[s] == w` exactly when worker `w` hosts a
//! session with id `s`.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use simhub_health::{MonitorSlot, ProbeTarget};
use simhub_proto::WorkerId;

use crate::error::{RegistryError, RegistryResult};
use crate::id::ServiceIdAllocator;
use crate::load_balancer::least_loaded;
use crate::model::{Session, Worker, WorkerSummary};

/// Outcome of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// A new worker record was created.
    Created(WorkerId),
    /// The url was already registered; the existing id is returned.
    Existing(WorkerId),
}

impl Registration {
    pub fn worker_id(self) -> WorkerId {
        match self {
            Registration::Created(id) | Registration::Existing(id) => id,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct RegistryState {
    /// Registration order is id order.
    workers: BTreeMap<WorkerId, Worker>,
    /// session id → hosting worker. Lookup only; workers own sessions.
    session_index: HashMap<String, WorkerId>,
    ids: ServiceIdAllocator,
    directory_url: Option<String>,
    pub(crate) monitor: MonitorSlot,
}

impl RegistryState {
    pub(crate) fn register(&mut self, url: &str, sessions: Vec<String>) -> Registration {
        if let Some(worker) = self.workers.values_mut().find(|w| w.url() == url) {
            let imported = import_sessions(worker, &mut self.session_index, sessions);
            debug!(worker_id = %worker.id(), %url, imported, "session service re-registered");
            return Registration::Existing(worker.id());
        }

        let id = self.ids.next();
        let mut worker = Worker::new(id, url);
        let imported = import_sessions(&mut worker, &mut self.session_index, sessions);
        self.workers.insert(id, worker);

        info!(worker_id = %id, %url, sessions = imported, "session service registered");
        Registration::Created(id)
    }

    /// Create-or-attach. Returns the url of the hosting worker.
    pub(crate) fn route(&mut self, session_id: &str, user: &str) -> RegistryResult<String> {
        if let Some(&worker_id) = self.session_index.get(session_id) {
            let worker = self
                .workers
                .get_mut(&worker_id)
                .ok_or(RegistryError::Unavailable)?;
            let session = worker
                .session_mut(session_id)
                .ok_or(RegistryError::Unavailable)?;

            match session.owner.as_deref() {
                Some(owner) if owner != user => {
                    warn!(%session_id, %user, %owner, "session already open for another user");
                    return Err(RegistryError::Conflict {
                        session_id: session_id.to_string(),
                        owner: owner.to_string(),
                    });
                }
                Some(_) => {
                    debug!(%session_id, %user, %worker_id, "session already routed");
                }
                None => {
                    session.owner = Some(user.to_string());
                    info!(%session_id, %user, %worker_id, "claimed imported session");
                }
            }
            return Ok(worker.url().to_string());
        }

        let loads = self.workers.values().map(|w| (w.id(), w.session_count()));
        let worker_id = least_loaded(loads).ok_or(RegistryError::Unavailable)?;
        let worker = self
            .workers
            .get_mut(&worker_id)
            .ok_or(RegistryError::Unavailable)?;

        worker.add_session(Session::new(session_id, user));
        self.session_index.insert(session_id.to_string(), worker_id);

        info!(
            %session_id,
            %user,
            %worker_id,
            load = worker.session_count(),
            "session routed"
        );
        Ok(worker.url().to_string())
    }

    /// Returns true if the session existed.
    pub(crate) fn remove_session(&mut self, session_id: &str) -> bool {
        let Some(worker_id) = self.session_index.remove(session_id) else {
            return false;
        };
        if let Some(worker) = self.workers.get_mut(&worker_id) {
            worker.remove_session(session_id);
        }
        info!(%session_id, %worker_id, "session shut down");
        true
    }

    pub(crate) fn session_owner(&self, session_id: &str) -> Option<&Session> {
        let worker_id = self.session_index.get(session_id)?;
        self.workers.get(worker_id)?.session(session_id)
    }

    /// Remove a worker and every session it hosts from both indexes.
    pub(crate) fn evict(&mut self, worker_id: WorkerId) -> Option<Worker> {
        let worker = self.workers.remove(&worker_id)?;
        for session_id in worker.session_ids() {
            self.session_index.remove(session_id);
        }
        Some(worker)
    }

    pub(crate) fn probe_targets(&self) -> Vec<ProbeTarget> {
        self.workers
            .values()
            .map(|w| ProbeTarget {
                worker_id: w.id(),
                url: w.url().to_string(),
            })
            .collect()
    }

    pub(crate) fn summaries(&self) -> Vec<WorkerSummary> {
        self.workers.values().map(Worker::summary).collect()
    }

    pub(crate) fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub(crate) fn session_count(&self) -> usize {
        self.session_index.len()
    }

    pub(crate) fn directory_url(&self) -> Option<&str> {
        self.directory_url.as_deref()
    }

    pub(crate) fn set_directory_url(&mut self, url: &str) {
        self.directory_url = Some(url.to_string());
    }

    /// Both indexes agree with each other.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        let forward = self.session_index.iter().all(|(sid, wid)| {
            self.workers
                .get(wid)
                .is_some_and(|w| w.has_session(sid))
        });
        let backward = self.workers.values().all(|w| {
            w.session_ids()
                .all(|sid| self.session_index.get(sid) == Some(&w.id()))
        });
        forward && backward
    }
}

/// Add reported sessions to `worker`, skipping ids that are already
/// tracked anywhere. Returns how many were added.
fn import_sessions(
    worker: &mut Worker,
    index: &mut HashMap<String, WorkerId>,
    sessions: Vec<String>,
) -> usize {
    let mut imported = 0;
    for session_id in sessions {
        match index.get(&session_id) {
            Some(&owner) if owner == worker.id() => {}
            Some(&owner) => {
                warn!(
                    %session_id,
                    worker_id = %worker.id(),
                    hosted_by = %owner,
                    "reported session is hosted by another service, skipping"
                );
            }
            None => {
                index.insert(session_id.clone(), worker.id());
                worker.add_session(Session::unclaimed(session_id));
                imported += 1;
            }
        }
    }
    imported
}
