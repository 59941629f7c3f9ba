//! Session and worker records.

use std::collections::HashMap;

use serde::Serialize;

use simhub_proto::WorkerId;

/// One active simulation session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    /// `None` until the first routing request claims a session that was
    /// imported from a service's session list.
    pub owner: Option<String>,
}

impl Session {
    pub fn new(id: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner: Some(owner.into()),
        }
    }

    /// A session reported by a service without an owner.
    pub fn unclaimed(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner: None,
        }
    }

    /// Owner name, or `""` while unclaimed.
    pub fn owner_name(&self) -> &str {
        self.owner.as_deref().unwrap_or("")
    }
}

/// A registered session service and the sessions it hosts.
#[derive(Debug, Clone)]
pub struct Worker {
    id: WorkerId,
    url: String,
    sessions: HashMap<String, Session>,
}

impl Worker {
    pub fn new(id: WorkerId, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            sessions: HashMap::new(),
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Current load.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn session_ids(&self) -> impl Iterator<Item = &str> {
        self.sessions.keys().map(String::as_str)
    }

    pub fn has_session(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn session(&self, session_id: &str) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    pub fn session_mut(&mut self, session_id: &str) -> Option<&mut Session> {
        self.sessions.get_mut(session_id)
    }

    /// Returns false if a session with that id was already hosted here.
    pub fn add_session(&mut self, session: Session) -> bool {
        if self.sessions.contains_key(&session.id) {
            return false;
        }
        self.sessions.insert(session.id.clone(), session);
        true
    }

    pub fn remove_session(&mut self, session_id: &str) -> Option<Session> {
        self.sessions.remove(session_id)
    }

    pub fn summary(&self) -> WorkerSummary {
        WorkerSummary {
            id: self.id,
            url: self.url.clone(),
            session_count: self.sessions.len(),
        }
    }
}

/// Read-only view of a worker for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSummary {
    pub id: WorkerId,
    pub url: String,
    pub session_count: usize,
}
