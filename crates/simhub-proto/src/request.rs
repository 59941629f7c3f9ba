//! Inbound request documents.
//!
//! Fields are decoded as optional so a missing field surfaces as a
//! `MissingField` protocol violation instead of a generic decode error.
//! Each document has a `validate()` that returns the checked form the
//! registry consumes; nothing is mutated before validation passes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A required field was absent or empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required field `{0}`")]
pub struct MissingField(pub &'static str);

fn require(field: &'static str, value: Option<&str>) -> Result<String, MissingField> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(MissingField(field)),
    }
}

// ── Worker registration ────────────────────────────────────────────

/// Sent by a session service when it comes up (or reconnects).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterWorkerRequest {
    pub service_url: Option<String>,
    /// Sessions the service already hosts.
    #[serde(default)]
    pub session_list: Vec<String>,
}

/// Validated registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterWorker {
    pub url: String,
    pub sessions: Vec<String>,
}

impl RegisterWorkerRequest {
    pub fn validate(&self) -> Result<RegisterWorker, MissingField> {
        let url = require("serviceUrl", self.service_url.as_deref())?;
        let sessions = self
            .session_list
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Ok(RegisterWorker { url, sessions })
    }
}

// ── Session routing ────────────────────────────────────────────────

/// Asks the broker which service should host (or already hosts) a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSessionRequest {
    pub session_id: Option<String>,
    pub user_name: Option<String>,
}

/// Validated routing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSession {
    pub session_id: String,
    pub user_name: String,
}

impl RouteSessionRequest {
    pub fn validate(&self) -> Result<RouteSession, MissingField> {
        Ok(RouteSession {
            session_id: require("sessionId", self.session_id.as_deref())?,
            user_name: require("userName", self.user_name.as_deref())?,
        })
    }
}

// ── Configuration broadcast ────────────────────────────────────────

/// Carries a new directory-service address to broadcast.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropagateConfigRequest {
    pub service_url: Option<String>,
}

impl PropagateConfigRequest {
    /// Returns the directory-service url.
    pub fn validate(&self) -> Result<String, MissingField> {
        require("serviceUrl", self.service_url.as_deref())
    }
}
