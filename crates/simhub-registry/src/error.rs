//! Registry error types.

use thiserror::Error;

use simhub_proto::MissingField;

/// Errors returned to the caller of a registry operation.
///
/// Delivery failures to a session service never show up here; they
/// end in eviction instead.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("session {session_id} is already open for user {owner}")]
    Conflict { session_id: String, owner: String },

    #[error("no session service is available")]
    Unavailable,

    #[error("protocol violation: {0}")]
    ProtocolViolation(#[from] MissingField),

    #[error("health monitor has not started")]
    MonitorNotRunning,
}

pub type RegistryResult<T> = Result<T, RegistryError>;
