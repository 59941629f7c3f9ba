//! The `MessageChannel` seam.
//!
//! The broker never talks to a socket directly. Health probes and
//! configuration broadcasts go through a `MessageChannel`, so the
//! daemon can plug in HTTP while tests script replies in-process.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{ChannelReply, ChannelRequest, DeliveryMode};

/// Result type alias for channel deliveries.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Ways a delivery can fail. Every variant means "treat the target as dead".
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("target unreachable: {0}")]
    Unreachable(String),

    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("target answered with status {0}")]
    Status(u16),

    #[error("unexpected reply: expected {expected:?}, got {actual:?}")]
    UnexpectedReply {
        expected: ChannelReply,
        actual: ChannelReply,
    },

    #[error("codec error: {0}")]
    Codec(String),
}

/// Request/response delivery to a session service.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Deliver `request` from `from` (the broker's own address) to
    /// `target` and return the decoded reply.
    async fn send(
        &self,
        from: &str,
        target: &str,
        mode: DeliveryMode,
        request: &ChannelRequest,
    ) -> ChannelResult<ChannelReply>;
}

/// Send `request` and require the exact reply it calls for.
pub async fn exchange(
    channel: &dyn MessageChannel,
    from: &str,
    target: &str,
    request: &ChannelRequest,
) -> ChannelResult<()> {
    let expected = request.expected_reply();
    let actual = channel
        .send(from, target, DeliveryMode::RequestReply, request)
        .await?;
    if actual == expected {
        Ok(())
    } else {
        Err(ChannelError::UnexpectedReply { expected, actual })
    }
}

/// `exchange` with a deadline. Running out of time is `ChannelError::Timeout`.
pub async fn exchange_within(
    channel: &dyn MessageChannel,
    from: &str,
    target: &str,
    request: &ChannelRequest,
    timeout: Duration,
) -> ChannelResult<()> {
    tokio::time::timeout(timeout, exchange(channel, from, target, request))
        .await
        .map_err(|_| ChannelError::Timeout(timeout))?
}
