//! Health probe logic.
//!
//! Sends a `Ping` through the message channel and classifies the answer.

use std::time::Duration;

use tracing::debug;

use simhub_proto::channel::exchange_within;
use simhub_proto::{ChannelError, ChannelRequest, MessageChannel};

/// Result of a single health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// The service answered `Pong`.
    Healthy,
    /// The service answered, but with something other than `Pong`.
    Unhealthy,
    /// The probe could not be delivered or timed out.
    Failed,
}

impl ProbeResult {
    pub fn is_healthy(self) -> bool {
        self == ProbeResult::Healthy
    }
}

/// Probe one session service.
///
/// Anything short of an exact `Pong` within `timeout` is a failure.
pub async fn probe_worker(
    channel: &dyn MessageChannel,
    from: &str,
    url: &str,
    timeout: Duration,
) -> ProbeResult {
    match exchange_within(channel, from, url, &ChannelRequest::Ping, timeout).await {
        Ok(()) => ProbeResult::Healthy,
        Err(ChannelError::UnexpectedReply { actual, .. }) => {
            debug!(%url, ?actual, "health probe got unexpected reply");
            ProbeResult::Unhealthy
        }
        Err(e @ ChannelError::Timeout(_)) => {
            debug!(error = %e, %url, "health probe timed out");
            ProbeResult::Failed
        }
        Err(e) => {
            debug!(error = %e, %url, "health probe failed");
            ProbeResult::Failed
        }
    }
}

/// Parse a duration like "5s", "500ms" or "2m". A bare number is seconds.
///
/// Unknown units and values that do not fit a `Duration` give `None`.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    let value: u64 = digits.parse().ok()?;

    match unit {
        "" | "s" => Some(Duration::from_secs(value)),
        "ms" => Some(Duration::from_millis(value)),
        "m" => value.checked_mul(60).map(Duration::from_secs),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use simhub_proto::{ChannelReply, ChannelResult, DeliveryMode};

    enum Behavior {
        Reply(ChannelReply),
        Refuse,
        Hang,
    }

    struct OneShot(Behavior);

    #[async_trait]
    impl MessageChannel for OneShot {
        async fn send(
            &self,
            _from: &str,
            target: &str,
            _mode: DeliveryMode,
            _request: &ChannelRequest,
        ) -> ChannelResult<ChannelReply> {
            match &self.0 {
                Behavior::Reply(r) => Ok(r.clone()),
                Behavior::Refuse => Err(ChannelError::Unreachable(target.to_string())),
                Behavior::Hang => std::future::pending().await,
            }
        }
    }

    const TIMEOUT: Duration = Duration::from_millis(100);

    #[tokio::test]
    async fn pong_is_healthy() {
        let channel = OneShot(Behavior::Reply(ChannelReply::Pong));
        assert_eq!(probe_worker(&channel, "broker", "a", TIMEOUT).await, ProbeResult::Healthy);
    }

    #[tokio::test]
    async fn wrong_reply_is_unhealthy() {
        let channel = OneShot(Behavior::Reply(ChannelReply::Ack));
        let result = probe_worker(&channel, "broker", "a", TIMEOUT).await;
        assert_eq!(result, ProbeResult::Unhealthy);
        assert!(!result.is_healthy());
    }

    #[tokio::test]
    async fn transport_error_is_failed() {
        let channel = OneShot(Behavior::Refuse);
        assert_eq!(probe_worker(&channel, "broker", "a", TIMEOUT).await, ProbeResult::Failed);
    }

    #[tokio::test]
    async fn hanging_probe_times_out() {
        let channel = OneShot(Behavior::Hang);
        let result = probe_worker(&channel, "broker", "a", Duration::from_millis(20)).await;
        assert_eq!(result, ProbeResult::Failed);
    }

    #[test]
    fn parse_duration_seconds() {
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("60s"), Some(Duration::from_secs(60)));
    }

    #[test]
    fn parse_duration_milliseconds() {
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
    }

    #[test]
    fn parse_duration_minutes() {
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
    }

    #[test]
    fn parse_duration_plain_number_as_seconds() {
        assert_eq!(parse_duration("10"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration(" 10s "), Some(Duration::from_secs(10)));
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("s"), None);
        assert_eq!(parse_duration("1h"), None);
        assert_eq!(parse_duration("-5s"), None);
        assert_eq!(parse_duration("1.5s"), None);
    }

    #[test]
    fn parse_duration_rejects_overflow() {
        assert_eq!(parse_duration("307445734561825861m"), None);
        assert_eq!(parse_duration("18446744073709551616s"), None);
        assert_eq!(
            parse_duration("307445734561825860m"),
            Some(Duration::from_secs(307445734561825860 * 60))
        );
    }
}
