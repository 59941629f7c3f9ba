//! Domain types shared by the registry, the health monitor, and the
//! transport.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a registered session service.
///
/// Assigned at registration from a monotonic counter and never reused
/// for the lifetime of the broker process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Channel messages ───────────────────────────────────────────────

/// A message the broker sends to a session service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelRequest {
    /// Liveness probe. The only acceptable reply is `Pong`.
    Ping,
    /// A new directory-service address every worker should use.
    SetDirectoryService { url: String },
}

impl ChannelRequest {
    /// The reply a healthy worker must answer with.
    pub fn expected_reply(&self) -> ChannelReply {
        match self {
            ChannelRequest::Ping => ChannelReply::Pong,
            ChannelRequest::SetDirectoryService { .. } => ChannelReply::Ack,
        }
    }

    /// Short name for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ChannelRequest::Ping => "ping",
            ChannelRequest::SetDirectoryService { .. } => "set_directory_service",
        }
    }
}

/// A session service's answer to a `ChannelRequest`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelReply {
    Pong,
    Ack,
}

/// How a message is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryMode {
    /// Wait for the reply and decode it.
    RequestReply,
    /// Only confirm delivery; the reply body is ignored and read as `Ack`.
    OneWay,
}

impl DeliveryMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryMode::RequestReply => "request-reply",
            DeliveryMode::OneWay => "one-way",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_format_is_tagged() {
        let json = serde_json::to_value(ChannelRequest::SetDirectoryService {
            url: "http://dir:9000".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "set_directory_service");
        assert_eq!(json["url"], "http://dir:9000");

        let ping: ChannelRequest = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(ping, ChannelRequest::Ping);
    }

    #[test]
    fn expected_replies() {
        assert_eq!(ChannelRequest::Ping.expected_reply(), ChannelReply::Pong);
        assert_eq!(
            ChannelRequest::SetDirectoryService { url: String::new() }.expected_reply(),
            ChannelReply::Ack
        );
    }

    #[test]
    fn worker_id_serializes_as_number() {
        assert_eq!(serde_json::to_string(&WorkerId(7)).unwrap(), "7");
        assert_eq!(WorkerId(7).to_string(), "7");
        assert!(WorkerId(1) < WorkerId(2));
    }

    #[test]
    fn delivery_mode_header_values() {
        assert_eq!(DeliveryMode::RequestReply.as_str(), "request-reply");
        assert_eq!(DeliveryMode::OneWay.as_str(), "one-way");
    }
}
