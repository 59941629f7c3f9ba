//! `MessageChannel` over plain HTTP/1.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use tracing::debug;

use simhub_proto::{
    ChannelError, ChannelReply, ChannelRequest, ChannelResult, DeliveryMode, MessageChannel,
};

/// Path every session service serves broker messages on.
pub const MESSAGE_PATH: &str = "/simhub/v1/message";

/// Carries the broker's own address.
pub const FROM_HEADER: &str = "x-simhub-from";

/// Carries the `DeliveryMode`.
pub const MODE_HEADER: &str = "x-simhub-mode";

/// Delivers broker messages with one HTTP/1 request each.
#[derive(Debug, Clone)]
pub struct HttpChannel {
    user_agent: String,
}

impl HttpChannel {
    pub fn new() -> Self {
        Self {
            user_agent: format!("simhub/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for HttpChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a target url into `(authority, path prefix)`.
///
/// Accepts `http://host:port[/prefix]` and bare `host:port[/prefix]`.
fn split_target(target: &str) -> ChannelResult<(&str, &str)> {
    let target = target.trim();
    let rest = match target.split_once("://") {
        Some(("http", rest)) => rest,
        Some((scheme, _)) => {
            return Err(ChannelError::Unreachable(format!(
                "unsupported scheme `{scheme}` in {target}"
            )));
        }
        None => target,
    };

    let (authority, prefix) = match rest.find('/') {
        Some(idx) => (&rest[..idx], rest[idx..].trim_end_matches('/')),
        None => (rest, ""),
    };
    if authority.is_empty() {
        return Err(ChannelError::Unreachable(format!("no host in {target}")));
    }
    Ok((authority, prefix))
}

#[async_trait]
impl MessageChannel for HttpChannel {
    async fn send(
        &self,
        from: &str,
        target: &str,
        mode: DeliveryMode,
        request: &ChannelRequest,
    ) -> ChannelResult<ChannelReply> {
        let (authority, prefix) = split_target(target)?;
        let uri = format!("http://{authority}{prefix}{MESSAGE_PATH}");
        let body = serde_json::to_vec(request).map_err(|e| ChannelError::Codec(e.to_string()))?;

        let stream = tokio::net::TcpStream::connect(authority)
            .await
            .map_err(|e| ChannelError::Unreachable(format!("{authority}: {e}")))?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| ChannelError::Unreachable(format!("handshake with {authority}: {e}")))?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "channel connection closed with error");
            }
        });

        let req = http::Request::builder()
            .method(http::Method::POST)
            .uri(&uri)
            .header(http::header::HOST, authority)
            .header(http::header::USER_AGENT, &self.user_agent)
            .header(http::header::CONTENT_TYPE, "application/json")
            .header(FROM_HEADER, from)
            .header(MODE_HEADER, mode.as_str())
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| ChannelError::Codec(e.to_string()))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| ChannelError::Unreachable(format!("{uri}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            debug!(%status, %uri, kind = request.kind(), "channel delivery non-2xx");
            return Err(ChannelError::Status(status.as_u16()));
        }

        if mode == DeliveryMode::OneWay {
            return Ok(ChannelReply::Ack);
        }

        let bytes = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| ChannelError::Unreachable(format!("{uri}: {e}")))?
            .to_bytes();

        serde_json::from_slice(&bytes).map_err(|e| ChannelError::Codec(e.to_string()))
    }
}
