//! simhub-transport — HTTP delivery for broker messages.
//!
//! `HttpChannel` implements `MessageChannel` by POSTing the JSON-encoded
//! `ChannelRequest` to `{target}/simhub/v1/message` and decoding the
//! `ChannelReply` from the response body. One connection per message;
//! the broker sends few messages and the fleet is small.

pub mod http_channel;

pub use http_channel::{HttpChannel, FROM_HEADER, MESSAGE_PATH, MODE_HEADER};
