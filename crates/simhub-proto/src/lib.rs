//! simhub-proto — shared types for the simhub session broker.
//!
//! Everything that crosses a crate boundary lives here: the worker id
//! newtype, the messages the broker exchanges with session services,
//! the `MessageChannel` seam used to deliver them, and the inbound
//! request documents the REST layer decodes.
//!
//! # Architecture
//!
//! ```text
//! simhub-proto
//!   ├── types    WorkerId, ChannelRequest, ChannelReply, DeliveryMode
//!   ├── channel  MessageChannel trait + ChannelError
//!   └── request  RegisterWorkerRequest, RouteSessionRequest, ... (validated)
//! ```

pub mod channel;
pub mod request;
pub mod types;

pub use channel::{ChannelError, ChannelResult, MessageChannel};
pub use request::*;
pub use types::*;
