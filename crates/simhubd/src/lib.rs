//! simhubd — the simhub session broker daemon.
//!
//! Assembles the registry, the HTTP message channel, and the REST API
//! into one process. The binary in `main.rs` only parses flags, installs
//! logging, and serves what [`assemble`] returns.

pub mod config;

use std::sync::Arc;

use simhub_proto::MessageChannel;
use simhub_registry::SessionRegistry;

use crate::config::Settings;

/// A registry wired to `channel`, plus the router serving it.
pub struct Broker {
    pub registry: Arc<SessionRegistry>,
    pub router: axum::Router,
}

pub fn assemble(settings: &Settings, channel: Arc<dyn MessageChannel>) -> Broker {
    let registry = Arc::new(SessionRegistry::new(settings.registry_config(), channel));
    let router = simhub_api::build_router(Arc::clone(&registry));
    Broker { registry, router }
}
