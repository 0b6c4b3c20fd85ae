//! A pair of small HTTP services that relay W3C trace context across a
//! downstream call and export their spans over OTLP.
//!
//! `hello-service` answers `/call` by issuing a single downstream request
//! through an instrumented client; `forward-service` is the downstream
//! target, which walks the forwarded chain. Both binaries share the
//! configuration, telemetry and client plumbing in this library, which is
//! also what the integration tests drive.

use std::sync::Arc;

pub mod client;
pub mod config;
pub mod error;
pub mod forward;
pub mod hello;
pub mod server;
pub mod telemetry;

use client::TracedClient;
use config::Config;
use telemetry::Telemetry;

/// Per-service shared state: configuration, telemetry handle and the
/// instrumented outbound client. Everything in here is immutable or
/// internally synchronized, so request tasks share it freely.
pub struct AppState {
    pub config: Config,
    pub telemetry: Arc<Telemetry>,
    pub client: TracedClient,
}

impl AppState {
    pub fn new(config: Config, telemetry: Arc<Telemetry>) -> Self {
        let client = TracedClient::new(telemetry.clone(), config.downstream_timeout);
        AppState {
            config,
            telemetry,
            client,
        }
    }
}
