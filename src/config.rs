//! Environment-derived configuration, read once at startup.
//!
//! Handlers only ever see the [`Config`] struct; nothing reads the
//! environment after the process has started.

use std::env;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use http::Uri;

use crate::error::ConfigError;

/// Service name used when `SERVICE_NAME` is unset or empty.
pub const DEFAULT_SERVICE_NAME: &str = "go-app";

/// Service name the forward target reports when `SERVICE_NAME` is unset.
pub const DEFAULT_FORWARD_SERVICE_NAME: &str = "forward-app";

/// Fixed listening port of the hello service.
pub const HELLO_PORT: u16 = 50030;

/// Fixed listening port of the forward target.
pub const FORWARD_PORT: u16 = 50031;

const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";
const DEFAULT_DOWNSTREAM_URL: &str = "http://127.0.0.1:50031/api/forward";
const DEFAULT_DOWNSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct Config {
    /// Reported as the `service.name` resource attribute and used in the
    /// greeting.
    pub service_name: String,
    /// OTLP collector endpoint spans are exported to.
    pub otlp_endpoint: String,
    pub listen_addr: SocketAddr,
    /// Where `/call` forwards its one downstream request.
    pub downstream_url: String,
    /// Upper bound on a whole outbound call, connect to last body byte.
    pub downstream_timeout: Duration,
}

impl Config {
    /// Configuration for the hello service.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::with_defaults(DEFAULT_SERVICE_NAME, HELLO_PORT)
    }

    /// Configuration for the forward target.
    pub fn from_env_for_forwarder() -> Result<Self, ConfigError> {
        Self::with_defaults(DEFAULT_FORWARD_SERVICE_NAME, FORWARD_PORT)
    }

    fn with_defaults(service_name: &str, port: u16) -> Result<Self, ConfigError> {
        let service_name = env_or("SERVICE_NAME", service_name);
        let otlp_endpoint = env_or("OTEL_EXPORTER_OTLP_ENDPOINT", DEFAULT_OTLP_ENDPOINT);

        let downstream_url = env_or("DOWNSTREAM_URL", DEFAULT_DOWNSTREAM_URL);
        downstream_url
            .parse::<Uri>()
            .map_err(|_| ConfigError::InvalidUri {
                var: "DOWNSTREAM_URL",
                value: downstream_url.clone(),
            })?;

        let downstream_timeout = match env_opt("DOWNSTREAM_TIMEOUT_MS") {
            Some(raw) => {
                let millis = raw
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidMillis {
                        var: "DOWNSTREAM_TIMEOUT_MS",
                        value: raw.clone(),
                    })?;
                Duration::from_millis(millis)
            }
            None => DEFAULT_DOWNSTREAM_TIMEOUT,
        };

        Ok(Config {
            service_name,
            otlp_endpoint,
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            downstream_url,
            downstream_timeout,
        })
    }
}

/// An unset variable and an empty one are both treated as "use the default".
fn env_opt(var: &str) -> Option<String> {
    env::var(var).ok().filter(|value| !value.is_empty())
}

fn env_or(var: &str, default: &str) -> String {
    env_opt(var).unwrap_or_else(|| default.to_string())
}
