use std::time::Duration;

use thiserror::Error;

/// Failures that abort startup. Once a service is accepting connections,
/// problems are handled per request instead of through this type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build the span exporter: {0}")]
    Exporter(#[from] opentelemetry_otlp::ExporterBuildError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Rejected environment values. Configuration is read once at startup, so
/// these are always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not a valid URI: {value:?}")]
    InvalidUri { var: &'static str, value: String },

    #[error("{var} is not a valid number of milliseconds: {value:?}")]
    InvalidMillis { var: &'static str, value: String },
}

/// A failed downstream call. Rendered into the response text by the
/// handlers; never turned into a non-200 response.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("invalid outbound request: {0}")]
    Request(#[from] http::Error),

    #[error(transparent)]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("failed to read the response body: {0}")]
    Body(#[from] hyper::Error),

    #[error("no response after {}ms", .0.as_millis())]
    Timeout(Duration),
}
