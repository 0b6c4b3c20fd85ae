//! Tracing bootstrap: exporter pipeline, tracer and the carrier codec.

use http::HeaderMap;
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::Context;
use opentelemetry_http::{HeaderExtractor, HeaderInjector};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{Sampler, SdkTracer, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use tracing::warn;

use crate::config::Config;
use crate::error::Error;

/// Everything a handler needs to trace a request: the provider that owns the
/// export pipeline, a tracer, and the wire format for trace context.
///
/// Held behind an `Arc` in the per-service state. Nothing here is
/// process-global, so tests run several instances side by side.
pub struct Telemetry {
    provider: SdkTracerProvider,
    tracer: SdkTracer,
    propagator: Box<dyn TextMapPropagator + Send + Sync>,
}

impl Telemetry {
    /// Build the OTLP export pipeline for `config`. A failure here aborts
    /// startup; everything past this point is best-effort.
    pub fn init(config: &Config) -> Result<Self, Error> {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(config.otlp_endpoint.clone())
            .build()?;

        // Always sample: the collector is expected to see every span.
        let provider = SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_sampler(Sampler::AlwaysOn)
            .with_resource(
                Resource::builder()
                    .with_service_name(config.service_name.clone())
                    .build(),
            )
            .build();

        Ok(Self::new(provider, Box::new(TraceContextPropagator::new())))
    }

    /// Provider and carrier format chosen by the caller. Tests pair this
    /// with an in-memory exporter.
    pub fn new(
        provider: SdkTracerProvider,
        propagator: Box<dyn TextMapPropagator + Send + Sync>,
    ) -> Self {
        let tracer = provider.tracer("traced-hello");
        Telemetry {
            provider,
            tracer,
            propagator,
        }
    }

    pub fn tracer(&self) -> &SdkTracer {
        &self.tracer
    }

    /// Decode the trace context carried by `headers`. Missing or malformed
    /// headers yield a context without a remote span, which makes the next
    /// span a new root.
    pub fn extract_context(&self, headers: &HeaderMap) -> Context {
        self.propagator.extract(&HeaderExtractor(headers))
    }

    /// Encode `cx` into `headers` for the next hop.
    pub fn inject_context(&self, cx: &Context, headers: &mut HeaderMap) {
        self.propagator
            .inject_context(cx, &mut HeaderInjector(headers));
    }

    /// Flush whatever the processors are holding. Export problems are
    /// telemetry problems, so they are logged and swallowed.
    pub fn force_flush(&self) {
        if let Err(err) = self.provider.force_flush() {
            warn!(error = %err, "failed to flush spans");
        }
    }

    /// Flush and shut down the export pipeline.
    pub fn shutdown(&self) {
        if let Err(err) = self.provider.shutdown() {
            warn!(error = %err, "failed to shut down the tracer provider");
        }
    }
}
