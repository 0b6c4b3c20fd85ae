//! Outbound HTTP with trace propagation.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use opentelemetry::trace::{SpanKind, Status, TraceContextExt, Tracer};
use opentelemetry::{Context, KeyValue};
use opentelemetry_semantic_conventions::trace as semconv;

use crate::error::CallError;
use crate::telemetry::Telemetry;

/// Status and body of a completed downstream call.
#[derive(Debug)]
pub struct CallOutcome {
    pub status: StatusCode,
    pub body: Bytes,
}

/// HTTP client that opens a client span for every request and injects the
/// trace context into the outgoing headers, so the next hop can parent its
/// server span correctly.
pub struct TracedClient {
    inner: Client<HttpConnector, Full<Bytes>>,
    telemetry: Arc<Telemetry>,
    timeout: Duration,
}

impl TracedClient {
    pub fn new(telemetry: Arc<Telemetry>, timeout: Duration) -> Self {
        TracedClient {
            inner: Client::builder(TokioExecutor::new()).build_http(),
            telemetry,
            timeout,
        }
    }

    /// `POST` a JSON payload.
    pub async fn post_json(
        &self,
        parent_cx: &Context,
        url: &str,
        body: Bytes,
    ) -> Result<CallOutcome, CallError> {
        self.request(parent_cx, Method::POST, url, body).await
    }

    /// `GET` with a JSON payload. The forward protocol carries the remaining
    /// chain in the body of a GET, so the method is explicit here.
    pub async fn get_json(
        &self,
        parent_cx: &Context,
        url: &str,
        body: Bytes,
    ) -> Result<CallOutcome, CallError> {
        self.request(parent_cx, Method::GET, url, body).await
    }

    async fn request(
        &self,
        parent_cx: &Context,
        method: Method,
        url: &str,
        body: Bytes,
    ) -> Result<CallOutcome, CallError> {
        let tracer = self.telemetry.tracer();
        let span = tracer
            .span_builder(format!("{method} {url}"))
            .with_kind(SpanKind::Client)
            .with_attributes([
                KeyValue::new(semconv::HTTP_REQUEST_METHOD, method.to_string()),
                KeyValue::new(semconv::URL_FULL, url.to_string()),
            ])
            .start_with_context(tracer, parent_cx);
        let cx = parent_cx.with_span(span);

        let result = self.send(&cx, method, url, body).await;
        match &result {
            Ok(outcome) => cx.span().set_attribute(KeyValue::new(
                semconv::HTTP_RESPONSE_STATUS_CODE,
                outcome.status.as_u16() as i64,
            )),
            Err(err) => cx.span().set_status(Status::error(err.to_string())),
        }
        cx.span().end();
        result
    }

    async fn send(
        &self,
        cx: &Context,
        method: Method,
        url: &str,
        body: Bytes,
    ) -> Result<CallOutcome, CallError> {
        let mut req = hyper::Request::builder()
            .method(method)
            .uri(url)
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(body))?;
        self.telemetry.inject_context(cx, req.headers_mut());

        // One bound covers the whole exchange, connect to last body byte.
        let fetch = async {
            let res = self.inner.request(req).await?;
            let status = res.status();
            let body = res.into_body().collect().await?.to_bytes();
            Ok::<_, CallError>(CallOutcome { status, body })
        };
        match tokio::time::timeout(self.timeout, fetch).await {
            Ok(outcome) => outcome,
            Err(_) => Err(CallError::Timeout(self.timeout)),
        }
    }
}
