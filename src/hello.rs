//! The hello service: `/call` forwards one traced request downstream and
//! reports what came back.

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use opentelemetry::trace::{SpanKind, TraceContextExt, Tracer};
use opentelemetry::{Context, KeyValue};
use opentelemetry_semantic_conventions::trace as semconv;
use tracing::info;

use crate::server::{status_response, text_response, Body};
use crate::AppState;

/// The one outbound request: ask the forward target to call a public site
/// and stop there.
const DEMO_PAYLOAD: &str = r#"[ { "url": "http://blank.org", "arguments": [] } ]"#;

/// Route a request for the hello service.
///
/// The inbound trace context (if any) parents the server span; the server
/// span in turn parents whatever the handlers do, so one trace covers the
/// whole request.
pub async fn router(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Body>, Infallible> {
    let parent_cx = state.telemetry.extract_context(req.headers());
    let tracer = state.telemetry.tracer();
    let span = tracer
        .span_builder("router")
        .with_kind(SpanKind::Server)
        .with_attributes([
            KeyValue::new(semconv::HTTP_REQUEST_METHOD, req.method().to_string()),
            KeyValue::new(semconv::URL_PATH, req.uri().path().to_string()),
        ])
        .start_with_context(tracer, &parent_cx);
    let cx = parent_cx.with_span(span);

    let response = match (req.method(), req.uri().path()) {
        (&Method::GET, "/call") | (&Method::POST, "/call") => handle_call(&state, &cx).await,
        (&Method::GET, "/health") => handle_health_check(&state, &cx).await,
        _ => {
            cx.span()
                .set_attribute(KeyValue::new(semconv::HTTP_RESPONSE_STATUS_CODE, 404));
            status_response(StatusCode::NOT_FOUND, Bytes::new())
        }
    };
    Ok(response)
}

/// Issue the downstream call and fold its outcome into the greeting.
/// Downstream failure is part of the answer, not a failure of this request,
/// so the status is 200 either way.
async fn handle_call(state: &AppState, cx: &Context) -> Response<Body> {
    info!("forwarding one downstream call");
    let greeting = format!("Hello world from {}", state.config.service_name);

    let msg = match state
        .client
        .post_json(
            cx,
            &state.config.downstream_url,
            Bytes::from_static(DEMO_PAYLOAD.as_bytes()),
        )
        .await
    {
        Ok(outcome) => format!("{greeting}\n{}", String::from_utf8_lossy(&outcome.body)),
        Err(err) => format!("{greeting} Error: {err}"),
    };

    text_response(msg)
}

async fn handle_health_check(state: &AppState, cx: &Context) -> Response<Body> {
    let tracer = state.telemetry.tracer();
    let _span = tracer
        .span_builder("health_check")
        .with_kind(SpanKind::Internal)
        .start_with_context(tracer, cx);
    text_response("ok")
}
