//! The forward target: walks a JSON chain of steps, calling each named URL
//! with the rest of the chain as its body, so a trace can be stretched
//! across as many hops as the payload describes.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use opentelemetry::trace::{SpanKind, TraceContextExt, Tracer};
use opentelemetry::{Context, KeyValue};
use opentelemetry_semantic_conventions::trace as semconv;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::server::{status_response, text_response, Body};
use crate::AppState;

/// One step of a forward chain: optionally sleep, then call `url` with the
/// remaining `arguments` as the request body. `null` anywhere means "stop".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForwardStep {
    /// Milliseconds to pause before calling on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub arguments: Option<Vec<ForwardStep>>,
}

/// Route a request for the forward target.
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
        (&Method::POST, "/api/forward") => handle_forward(&state, &cx, req).await,
        _ => {
            cx.span()
                .set_attribute(KeyValue::new(semconv::HTTP_RESPONSE_STATUS_CODE, 404));
            status_response(StatusCode::NOT_FOUND, Bytes::new())
        }
    };
    Ok(response)
}

async fn handle_forward(state: &AppState, cx: &Context, req: Request<Incoming>) -> Response<Body> {
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => return status_response(StatusCode::BAD_REQUEST, "invalid forward payload"),
    };
    let steps: Option<Vec<ForwardStep>> = match serde_json::from_slice(&body) {
        Ok(steps) => steps,
        Err(_) => return status_response(StatusCode::BAD_REQUEST, "invalid forward payload"),
    };
    let Some(steps) = steps else {
        return text_response("done");
    };
    info!(steps = steps.len(), "walking forward chain");

    let mut result = String::new();
    for step in &steps {
        if let Some(millis) = step.sleep {
            result = format!("slept for {millis} ms");
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
        result.push_str(&call_next(state, cx, step).await);
    }
    text_response(result)
}

/// Call the next hop named by `step`, handing it the rest of the chain.
/// A hop that fails becomes text in the answer, same as the hello handler.
async fn call_next(state: &AppState, cx: &Context, step: &ForwardStep) -> String {
    let Some(url) = step.url.as_deref() else {
        return "all done".to_string();
    };
    let chain = match serde_json::to_vec(&step.arguments) {
        Ok(chain) => Bytes::from(chain),
        Err(err) => return format!("Error: {err}"),
    };
    match state.client.get_json(cx, url, chain).await {
        Ok(outcome) => String::from_utf8_lossy(&outcome.body).into_owned(),
        Err(err) => format!("Error: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_demo_payload() {
        let steps: Option<Vec<ForwardStep>> =
            serde_json::from_str(r#"[ { "url": "http://blank.org", "arguments": [] } ]"#).unwrap();
        let steps = steps.unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].url.as_deref(), Some("http://blank.org"));
        assert_eq!(steps[0].sleep, None);
        assert!(steps[0].arguments.as_deref().is_some_and(|c| c.is_empty()));
    }

    #[test]
    fn null_and_missing_fields_are_tolerated() {
        let steps: Option<Vec<ForwardStep>> =
            serde_json::from_str(r#"[{"sleep": 5}, {"url": null, "arguments": null}]"#).unwrap();
        let steps = steps.unwrap();
        assert_eq!(steps[0].sleep, Some(5));
        assert!(steps[0].url.is_none());
        assert!(steps[1].url.is_none());
        assert!(steps[1].arguments.is_none());
    }

    #[test]
    fn null_chain_parses_to_none() {
        let steps: Option<Vec<ForwardStep>> = serde_json::from_str("null").unwrap();
        assert!(steps.is_none());
    }

    #[test]
    fn chain_serializes_without_empty_fields() {
        let step = ForwardStep {
            url: Some("http://next-hop/api/forward".to_string()),
            ..ForwardStep::default()
        };
        let json = serde_json::to_string(&vec![step]).unwrap();
        assert_eq!(json, r#"[{"url":"http://next-hop/api/forward","arguments":null}]"#);
    }
}
