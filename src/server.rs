//! Connection handling shared by both services.

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use tokio::net::TcpListener;
use tracing::{debug, warn};

/// Body type shared by every handler.
pub type Body = BoxBody<Bytes, hyper::Error>;

/// Response body from a static or formatted string.
pub fn full(body: impl Into<Bytes>) -> Body {
    Full::new(body.into()).map_err(|err| match err {}).boxed()
}

/// 200 with a text body.
pub fn text_response(body: impl Into<Bytes>) -> Response<Body> {
    Response::new(full(body))
}

pub fn status_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Body> {
    let mut res = Response::new(full(body));
    *res.status_mut() = status;
    res
}

/// Accept loop: one spawned task per connection, every request dispatched
/// through `handler` with the shared state. Returns only if accepting fails.
pub async fn serve<S, H, Fut>(
    listener: TcpListener,
    state: Arc<S>,
    handler: H,
) -> std::io::Result<()>
where
    S: Send + Sync + 'static,
    H: Fn(Request<Incoming>, Arc<S>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Response<Body>, Infallible>> + Send + 'static,
{
    loop {
        let (stream, peer) = listener.accept().await?;
        debug!(%peer, "accepted connection");
        let state = state.clone();
        let handler = handler.clone();
        tokio::spawn(async move {
            let service = service_fn(move |req| handler(req, state.clone()));
            if let Err(err) = Builder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                warn!(error = %err, "connection error");
            }
        });
    }
}
