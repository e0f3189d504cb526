use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header::USER_AGENT, Request, Response};
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnBodyChunk, DefaultOnEos, TraceLayer};
use tracing::field::Empty;
use tracing::{error, info, Span};

use crate::request_id;

/// Access logging: one `http_request` span per request, one entry when the
/// request starts and one when the response is ready. Completions with a
/// status of 400 or above are logged at error level, the rest at info.
#[allow(clippy::type_complexity)]
pub fn layer(
    service: Arc<str>,
) -> TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    impl Fn(&Request<Body>) -> Span + Clone,
    impl Fn(&Request<Body>, &Span) + Clone,
    impl Fn(&Response<Body>, Duration, &Span) + Clone,
    DefaultOnBodyChunk,
    DefaultOnEos,
    (),
> {
    TraceLayer::new_for_http()
        .make_span_with(move |req: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %req.method(),
                path = %req.uri().path(),
                version = ?req.version(),
                service = %service,
                request_id = %request_id::from_headers(req.headers()),
                status = Empty,
                latency_ms = Empty
            )
        })
        .on_request(|req: &Request<Body>, _span: &Span| {
            let user_agent = req
                .headers()
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            let peer = req
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.to_string())
                .unwrap_or_else(|| "-".to_string());
            info!(%user_agent, %peer, "request started");
        })
        .on_response(|res: &Response<Body>, latency: Duration, span: &Span| {
            let status = res.status().as_u16();
            let latency_ms = latency.as_millis() as u64;
            span.record("status", status);
            span.record("latency_ms", latency_ms);
            if status >= 400 {
                error!(status, latency_ms, "request completed");
            } else {
                info!(status, latency_ms, "request completed");
            }
        })
        // Failures are already covered by the completion entry.
        .on_failure(())
}
