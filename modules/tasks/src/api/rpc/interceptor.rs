use api_ingress::request_id;
use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::contract::RpcCode;

/// Call-level interceptor around the typed RPC dispatch only.
///
/// Logs the procedure and its duration; a status-coded error returned by the
/// handler is logged again here with its code so the call as a whole is
/// visible in one line.
pub async fn log_rpc_call(req: Request<Body>, next: Next) -> Response {
    let procedure = req.uri().path().to_owned();
    let request_id = request_id::from_headers(req.headers()).to_owned();
    let started = Instant::now();

    let response = next.run(req).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    match response.extensions().get::<RpcCode>() {
        Some(code) => warn!(
            %procedure,
            %request_id,
            duration_ms,
            code = %code,
            retryable = code.is_retryable(),
            "rpc call failed"
        ),
        None => info!(%procedure, %request_id, duration_ms, "rpc call completed"),
    }

    response
}
