use axum::{
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::request_id;

/// Error body produced by the host itself (fallback, recovered panics).
#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<&'a str>,
}

pub fn error_response(
    status: StatusCode,
    code: &str,
    message: &str,
    request_id: Option<&str>,
) -> Response {
    let body = ErrorBody {
        code,
        message,
        request_id,
    };
    (status, Json(body)).into_response()
}

/// Generic response for a fault caught by the recovery stage. Never carries
/// the fault's detail.
pub fn internal_error(request_id: &str) -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal",
        "internal error",
        Some(request_id),
    )
}

/// Fallback for paths no module registered.
pub async fn not_found(uri: Uri, headers: HeaderMap) -> Response {
    let rid = request_id::from_headers(&headers);
    tracing::debug!(path = %uri.path(), request_id = %rid, "no route matched");
    error_response(
        StatusCode::NOT_FOUND,
        "not_found",
        &format!("no procedure at {}", uri.path()),
        Some(rid),
    )
}

/// Fallback for a known path called with a verb it does not accept.
pub async fn method_not_allowed(method: Method, uri: Uri, headers: HeaderMap) -> Response {
    let rid = request_id::from_headers(&headers);
    tracing::debug!(%method, path = %uri.path(), request_id = %rid, "method not allowed");
    error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        "invalid_argument",
        &format!("{method} is not accepted at {}", uri.path()),
        Some(rid),
    )
}
