use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use api_ingress::{request_id, CONNECT_TIMEOUT_HEADER};
use axum::body::Bytes;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::Json;
use axum::Extension;
use serde::de::DeserializeOwned;
use tokio::time::Instant;

use super::routes::CallTimeout;
use crate::contract::messages::*;
use crate::contract::{CallMeta, RpcError};
use crate::domain::service::TaskService;
use crate::domain::translate;

/// Extracts the explicit per-call metadata handed to the service.
pub struct Call(pub CallMeta);

impl<S> FromRequestParts<S> for Call
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request_id = request_id::from_headers(&parts.headers).to_owned();

        let mut meta = CallMeta::new(request_id, parts.uri.path());
        if let Some(deadline) = deadline(parts) {
            meta = meta.with_deadline(deadline);
        }
        Ok(Call(meta))
    }
}

/// The earlier of the server's call timeout and the client's own budget.
fn deadline(parts: &Parts) -> Option<Instant> {
    let now = Instant::now();
    let server = parts
        .extensions
        .get::<CallTimeout>()
        .map(|CallTimeout(t)| now + *t);
    let client = parts
        .headers
        .get(CONNECT_TIMEOUT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|ms| now + Duration::from_millis(ms));

    match (server, client) {
        (Some(s), Some(c)) => Some(s.min(c)),
        (s, c) => s.or(c),
    }
}

/// An empty body decodes as the message's zero value.
fn decode<T>(body: &Bytes, meta: &CallMeta) -> Result<T, RpcError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| translate::malformed_request(&e.to_string(), meta))
}

pub async fn create_task(
    Extension(svc): Extension<Arc<TaskService>>,
    Call(meta): Call,
    body: Bytes,
) -> Result<Json<CreateTaskResponse>, RpcError> {
    let req = decode(&body, &meta)?;
    svc.create_task(&meta, req).await.map(Json)
}

pub async fn get_task(
    Extension(svc): Extension<Arc<TaskService>>,
    Call(meta): Call,
    body: Bytes,
) -> Result<Json<GetTaskResponse>, RpcError> {
    let req = decode(&body, &meta)?;
    svc.get_task(&meta, req).await.map(Json)
}

pub async fn list_tasks(
    Extension(svc): Extension<Arc<TaskService>>,
    Call(meta): Call,
    body: Bytes,
) -> Result<Json<ListTasksResponse>, RpcError> {
    let req = decode(&body, &meta)?;
    svc.list_tasks(&meta, req).await.map(Json)
}

pub async fn update_task(
    Extension(svc): Extension<Arc<TaskService>>,
    Call(meta): Call,
    body: Bytes,
) -> Result<Json<UpdateTaskResponse>, RpcError> {
    let req = decode(&body, &meta)?;
    svc.update_task(&meta, req).await.map(Json)
}

pub async fn delete_task(
    Extension(svc): Extension<Arc<TaskService>>,
    Call(meta): Call,
    body: Bytes,
) -> Result<Json<DeleteTaskResponse>, RpcError> {
    let req = decode(&body, &meta)?;
    svc.delete_task(&meta, req).await.map(Json)
}

/// Accepts GET as well, for load-balancer probes.
pub async fn health_check(
    Extension(svc): Extension<Arc<TaskService>>,
    Call(meta): Call,
) -> Result<Json<HealthCheckResponse>, RpcError> {
    svc.health_check(&meta, HealthCheckRequest {})
        .await
        .map(Json)
}
