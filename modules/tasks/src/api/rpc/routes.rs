use std::sync::Arc;
use std::time::Duration;

use axum::middleware::from_fn;
use axum::routing::post;
use axum::{Extension, Router};

use super::{handlers, interceptor};
use crate::domain::service::TaskService;

pub const SERVICE_PATH: &str = "/tasks.v1.TaskService";

/// Server-side budget for a single call, read by the `Call` extractor.
#[derive(Debug, Clone, Copy)]
pub struct CallTimeout(pub Duration);

fn method(name: &str) -> String {
    format!("{SERVICE_PATH}/{name}")
}

/// One POST route per unary method. The interceptor wraps matched routes
/// only; unknown paths fall through to the host's fallback.
pub fn router(service: Arc<TaskService>, call_timeout: Duration) -> Router {
    Router::new()
        .route(&method("CreateTask"), post(handlers::create_task))
        .route(&method("GetTask"), post(handlers::get_task))
        .route(&method("ListTasks"), post(handlers::list_tasks))
        .route(&method("UpdateTask"), post(handlers::update_task))
        .route(&method("DeleteTask"), post(handlers::delete_task))
        .route(
            &method("HealthCheck"),
            post(handlers::health_check).get(handlers::health_check),
        )
        .route_layer(from_fn(interceptor::log_rpc_call))
        .layer(Extension(service))
        .layer(Extension(CallTimeout(call_timeout)))
}
