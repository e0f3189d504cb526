//! HTTP host for the task service: assembles the middleware pipeline around
//! the module routes and serves them.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header::CONTENT_TYPE, HeaderName, Method};
use axum::{middleware::from_fn, Router};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

pub mod access_log;
pub mod config;
pub mod error;
pub mod recovery;
pub mod request_id;
pub mod shutdown;

pub use config::ApiIngressConfig;

/// Client-supplied per-call budget in milliseconds.
pub const CONNECT_TIMEOUT_HEADER: &str = "connect-timeout-ms";

pub struct ApiIngress {
    config: ApiIngressConfig,
}

impl ApiIngress {
    pub fn new(config: ApiIngressConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ApiIngressConfig {
        &self.config
    }

    /// Wrap `routes` in the pipeline, outermost first:
    /// SetRequestId -> PropagateRequestId -> push_req_id_to_extensions ->
    /// catch_panic -> access log -> Timeout -> CORS -> routes.
    /// Unknown paths and rejected verbs get JSON error bodies.
    pub fn build_router(&self, routes: Router) -> Router {
        let x_request_id = request_id::header();
        let service: Arc<str> = Arc::from(self.config.service_name.as_str());

        let mut router = routes
            .fallback(error::not_found)
            .method_not_allowed_fallback(error::method_not_allowed);

        if self.config.cors_enabled {
            router = router.layer(cors_layer());
        }

        // `.layer()` wraps everything added before it, so the last one applied
        // is the first to see a request.
        router
            .layer(TimeoutLayer::new(self.config.backstop_timeout()))
            .layer(access_log::layer(service))
            .layer(from_fn(recovery::catch_panic))
            .layer(from_fn(request_id::push_req_id_to_extensions))
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(SetRequestIdLayer::new(x_request_id, request_id::MakeReqId))
    }

    pub async fn bind(&self) -> Result<TcpListener> {
        let addr: SocketAddr = self
            .config
            .bind_addr
            .parse()
            .with_context(|| format!("invalid bind address '{}'", self.config.bind_addr))?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        tracing::info!(addr = %listener.local_addr()?, "HTTP server bound");
        Ok(listener)
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn serve<F>(&self, listener: TcpListener, router: Router, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            CONTENT_TYPE,
            request_id::header(),
            HeaderName::from_static(CONNECT_TIMEOUT_HEADER),
        ])
        .expose_headers([request_id::header()])
}
