// === PUBLIC CONTRACT ===
pub mod contract;

pub use contract::{context, error, messages, model};
pub use contract::{CallMeta, RpcCode, RpcError};

// === MODULE CONFIG ===
pub mod config;
pub use config::TasksConfig;

// === INTERNAL MODULES ===
// Exposed for wiring by the server binary and for integration tests.
pub mod api;
pub mod domain;
pub mod infra;

pub use api::rpc::routes::{router, CallTimeout, SERVICE_PATH};
pub use domain::service::TaskService;
pub use infra::storage::{InMemoryTaskRepository, SqlRepoOptions, SqlTaskRepository};
