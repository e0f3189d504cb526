//! JSON-over-HTTP unary RPC surface for `tasks.v1.TaskService`.

pub mod error;
pub mod handlers;
pub mod interceptor;
pub mod routes;
