//! Maps validation and repository failures onto RPC status kinds.
//!
//! Every failure is logged here, once, where it is first classified:
//! validation at warn, repository failures at error.

use tracing::{error, warn};

use crate::contract::{CallMeta, RpcError};
use crate::domain::error::{RepoError, ValidationError};

const DUPLICATE_MARKERS: &[&str] = &["duplicate", "constraint", "already exists"];
const TRANSIENT_MARKERS: &[&str] = &["timeout", "timed out", "connection"];

pub fn validation_failure(err: &ValidationError, meta: &CallMeta) -> RpcError {
    warn!(
        request_id = %meta.request_id,
        procedure = %meta.procedure,
        field = err.field,
        reason = %err.message,
        "request validation failed"
    );
    RpcError::invalid_argument(err.to_string())
}

/// Body could not be decoded into the request message.
pub fn malformed_request(detail: &str, meta: &CallMeta) -> RpcError {
    warn!(
        request_id = %meta.request_id,
        procedure = %meta.procedure,
        reason = %detail,
        "malformed request body"
    );
    RpcError::invalid_argument(format!("malformed request: {detail}"))
}

pub fn repository_failure(err: &RepoError, meta: &CallMeta) -> RpcError {
    let mapped = classify(err);
    error!(
        request_id = %meta.request_id,
        procedure = %meta.procedure,
        code = %mapped.code,
        error = %err,
        "repository call failed"
    );
    mapped
}

fn classify(err: &RepoError) -> RpcError {
    match err {
        RepoError::NotFound { id } => RpcError::not_found(format!("task {id} not found")),
        RepoError::Conflict { .. } => RpcError::already_exists("task already exists"),
        RepoError::Unavailable { .. } => RpcError::unavailable("storage temporarily unavailable"),
        RepoError::Storage { message } => {
            let lower = message.to_ascii_lowercase();
            if contains_any(&lower, DUPLICATE_MARKERS) {
                RpcError::already_exists("task already exists")
            } else if contains_any(&lower, TRANSIENT_MARKERS) {
                RpcError::unavailable("storage temporarily unavailable")
            } else {
                RpcError::internal()
            }
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}
