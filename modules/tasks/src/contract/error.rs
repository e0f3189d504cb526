use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status kinds surfaced to callers. Success is the absence of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcCode {
    InvalidArgument,
    NotFound,
    AlreadyExists,
    Unavailable,
    Internal,
}

impl RpcCode {
    pub fn as_str(self) -> &'static str {
        match self {
            RpcCode::InvalidArgument => "invalid_argument",
            RpcCode::NotFound => "not_found",
            RpcCode::AlreadyExists => "already_exists",
            RpcCode::Unavailable => "unavailable",
            RpcCode::Internal => "internal",
        }
    }

    /// Only transient storage trouble is worth retrying.
    pub fn is_retryable(self) -> bool {
        matches!(self, RpcCode::Unavailable)
    }
}

impl std::fmt::Display for RpcCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by every task operation. The message is safe to show to
/// callers; internal detail only goes to the server log.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct RpcError {
    pub code: RpcCode,
    pub message: String,
}

impl RpcError {
    pub fn new(code: RpcCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(RpcCode::InvalidArgument, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RpcCode::NotFound, message)
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(RpcCode::AlreadyExists, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(RpcCode::Unavailable, message)
    }

    pub fn internal() -> Self {
        Self::new(RpcCode::Internal, "internal error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_render_in_snake_case() {
        assert_eq!(RpcCode::InvalidArgument.as_str(), "invalid_argument");
        assert_eq!(
            serde_json::to_string(&RpcCode::AlreadyExists).unwrap(),
            "\"already_exists\""
        );
        assert_eq!(RpcError::not_found("gone").to_string(), "not_found: gone");
    }

    #[test]
    fn internal_error_hides_detail() {
        let err = RpcError::internal();
        assert_eq!(err.code, RpcCode::Internal);
        assert_eq!(err.message, "internal error");
        assert!(!err.code.is_retryable());
        assert!(RpcCode::Unavailable.is_retryable());
    }
}
