use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use crate::contract::{RpcCode, RpcError};

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: RpcCode,
    message: String,
}

pub fn status_for(code: RpcCode) -> StatusCode {
    match code {
        RpcCode::InvalidArgument => StatusCode::BAD_REQUEST,
        RpcCode::NotFound => StatusCode::NOT_FOUND,
        RpcCode::AlreadyExists => StatusCode::CONFLICT,
        RpcCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        RpcCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let code = self.code;
        let mut response = (
            status_for(code),
            Json(ErrorBody {
                code,
                message: self.message,
            }),
        )
            .into_response();
        // Picked up by the call interceptor.
        response.extensions_mut().insert(code);
        response
    }
}
