//! Gateway Response Types
//!
//! Standard response envelope and the error-to-HTTP mapping used by
//! every handler.

use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

use crate::error::WorkflowError;

/// Standard response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// 0 for success, non-zero for errors
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

/// Numeric error codes mirrored in the response envelope.
pub mod error_codes {
    pub const INVALID_TRANSITION: i32 = 1001;
    pub const UNAUTHORIZED: i32 = 1002;
    pub const VALIDATION: i32 = 1003;
    pub const NOT_FOUND: i32 = 1004;
    pub const DEPENDENCY: i32 = 1005;
    pub const STORAGE: i32 = 1006;
}

fn error_code(err: &WorkflowError) -> i32 {
    match err {
        WorkflowError::InvalidTransition(_) => error_codes::INVALID_TRANSITION,
        WorkflowError::Unauthorized => error_codes::UNAUTHORIZED,
        WorkflowError::ValidationError(_) => error_codes::VALIDATION,
        WorkflowError::NotFound(_) => error_codes::NOT_FOUND,
        WorkflowError::DependencyFailure(_) => error_codes::DEPENDENCY,
        WorkflowError::StorageError(_) => error_codes::STORAGE,
    }
}

fn http_status(err: &WorkflowError) -> StatusCode {
    StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<()>>)>;

/// Wrap a handler result in the response envelope.
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

pub fn fail<T>(err: WorkflowError) -> ApiResult<T> {
    Err((
        http_status(&err),
        Json(ApiResponse::<()>::error(error_code(&err), err.to_string())),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope() {
        let resp = ApiResponse::success(42);
        assert_eq!(resp.code, 0);
        assert_eq!(resp.msg, "ok");
        assert_eq!(resp.data, Some(42));
    }

    #[test]
    fn test_error_mapping() {
        let err = WorkflowError::Unauthorized;
        assert_eq!(error_code(&err), error_codes::UNAUTHORIZED);
        assert_eq!(http_status(&err), StatusCode::FORBIDDEN);

        let err = WorkflowError::InvalidTransition("x".to_string());
        assert_eq!(error_code(&err), error_codes::INVALID_TRANSITION);
        assert_eq!(http_status(&err), StatusCode::CONFLICT);
    }
}
