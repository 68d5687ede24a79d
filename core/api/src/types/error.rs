// dryrun/core/api/src/types/error.rs

use dryrun_execution::ExecutionError;
use jsonrpc_core::{Error as RpcError, ErrorCode};
use thiserror::Error;

pub const INVALID_PARAMS_CODE: i64 = -32602;
pub const NOT_FOUND_CODE: i64 = -100;
pub const INTERNAL_CODE: i64 = -500;

/// Errors surfaced to RPC callers
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ApiError::InvalidParams(message.into())
    }

    pub fn code(&self) -> i64 {
        match self {
            ApiError::InvalidParams(_) => INVALID_PARAMS_CODE,
            ApiError::NotFound(_) => NOT_FOUND_CODE,
            ApiError::Internal(_) => INTERNAL_CODE,
        }
    }
}

impl From<ExecutionError> for ApiError {
    fn from(error: ExecutionError) -> Self {
        match error {
            e if e.is_not_found() => ApiError::NotFound(e.to_string()),
            e @ (ExecutionError::InvalidInput(_)
            | ExecutionError::InvalidNef(_)
            | ExecutionError::InvalidManifest(_)
            | ExecutionError::TimestampRegression { .. }) => ApiError::InvalidParams(e.to_string()),
            e => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<ApiError> for RpcError {
    fn from(error: ApiError) -> Self {
        let code = match error {
            ApiError::InvalidParams(_) => ErrorCode::InvalidParams,
            _ => ErrorCode::ServerError(error.code()),
        };
        RpcError {
            code,
            message: error.to_string(),
            data: None,
        }
    }
}
