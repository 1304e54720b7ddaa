use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::ingest::RejectReason;
use crate::service::ReadError;
use crate::store::StoreError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub success: bool,
    pub code: String,
    pub message: String,
    pub trace_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub is_operational: bool,
}

/// Shared body for every refused ingestion, whatever the reason.
pub const READ_REJECTED_MESSAGE: &str = "Read was not counted";

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

impl AppError {
    fn operational(status: StatusCode, code: &str, message: &str) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    pub fn bad_request(code: &str, message: &str) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::operational(StatusCode::UNAUTHORIZED, "AUTH_UNAUTHORIZED", message)
    }

    pub fn forbidden(code: &str, message: &str) -> Self {
        Self::operational(StatusCode::FORBIDDEN, code, message)
    }

    pub fn not_found(code: &str, message: &str) -> Self {
        Self::operational(StatusCode::NOT_FOUND, code, message)
    }

    pub fn conflict(code: &str, message: &str) -> Self {
        Self::operational(StatusCode::CONFLICT, code, message)
    }

    pub fn too_many_requests(message: &str) -> Self {
        Self::operational(StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED", message)
    }

    /// Retryable storage trouble; the cause is logged, never returned.
    pub fn store_unavailable() -> Self {
        Self::operational(
            StatusCode::SERVICE_UNAVAILABLE,
            "STORE_UNAVAILABLE",
            "Storage temporarily unavailable",
        )
    }

    /// A write timed out and may still commit. Not marked retryable.
    pub fn store_outcome_unknown() -> Self {
        Self::operational(
            StatusCode::GATEWAY_TIMEOUT,
            "STORE_OUTCOME_UNKNOWN",
            "Storage did not confirm the write in time; it may still be applied",
        )
    }

    pub fn internal(message: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.to_string(),
            is_operational: false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let exposed_message = if self.is_operational {
            self.message.clone()
        } else {
            INTERNAL_ERROR_MESSAGE.to_string()
        };

        if self.is_operational {
            tracing::warn!(status = %self.status, code = %self.code, error = %self.message, "API error");
        } else {
            tracing::error!(status = %self.status, code = %self.code, error = %self.message, "Internal API error");
        }

        (
            self.status,
            Json(ErrorBody {
                success: false,
                code: self.code,
                message: exposed_message,
                trace_id: None,
            }),
        )
            .into_response()
    }
}

// Validation, NotFound and Conflict carry safe messages. Timeout and Task are
// retryable 503s, a write timeout is a 504. Everything else is a redacted 500.
impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        match &value {
            StoreError::Validation(msg) => AppError::bad_request("VALIDATION_ERROR", msg),
            StoreError::NotFound { .. } => AppError::not_found("NOT_FOUND", &value.to_string()),
            StoreError::Conflict { .. } => AppError::conflict("CONFLICT", &value.to_string()),
            StoreError::Timeout { .. } | StoreError::Task(_) => {
                tracing::error!(error = %value, "Store unavailable");
                AppError::store_unavailable()
            }
            StoreError::WriteTimeout { .. } => {
                tracing::error!(error = %value, "Store write outcome unknown");
                AppError::store_outcome_unknown()
            }
            _ => AppError::internal(&value.to_string()),
        }
    }
}

impl From<ReadError> for AppError {
    fn from(value: ReadError) -> Self {
        match value {
            ReadError::InvalidArgument(msg) => AppError::bad_request("INVALID_ARGUMENT", &msg),
            ReadError::PeriodDisabled(period) => AppError::bad_request(
                "PERIOD_DISABLED",
                &format!("Breakdown for period '{period}' is disabled"),
            ),
            ReadError::NotFound(content_id) => AppError::not_found(
                "CONTENT_NOT_FOUND",
                &format!("Content {content_id} not found"),
            ),
            ReadError::Rejected(RejectReason::NotFound) => {
                AppError::not_found("READ_REJECTED", READ_REJECTED_MESSAGE)
            }
            ReadError::Rejected(_) => AppError::forbidden("READ_REJECTED", READ_REJECTED_MESSAGE),
            ReadError::StorageUnavailable(source) => {
                tracing::error!(error = %source, "Store unavailable");
                AppError::store_unavailable()
            }
            ReadError::OutcomeUnknown(source) => {
                tracing::error!(error = %source, "Store write outcome unknown");
                AppError::store_outcome_unknown()
            }
            ReadError::Internal(source) => AppError::internal(&source.to_string()),
        }
    }
}

pub fn ok<T: Serialize>(data: T) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            data,
        }),
    )
}
