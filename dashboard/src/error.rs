use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use monitor::MonitorError;
use tracing::error;

/// JSON error body with a status code.
#[derive(Debug)]
pub(crate) struct ApiError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
}

impl ApiError {
    pub(crate) fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<MonitorError> for ApiError {
    fn from(err: MonitorError) -> Self {
        let status = match &err {
            MonitorError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            MonitorError::TargetNotFound { .. } | MonitorError::RowNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            MonitorError::NoReferenceManager => StatusCode::CONFLICT,
            MonitorError::Sync(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %err, "monitor operation failed");
        }
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}
