use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pagewalk_core::PagewalkError;
use serde_json::json;

/// Error returned by route handlers, rendered as `{"status": "error", "message": ...}`.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request body or query.
    BadRequest(String),
    Engine(PagewalkError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Engine(err) => match err {
                PagewalkError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
                PagewalkError::FetchFailure { .. } => StatusCode::BAD_GATEWAY,
                PagewalkError::NoContentFound { .. } | PagewalkError::HtmlParseError(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                PagewalkError::NoPatternDetected { .. } | PagewalkError::NoNavigationTarget { .. } => {
                    StatusCode::NOT_FOUND
                }
                PagewalkError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
                PagewalkError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<PagewalkError> for ApiError {
    fn from(err: PagewalkError) -> Self {
        Self::Engine(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            ApiError::BadRequest(message) => message,
            ApiError::Engine(err) => err.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(%status, %message, "request failed");
        } else {
            tracing::debug!(%status, %message, "request rejected");
        }

        (status, Json(json!({ "status": "error", "message": message }))).into_response()
    }
}
