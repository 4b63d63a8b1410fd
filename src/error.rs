use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// The main error type for floodgate
///
/// Every request-path failure maps onto one of these variants; processing
/// failures inside the async processor are recorded on the event record and
/// never surface here.
#[derive(Debug, thiserror::Error)]
pub enum FloodgateError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Request timeout")]
    RequestTimeout,

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Standard error response format for API errors.
#[derive(Serialize)]
pub struct ErrorResponse {
    error: String,
    error_id: String,
}

impl FloodgateError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    pub fn request_timeout() -> Self {
        Self::RequestTimeout
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) | Self::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
        }
    }

    /// Returns a message suitable for client responses.
    ///
    /// Client errors (4xx) expose their message since the caller needs to
    /// know what went wrong. Server errors (5xx) return a generic message to
    /// prevent information disclosure (CWE-209); full details are logged
    /// server-side only.
    fn safe_message(&self) -> String {
        match self {
            Self::NotFound(msg) => format!("Not found: {}", msg),
            Self::BadRequest(msg) => format!("Bad request: {}", msg),
            Self::Unauthorized(msg) => format!("Unauthorized: {}", msg),
            Self::RequestTimeout => "Request timeout".to_string(),

            Self::Internal(_) | Self::Anyhow(_) => "Internal server error".to_string(),
            Self::ServiceUnavailable(_) => "Service unavailable".to_string(),
        }
    }
}

impl IntoResponse for FloodgateError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_id = uuid::Uuid::new_v4().to_string();

        tracing::error!(
            status = status.as_u16(),
            error_id = %error_id,
            error = %self,
            "Request failed"
        );

        let body = Json(ErrorResponse {
            error: self.safe_message(),
            error_id,
        });

        (status, body).into_response()
    }
}

/// Result type alias for floodgate handlers
pub type Result<T> = std::result::Result<T, FloodgateError>;

// Common error type conversions

impl From<serde_json::Error> for FloodgateError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            FloodgateError::BadRequest(format!("JSON error: {}", err))
        } else {
            FloodgateError::Internal(format!("JSON serialization error: {}", err))
        }
    }
}

impl From<reqwest::Error> for FloodgateError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FloodgateError::RequestTimeout
        } else if err.is_connect() {
            FloodgateError::ServiceUnavailable(format!("Connection error: {}", err))
        } else if err.is_status() {
            if let Some(status) = err.status() {
                match status.as_u16() {
                    401 => FloodgateError::Unauthorized("Downstream authentication failed".to_string()),
                    404 => FloodgateError::NotFound("Downstream resource not found".to_string()),
                    503 => FloodgateError::ServiceUnavailable("Downstream service unavailable".to_string()),
                    _ => FloodgateError::Internal(format!("Downstream error: {}", err)),
                }
            } else {
                FloodgateError::Internal(format!("HTTP error: {}", err))
            }
        } else {
            FloodgateError::Internal(format!("Request error: {}", err))
        }
    }
}
