//! HTTP error mapping.
//!
//! Every error renders as `{"error": "<message>"}` with a status code
//! matching the failure.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    PayloadTooLarge(String),
    UnsupportedMediaType(String),
    TooManyRequests(String),
    BadGateway(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<picbase_core::Error> for ApiError {
    fn from(err: picbase_core::Error) -> Self {
        use picbase_core::Error;
        match err {
            Error::NotFound(msg) => ApiError::NotFound(format!("Not found: {}", msg)),
            Error::EntryNotFound(id) => ApiError::NotFound(format!("Entry not found: {}", id)),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Conflict(msg) => ApiError::Conflict(msg),
            Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            Error::Forbidden(msg) => ApiError::Forbidden(msg),
            Error::PayloadTooLarge(msg) => ApiError::PayloadTooLarge(msg),
            Error::UnsupportedMediaType(msg) => ApiError::UnsupportedMediaType(msg),
            Error::AiUnavailable(msg) => ApiError::ServiceUnavailable(msg),
            Error::Inference(msg) => ApiError::BadGateway(format!("AI analysis failed: {}", msg)),
            ref e if e.is_unique_violation() => {
                ApiError::Conflict("Resource already exists".to_string())
            }
            other => {
                tracing::error!(error = %other, "Internal error");
                ApiError::Internal("Internal server error".to_string())
            }
        }
    }
}

impl From<picbase_crypto::CryptoError> for ApiError {
    fn from(err: picbase_crypto::CryptoError) -> Self {
        tracing::error!(error = %err, "Credential processing failed");
        ApiError::Internal("Internal server error".to_string())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge("Upload exceeds the maximum allowed size".to_string())
        } else {
            ApiError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::PayloadTooLarge(msg)
            | ApiError::UnsupportedMediaType(msg)
            | ApiError::TooManyRequests(msg)
            | ApiError::BadGateway(msg)
            | ApiError::ServiceUnavailable(msg)
            | ApiError::Internal(msg) => msg,
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
