//! Uniform JSON response envelope.
//!
//! Successful business calls answer `{"success": true, "data": ...}`; every
//! failure answers `{"success": false, "error": {"code", "message"}}` with
//! the HTTP status repeated in `code`.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use super::middleware::{HEADER_LIMIT, HEADER_REMAINING};
use crate::error::AdmissionError;

/// Success wrapper for handler payloads.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl AdmissionError {
    /// HTTP status reported for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AdmissionError::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
            AdmissionError::MissingCredential => StatusCode::UNAUTHORIZED,
            AdmissionError::InvalidCredential => StatusCode::FORBIDDEN,
            AdmissionError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AdmissionError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AdmissionError::NotFound => StatusCode::NOT_FOUND,
            AdmissionError::Downstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// An [`AdmissionError`] ready to be rendered, with optional internal
/// detail that is only attached in debug mode.
#[derive(Debug)]
pub struct ApiError {
    error: AdmissionError,
    detail: Option<String>,
}

impl ApiError {
    /// Render `error`, exposing provider failure text only when `debug` is set.
    pub fn with_debug(error: AdmissionError, debug: bool) -> Self {
        let detail = match &error {
            AdmissionError::Downstream(cause) if debug => Some(cause.to_string()),
            _ => None,
        };
        Self { error, detail }
    }

    pub fn status_code(&self) -> StatusCode {
        self.error.status_code()
    }
}

impl From<AdmissionError> for ApiError {
    fn from(error: AdmissionError) -> Self {
        Self {
            error,
            detail: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorEnvelope {
            success: false,
            error: ErrorBody {
                code: status.as_u16(),
                message: self.error.to_string(),
                detail: self.detail,
            },
        };

        let mut response = (status, Json(body)).into_response();
        let headers = response.headers_mut();

        match &self.error {
            AdmissionError::MissingCredential => {
                headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("ApiKey"));
            }
            AdmissionError::RateLimitExceeded { limit, window_secs } => {
                headers.insert(header::RETRY_AFTER, HeaderValue::from(*window_secs));
                headers.insert(HEADER_LIMIT, HeaderValue::from(*limit));
                headers.insert(HEADER_REMAINING, HeaderValue::from_static("0"));
            }
            _ => {}
        }

        response
    }
}
