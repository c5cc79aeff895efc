//! HTTP error taxonomy.
//!
//! Every failure leaving a handler is an [`ApiError`]. It is rendered as
//! `{"detail": "<message>"}` with the status from [`ApiError::status_code`].

use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conversion::ConversionError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Validation or conversion of the SVG failed
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// `X-API-Key` header absent
    #[error("Missing X-API-Key header")]
    MissingApiKey,

    /// `X-API-Key` header does not match the configured secret
    #[error("Invalid API key")]
    InvalidApiKey,

    /// No secret configured, so protected routes cannot be served
    #[error("API_KEY not configured on server")]
    ServerMisconfigured,

    /// Request body could not be read as the endpoint's input shape
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Request body exceeds the maximum allowed size")]
    PayloadTooLarge,

    #[error("Not Found")]
    NotFound,

    /// Unexpected error with full context chain
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Conversion(error) => match error {
                ConversionError::EmptyInput
                | ConversionError::UnsupportedType
                | ConversionError::MalformedSvg(_)
                | ConversionError::Failed(_) => StatusCode::BAD_REQUEST,
                ConversionError::TimedOut(_) => StatusCode::GATEWAY_TIMEOUT,
                ConversionError::Aborted => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::MissingApiKey => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InvalidApiKey => StatusCode::UNAUTHORIZED,
            ApiError::ServerMisconfigured => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    pub fn from_json_rejection(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge;
        }
        ApiError::InvalidRequest(rejection.body_text())
    }

    pub fn from_multipart_rejection(rejection: MultipartRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge;
        }
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge;
        }
        ApiError::InvalidRequest(format!("Failed to read upload: {}", error.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "Internal service error: {:#}", self);
        } else if matches!(self, ApiError::InvalidApiKey | ApiError::MissingApiKey) {
            tracing::info!("Authorization error: {}", self);
        } else {
            tracing::debug!(status = status.as_u16(), "Client error: {}", self);
        }

        let body = ErrorBody {
            detail: self.user_message(),
        };
        (status, Json(body)).into_response()
    }
}
