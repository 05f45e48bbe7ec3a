use std::sync::Arc;

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pictor_core::{Error, ErrorCode, Storage, config::LimitsConfig};
use pictor_vision::Vision;
use serde::Serialize;

/// Shared handles every endpoint receives.
#[derive(Clone)]
pub struct ApiState {
    storage: Storage,
    vision: Vision,
    limits: Arc<LimitsConfig>,
}

impl ApiState {
    pub fn new(storage: Storage, vision: Vision, limits: LimitsConfig) -> Self {
        Self {
            storage,
            vision,
            limits: Arc::new(limits),
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn vision(&self) -> &Vision {
        &self.vision
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub detail: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: ErrorCode::InvalidParameter,
            message: message.into(),
        }
    }
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ErrorCode::InvalidParameter => StatusCode::BAD_REQUEST,
        ErrorCode::StorageWriteError | ErrorCode::StorageReadError => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        ErrorCode::ImageDecodeError | ErrorCode::TransformError => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorCode::EngineUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let code = err.code();
        Self {
            status: status_for(code),
            code,
            message: err.to_string(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        // body limit hits surface here too
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self {
                status: StatusCode::PAYLOAD_TOO_LARGE,
                code: ErrorCode::PayloadTooLarge,
                message: "Upload exceeds the size limit".to_string(),
            };
        }
        Self::bad_request(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = %self.code, status = %self.status, "{}", self.message);
        } else {
            tracing::debug!(code = %self.code, status = %self.status, "{}", self.message);
        }

        (
            self.status,
            Json(ErrorResponse {
                code: self.code,
                detail: self.message,
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
