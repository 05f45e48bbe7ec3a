use std::{io, path::PathBuf};

use serde::Serialize;

/// Stable, machine-readable identifier for every failure the service reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCode {
    UnsupportedMediaType,
    InvalidParameter,
    StorageWriteError,
    StorageReadError,
    ImageDecodeError,
    TransformError,
    EngineUnavailable,
    PayloadTooLarge,
    InternalError,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    UnsupportedMediaType(String),

    #[error("{0}")]
    InvalidParameter(String),

    #[error("Failed to store upload: {0}")]
    StorageWrite(#[source] io::Error),

    #[error("Failed to read {}: {source}", path.display())]
    StorageRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    ImageDecode(String),

    #[error("{0}")]
    Transform(String),

    #[error("{0}")]
    EngineUnavailable(String),

    /// Failures the caller cannot act on; the detail stays generic.
    #[error("{0}")]
    Internal(String),
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::UnsupportedMediaType(_) => ErrorCode::UnsupportedMediaType,
            Error::InvalidParameter(_) => ErrorCode::InvalidParameter,
            Error::StorageWrite(_) => ErrorCode::StorageWriteError,
            Error::StorageRead { .. } => ErrorCode::StorageReadError,
            Error::ImageDecode(_) => ErrorCode::ImageDecodeError,
            Error::Transform(_) => ErrorCode::TransformError,
            Error::EngineUnavailable(_) => ErrorCode::EngineUnavailable,
            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidParameter(message.into())
    }

    pub fn transform(message: impl Into<String>) -> Self {
        Error::Transform(message.into())
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::StorageRead {
            path: path.into(),
            source,
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Transform(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        tracing::error!(panic = err.is_panic(), "worker task failed: {err}");
        Error::Internal("Internal worker failure".to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
