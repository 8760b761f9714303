use axum::{http::StatusCode, response::IntoResponse};
use std::{collections::TryReserveError, io};
use thiserror::Error;

/// The buffer could not reserve room for more bytes.
#[derive(Debug, Error)]
#[error("failed to grow buffer to {requested} bytes: {source}")]
pub struct BufferError {
    pub requested: usize,
    #[source]
    pub source: TryReserveError,
}

impl From<BufferError> for io::Error {
    fn from(err: BufferError) -> Self {
        io::Error::new(io::ErrorKind::OutOfMemory, err)
    }
}

/// Failure to produce source bytes for a request. Each variant maps onto one
/// HTTP status; nothing has been written to the response when one is raised.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("page not found")]
    NotFound,
    #[error("page access forbidden")]
    Forbidden,
    #[error("internal error: {0}")]
    Internal(#[source] io::Error),
}

impl AcquireError {
    /// Classify a failed open of a page file.
    pub fn from_open(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::Forbidden,
            _ => Self::Internal(err),
        }
    }

    pub fn internal(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Internal(io::Error::new(io::ErrorKind::Other, err))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BufferError> for AcquireError {
    fn from(err: BufferError) -> Self {
        Self::Internal(err.into())
    }
}

impl IntoResponse for AcquireError {
    fn into_response(self) -> axum::response::Response {
        match &self {
            Self::Internal(err) => tracing::error!(error = %err, "content acquisition failed"),
            err => tracing::info!(error = %err, "content acquisition failed"),
        }
        self.status().into_response()
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("remote request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read unit must be greater than zero")]
    ZeroReadUnit,
    #[error("default page must be an absolute path: {0}")]
    RelativePageDefault(String),
    #[error("invalid marker pattern {pattern:?}: {source}")]
    Marker {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
}
