//! Error types shared by the monitor core and the HTTP layer

use axum::response::{IntoResponse, Response};
use std::path::PathBuf;

use crate::api::response::ApiResponse;

/// Rejection of a malformed `host:port` pair or player entry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    #[error("ip_port is empty")]
    Empty,
    #[error("ip_port '{0}' must be host:port with exactly one ':'")]
    MissingSeparator(String),
    #[error("ip_port '{0}' has an empty host")]
    EmptyHost(String),
    #[error("ip_port '{0}' has an invalid port (expected 1-65535)")]
    InvalidPort(String),
}

/// Failures of the persisted player list
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to persist {path} ({operation}): {source}")]
    Persist {
        path: PathBuf,
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode player document: {0}")]
    Encode(#[source] serde_yaml::Error),

    #[error("store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid endpoint: {0}")]
    Endpoint(#[from] EndpointError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl AppError {
    /// Stable machine-readable code carried in the error envelope
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Endpoint(_) => "VALIDATION_ERROR",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Store(StoreError::Parse { .. }) => "CONFIG_PARSE_ERROR",
            AppError::Store(_) => "PERSISTENCE_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Store(_) => {
                tracing::error!(error = %self, "request failed");
            }
            _ => tracing::debug!(error = %self, "request rejected"),
        }
        ApiResponse::error(self.code(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::NotFound("x".into()).code(), "NOT_FOUND");
        assert_eq!(
            AppError::from(EndpointError::Empty).code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(AppError::Conflict("x".into()).code(), "CONFLICT");
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (AppError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (
                AppError::from(EndpointError::MissingSeparator("bad".into())),
                StatusCode::BAD_REQUEST,
            ),
            (AppError::Conflict("dup".into()), StatusCode::CONFLICT),
            (
                AppError::from(StoreError::Persist {
                    path: PathBuf::from("players.yml"),
                    operation: "rename temporary file",
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
