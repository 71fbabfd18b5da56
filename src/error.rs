//! API error types.

use crate::domain::presign::PresignError;
use crate::ports::error::StoreError;
use crate::ports::worker::WorkerError;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Error envelope returned to callers.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub title: String,
    pub detail: String,
}

/// Reasons an inbound request fails authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing signature, timestamp or nonce header")]
    MissingHeaders,
    #[error("timestamp is not an integer")]
    InvalidTimestamp,
    #[error("timestamp outside the accepted skew")]
    TimestampSkew,
    #[error("nonce already used")]
    NonceReplay,
    #[error("signature mismatch")]
    InvalidSignature,
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingHeaders => "MISSING_HMAC_HEADERS",
            Self::InvalidTimestamp => "INVALID_TIMESTAMP",
            Self::TimestampSkew => "TIMESTAMP_SKEW",
            Self::NonceReplay => "NONCE_REPLAY",
            Self::InvalidSignature => "INVALID_SIGNATURE",
        }
    }
}

/// Why a request was throttled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitReason {
    RateLimited,
    RenderConcurrency,
    Concurrency,
}

impl LimitReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::RateLimited => "RATE_LIMITED",
            Self::RenderConcurrency => "RENDER_CONCURRENCY_LIMIT",
            Self::Concurrency => "CONCURRENCY_LIMIT",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("unauthorized: {0}")]
    Auth(#[from] AuthError),

    #[error("too many requests: {}", reason.code())]
    Limited {
        reason: LimitReason,
        retry_after_secs: Option<u64>,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage not configured")]
    StorageNotConfigured,

    #[error("worker not configured")]
    WorkerNotConfigured,

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn limited(reason: LimitReason) -> Self {
        Self::Limited {
            reason,
            retry_after_secs: None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Limited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::StorageNotConfigured
            | Self::WorkerNotConfigured
            | Self::Upstream(_)
            | Self::Internal(_)
            | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Envelope sent to the caller. Internal detail stays in the logs.
    pub fn body(&self) -> ErrorBody {
        let (title, detail) = match self {
            Self::Validation(msg) => ("Invalid input", msg.clone()),
            Self::Auth(e) => ("Unauthorized", e.code().to_string()),
            Self::Limited { reason, .. } => ("Too Many Requests", reason.code().to_string()),
            Self::NotFound(what) => ("Not found", what.clone()),
            Self::StorageNotConfigured => ("Storage not configured", String::from("STORAGE_NOT_CONFIGURED")),
            Self::WorkerNotConfigured => ("Worker not configured", String::from("WORKER_NOT_CONFIGURED")),
            Self::Upstream(_) => ("Upstream error", String::from("UPSTREAM_FAILURE")),
            Self::Internal(_) | Self::Store(_) => ("Server error", String::from("INTERNAL")),
        };
        ErrorBody {
            title: title.to_string(),
            detail,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retry_after = match &self {
            Self::Limited {
                retry_after_secs: Some(secs),
                ..
            } => HeaderValue::from_str(&secs.to_string()).ok(),
            _ => None,
        };

        let mut response = (status, Json(self.body())).into_response();
        if let Some(value) = retry_after {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        response
    }
}

impl From<WorkerError> for ApiError {
    fn from(err: WorkerError) -> Self {
        Self::Upstream(err.to_string())
    }
}

impl From<PresignError> for ApiError {
    fn from(err: PresignError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
