//! Admission checks every inbound operation passes before it runs.

use super::rate_limit::RateLimiter;
use super::signature::SignatureVerifier;
use crate::error::{ApiError, ApiResult, LimitReason};
use axum::http::HeaderMap;
use serde::de::DeserializeOwned;
use tracing::warn;

pub struct RequestPipeline {
    verifier: SignatureVerifier,
    limiter: RateLimiter,
    limit: u64,
    window_secs: u64,
}

impl RequestPipeline {
    pub fn new(
        verifier: SignatureVerifier,
        limiter: RateLimiter,
        limit: u64,
        window_secs: u64,
    ) -> Self {
        Self {
            verifier,
            limiter,
            limit,
            window_secs,
        }
    }

    /// Authenticate, decode the body, then count against the caller's window.
    /// A request rejected for its signature or a malformed body leaves the
    /// rate window untouched. Field-level checks belong to each operation and
    /// run after admission.
    pub async fn admit<T: DeserializeOwned>(
        &self,
        op: &str,
        caller: &str,
        headers: &HeaderMap,
        body: &[u8],
    ) -> ApiResult<T> {
        self.verifier.verify(headers, body).await?;
        let input = parse_body(body)?;

        let decision = self
            .limiter
            .consume(caller, self.limit, self.window_secs)
            .await;
        if !decision.allowed {
            warn!(op, caller, count = decision.count, "Rate limited");
            return Err(ApiError::Limited {
                reason: LimitReason::RateLimited,
                retry_after_secs: Some(decision.retry_after_secs),
            });
        }

        Ok(input)
    }
}

/// An empty body reads as `{}`.
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}".as_slice()
    } else {
        body
    };
    serde_json::from_slice(body).map_err(|e| ApiError::Validation(e.to_string()))
}
