use crate::domain::presign::{PresignError, PresignMethod};
use async_trait::async_trait;
use serde::Serialize;

/// Outcome of a single object deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub key: String,
    pub ok: bool,
    /// HTTP status from storage, 0 when the request never completed
    pub status: u16,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStoragePort: Send + Sync {
    /// Presigned URL allowing `method` on `key` for `expires_secs`
    fn presign(
        &self,
        method: PresignMethod,
        key: &str,
        expires_secs: u64,
    ) -> Result<String, PresignError>;

    /// Delete an object through a short-lived presigned URL.
    async fn delete(&self, key: &str) -> Result<DeleteOutcome, PresignError>;
}
