use crate::domain::jobs::RenderOutput;
use async_trait::async_trait;
use serde_json::Value;

/// Render request forwarded to the external worker.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub job_id: String,
    pub asset_id: String,
    pub track_url: String,
    pub preset_ids: Vec<String>,
    pub metadata: Option<Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("worker unreachable: {0}")]
    Transport(String),
    #[error("worker responded {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid worker response: {0}")]
    InvalidResponse(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RenderWorkerPort: Send + Sync {
    /// Ask the worker to fetch and proxy a source upload
    async fn ingest(
        &self,
        asset_id: &str,
        source_url: &str,
        md5: Option<String>,
    ) -> Result<Value, WorkerError>;

    /// Run highlight detection over a proxy video
    async fn highlights(&self, asset_id: &str, proxy_url: &str) -> Result<Value, WorkerError>;

    /// Request a render; returns per-preset output URLs when the worker knows them
    async fn render(&self, request: RenderRequest) -> Result<Vec<RenderOutput>, WorkerError>;
}
