use super::error::StoreError;
use crate::domain::jobs::{Download, RenderJob};
use async_trait::async_trait;

/// Result of the finalize-once transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Finalized {
    /// Downloads persisted on the job after the call
    pub downloads: Vec<Download>,
    /// True for exactly one caller per job
    pub first: bool,
}

/// Outcome of a write that a finished job refuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// Job is finalized or pinned to `error`; nothing was written
    Terminal,
    Missing,
}

#[async_trait]
pub trait RenderJobRepository: Send + Sync {
    /// Persist a freshly created job
    async fn insert(&self, job: &RenderJob) -> Result<(), StoreError>;

    /// Load a job with its downloads and failure pin merged in
    async fn get(&self, id: &str) -> Result<Option<RenderJob>, StoreError>;

    /// Atomically mark the job finalized and attach `downloads` unless some
    /// are already present. `None` if the job does not exist.
    async fn finalize(
        &self,
        id: &str,
        downloads: &[Download],
    ) -> Result<Option<Finalized>, StoreError>;

    /// Overwrite downloads with worker-provided ones while the job is still
    /// open. Check and write are one atomic step.
    async fn replace_downloads(
        &self,
        id: &str,
        downloads: &[Download],
    ) -> Result<Transition, StoreError>;

    /// Pin the job to `error`. Only the first pin on an unfinalized job is
    /// `Applied`.
    async fn mark_failed(&self, id: &str) -> Result<Transition, StoreError>;
}
