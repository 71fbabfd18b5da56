//! In-process RenderJobRepository.

use crate::domain::jobs::{Download, JobStatus, RenderJob};
use crate::ports::error::StoreError;
use crate::ports::repository::{Finalized, RenderJobRepository, Transition};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Jobs are never evicted; the map grows with every render.
#[derive(Default)]
pub struct MemoryJobRepository {
    jobs: Mutex<HashMap<String, RenderJob>>,
}

impl MemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn is_closed(job: &RenderJob) -> bool {
    job.finalized || job.status == JobStatus::Error
}

#[async_trait]
impl RenderJobRepository for MemoryJobRepository {
    async fn insert(&self, job: &RenderJob) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock().await;
        jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<RenderJob>, StoreError> {
        let jobs = self.jobs.lock().await;
        Ok(jobs.get(id).cloned())
    }

    async fn finalize(
        &self,
        id: &str,
        downloads: &[Download],
    ) -> Result<Option<Finalized>, StoreError> {
        let mut jobs = self.jobs.lock().await;
        let Some(job) = jobs.get_mut(id) else {
            return Ok(None);
        };
        let first = !job.finalized;
        job.finalized = true;
        let stored = job.downloads.get_or_insert_with(|| downloads.to_vec());
        Ok(Some(Finalized {
            downloads: stored.clone(),
            first,
        }))
    }

    async fn replace_downloads(
        &self,
        id: &str,
        downloads: &[Download],
    ) -> Result<Transition, StoreError> {
        let mut jobs = self.jobs.lock().await;
        let Some(job) = jobs.get_mut(id) else {
            return Ok(Transition::Missing);
        };
        if is_closed(job) {
            return Ok(Transition::Terminal);
        }
        job.downloads = Some(downloads.to_vec());
        Ok(Transition::Applied)
    }

    async fn mark_failed(&self, id: &str) -> Result<Transition, StoreError> {
        let mut jobs = self.jobs.lock().await;
        let Some(job) = jobs.get_mut(id) else {
            return Ok(Transition::Missing);
        };
        if is_closed(job) {
            return Ok(Transition::Terminal);
        }
        job.status = JobStatus::Error;
        Ok(Transition::Applied)
    }
}
