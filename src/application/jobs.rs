//! Render job lifecycle: creation, time-derived status, finalize-once.

use crate::clock::Clock;
use crate::domain::jobs::{Download, JobSpec, JobStatus, Projection, RenderJob, RenderOutput};
use crate::error::{ApiError, ApiResult};
use crate::ports::repository::{Finalized, RenderJobRepository, Transition};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone)]
pub struct JobSettings {
    /// Bounds of the simulated render duration
    pub min_duration_ms: u64,
    pub max_duration_ms: u64,
    pub exports_base_url: String,
    pub download_ttl: Duration,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            min_duration_ms: 4_000,
            max_duration_ms: 12_000,
            exports_base_url: String::from("https://example.com/exports"),
            download_ttl: Duration::hours(24),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobStatusReport {
    pub job: RenderJob,
    pub projection: Projection,
    /// Present once the job is done
    pub downloads: Option<Vec<Download>>,
    /// True only for the poll that ran finalization
    pub just_finalized: bool,
}

pub struct JobService {
    repo: Arc<dyn RenderJobRepository>,
    clock: Arc<dyn Clock>,
    settings: JobSettings,
}

impl JobService {
    pub fn new(
        repo: Arc<dyn RenderJobRepository>,
        clock: Arc<dyn Clock>,
        settings: JobSettings,
    ) -> Self {
        Self {
            repo,
            clock,
            settings,
        }
    }

    /// Allocate an id without persisting anything.
    pub fn next_id(&self) -> String {
        RenderJob::next_id(self.clock.now_ms())
    }

    pub async fn create(&self, spec: JobSpec) -> ApiResult<RenderJob> {
        self.create_with_id(self.next_id(), spec).await
    }

    pub async fn create_with_id(&self, id: String, spec: JobSpec) -> ApiResult<RenderJob> {
        let (min, max) = (
            self.settings.min_duration_ms,
            self.settings.max_duration_ms.max(self.settings.min_duration_ms),
        );
        let duration_ms = rand::thread_rng().gen_range(min..=max);
        let job = RenderJob::new(id, spec, self.clock.now_ms(), duration_ms);
        self.repo.insert(&job).await?;
        info!(job_id = %job.id, duration_ms, presets = job.presets.len(), "Created render job");
        Ok(job)
    }

    pub async fn get(&self, id: &str) -> ApiResult<RenderJob> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("job {}", id)))
    }

    /// Project the job at the current instant, finalizing it the first time
    /// it is observed done.
    pub async fn status(&self, id: &str) -> ApiResult<JobStatusReport> {
        let job = self.get(id).await?;
        let projection = job.project(self.clock.now_ms());

        let (downloads, just_finalized) = match projection.status {
            JobStatus::Done if job.finalized => (job.downloads.clone(), false),
            JobStatus::Done => {
                let finalized = self.finalize_once(&job).await?;
                (Some(finalized.downloads), finalized.first)
            }
            _ => (None, false),
        };

        Ok(JobStatusReport {
            job,
            projection,
            downloads,
            just_finalized,
        })
    }

    /// Downloads for a job. Before completion this is a preview at the
    /// conventional export location and nothing is persisted.
    pub async fn export(&self, id: &str) -> ApiResult<(Vec<Download>, JobStatusReport)> {
        let report = self.status(id).await?;
        let downloads = match (&report.downloads, &report.job.downloads) {
            (Some(done), _) => done.clone(),
            (None, Some(provided)) => provided.clone(),
            (None, None) => report
                .job
                .synthesize_downloads(&self.settings.exports_base_url, self.expires_at()),
        };
        Ok((downloads, report))
    }

    /// Record real output URLs reported by the worker. Returns false when the
    /// job is already finalized or failed and its downloads are frozen.
    pub async fn set_downloads(&self, id: &str, outputs: Vec<RenderOutput>) -> ApiResult<bool> {
        let expires_at = self.expires_at();
        let downloads: Vec<Download> = outputs
            .into_iter()
            .map(|output| output.into_download(expires_at))
            .collect();
        match self.repo.replace_downloads(id, &downloads).await? {
            Transition::Applied => {
                info!(job_id = %id, count = downloads.len(), "Recorded worker downloads");
                Ok(true)
            }
            Transition::Terminal => {
                info!(job_id = %id, "Ignoring worker downloads for finished job");
                Ok(false)
            }
            Transition::Missing => Err(ApiError::NotFound(format!("job {}", id))),
        }
    }

    /// Pin the job to `error`. Returns the job and whether this call pinned it.
    /// A job that has already reached `done` is left untouched.
    pub async fn fail(&self, id: &str) -> ApiResult<(RenderJob, bool)> {
        let job = self.get(id).await?;
        if job.project(self.clock.now_ms()).status == JobStatus::Done {
            info!(job_id = %id, "Ignoring failure for completed job");
            return Ok((job, false));
        }
        match self.repo.mark_failed(id).await? {
            Transition::Applied => {
                info!(job_id = %id, "Render job failed");
                Ok((job, true))
            }
            Transition::Terminal => Ok((job, false)),
            Transition::Missing => Err(ApiError::NotFound(format!("job {}", id))),
        }
    }

    async fn finalize_once(&self, job: &RenderJob) -> ApiResult<Finalized> {
        let synthesized =
            job.synthesize_downloads(&self.settings.exports_base_url, self.expires_at());
        let finalized = self
            .repo
            .finalize(&job.id, &synthesized)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("job {}", job.id)))?;
        if finalized.first {
            info!(job_id = %job.id, count = finalized.downloads.len(), "Finalized render job");
        }
        Ok(finalized)
    }

    fn expires_at(&self) -> DateTime<Utc> {
        self.clock.now() + self.settings.download_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryJobRepository;
    use crate::clock::ManualClock;
    use crate::domain::jobs::format_timestamp;

    fn service() -> (Arc<ManualClock>, JobService) {
        let clock = Arc::new(ManualClock::at_millis(1_700_000_000_000));
        let settings = JobSettings {
            exports_base_url: "https://cdn.example/exports".to_string(),
            ..Default::default()
        };
        let service = JobService::new(Arc::new(MemoryJobRepository::new()), clock.clone(), settings);
        (clock, service)
    }

    fn spec(presets: &[&str]) -> JobSpec {
        JobSpec {
            asset_id: Some("a1".to_string()),
            preset_ids: presets.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_queued_then_done_with_stable_downloads() {
        let (clock, service) = service();
        let job = service.create(spec(&["p1", "p2"])).await.unwrap();
        assert!((4_000..=12_000).contains(&job.duration_ms));

        let fresh = service.status(&job.id).await.unwrap();
        assert_eq!(fresh.projection.status, JobStatus::Queued);
        assert_eq!(fresh.projection.progress, 0);
        assert!(fresh.downloads.is_none());

        clock.advance(Duration::milliseconds(job.duration_ms as i64));
        let expected_expiry = format_timestamp(clock.now() + Duration::hours(24));
        let done = service.status(&job.id).await.unwrap();
        assert_eq!(done.projection.status, JobStatus::Done);
        assert_eq!(done.projection.progress, 100);
        assert!(done.just_finalized);
        let downloads = done.downloads.unwrap();
        assert_eq!(downloads.len(), 2);
        assert_eq!(downloads[0].url, "https://cdn.example/exports/a1-p1.mp4");
        assert_eq!(downloads[0].expires_at, expected_expiry);

        clock.advance(Duration::minutes(5));
        let again = service.status(&job.id).await.unwrap();
        assert!(!again.just_finalized);
        assert_eq!(again.downloads.unwrap(), downloads);
    }

    #[tokio::test]
    async fn test_progress_never_decreases_while_polling() {
        let (clock, service) = service();
        let job = service.create(spec(&["p1"])).await.unwrap();
        let mut last = 0;
        for _ in 0..30 {
            let report = service.status(&job.id).await.unwrap();
            assert!(report.projection.progress >= last);
            last = report.projection.progress;
            clock.advance(Duration::milliseconds(500));
        }
        assert_eq!(last, 100);
    }

    #[tokio::test]
    async fn test_worker_outputs_survive_finalization() {
        let (clock, service) = service();
        let job = service.create(spec(&["p1"])).await.unwrap();
        service
            .set_downloads(
                &job.id,
                vec![RenderOutput {
                    preset_id: "p1".to_string(),
                    url: "https://worker/p1.mp4".to_string(),
                }],
            )
            .await
            .unwrap();

        clock.advance(Duration::seconds(13));
        let done = service.status(&job.id).await.unwrap();
        assert!(done.just_finalized);
        assert_eq!(done.downloads.unwrap()[0].url, "https://worker/p1.mp4");
    }

    #[tokio::test]
    async fn test_export_before_done_is_an_unpersisted_preview() {
        let (clock, service) = service();
        let job = service.create(spec(&["p1"])).await.unwrap();

        let (preview, report) = service.export(&job.id).await.unwrap();
        assert_eq!(preview[0].url, "https://cdn.example/exports/a1-p1.mp4");
        assert!(!report.job.finalized);
        assert!(service.get(&job.id).await.unwrap().downloads.is_none());

        clock.advance(Duration::seconds(13));
        let (downloads, report) = service.export(&job.id).await.unwrap();
        assert!(report.just_finalized);
        assert_eq!(downloads.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_job_stays_failed() {
        let (clock, service) = service();
        let job = service.create(spec(&["p1"])).await.unwrap();
        let (_, first) = service.fail(&job.id).await.unwrap();
        assert!(first);
        let (_, second) = service.fail(&job.id).await.unwrap();
        assert!(!second);

        clock.advance(Duration::seconds(60));
        let report = service.status(&job.id).await.unwrap();
        assert_eq!(report.projection.status, JobStatus::Error);
        assert!(report.downloads.is_none());
    }

    #[tokio::test]
    async fn test_done_job_is_immutable() {
        let (clock, service) = service();
        let job = service.create(spec(&["p1"])).await.unwrap();
        clock.advance(Duration::seconds(13));
        let done = service.status(&job.id).await.unwrap();
        let downloads = done.downloads.unwrap();

        let late = vec![RenderOutput {
            preset_id: "p1".to_string(),
            url: "https://late/p1.mp4".to_string(),
        }];
        assert!(!service.set_downloads(&job.id, late).await.unwrap());
        let (_, pinned) = service.fail(&job.id).await.unwrap();
        assert!(!pinned);

        let again = service.status(&job.id).await.unwrap();
        assert_eq!(again.projection.status, JobStatus::Done);
        assert_eq!(again.downloads.unwrap(), downloads);
    }

    #[tokio::test]
    async fn test_failure_after_duration_elapsed_is_ignored() {
        let (clock, service) = service();
        let job = service.create(spec(&["p1"])).await.unwrap();
        // Elapsed but not yet polled, so nothing is finalized.
        clock.advance(Duration::seconds(13));
        let (_, pinned) = service.fail(&job.id).await.unwrap();
        assert!(!pinned);
        assert_eq!(
            service.status(&job.id).await.unwrap().projection.status,
            JobStatus::Done
        );
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let (_clock, service) = service();
        assert!(matches!(
            service.status("job_missing").await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            service.set_downloads("job_missing", vec![]).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            service.fail("job_missing").await,
            Err(ApiError::NotFound(_))
        ));
    }
}
