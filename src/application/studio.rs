//! The studio operations exposed to clients.

use super::concurrency::ConcurrencyGuard;
use super::dto::*;
use super::jobs::JobService;
use crate::domain::catalog::{beat_grid, demo_highlights, recommend_tracks, DEFAULT_BPM};
use crate::domain::jobs::JobSpec;
use crate::domain::presign::PresignMethod;
use crate::error::{ApiError, ApiResult};
use crate::ports::storage::ObjectStoragePort;
use crate::ports::worker::{RenderRequest, RenderWorkerPort};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

const UPLOAD_SCOPES: &[&str] = &["uploads", "logos"];
const SOURCE_URL_TTL_SECS: u64 = 900;
const RETENTION_NOTE: &str =
    "Use S3/R2 lifecycle policies for retention; explicit deletions are available per asset and export.";

#[derive(Debug, Clone)]
pub struct StudioSettings {
    pub upload_url_ttl_secs: u64,
    pub retention_days: u32,
}

impl Default for StudioSettings {
    fn default() -> Self {
        Self {
            upload_url_ttl_secs: 900,
            retention_days: 7,
        }
    }
}

pub struct StudioService {
    jobs: JobService,
    render_guard: ConcurrencyGuard,
    ingest_guard: ConcurrencyGuard,
    storage: Option<Arc<dyn ObjectStoragePort>>,
    worker: Option<Arc<dyn RenderWorkerPort>>,
    settings: StudioSettings,
}

impl StudioService {
    pub fn new(
        jobs: JobService,
        render_guard: ConcurrencyGuard,
        ingest_guard: ConcurrencyGuard,
        settings: StudioSettings,
    ) -> Self {
        Self {
            jobs,
            render_guard,
            ingest_guard,
            storage: None,
            worker: None,
            settings,
        }
    }

    pub fn with_storage(mut self, storage: Arc<dyn ObjectStoragePort>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_worker(mut self, worker: Arc<dyn RenderWorkerPort>) -> Self {
        self.worker = Some(worker);
        self
    }

    fn storage(&self) -> ApiResult<&dyn ObjectStoragePort> {
        self.storage.as_deref().ok_or(ApiError::StorageNotConfigured)
    }

    fn worker(&self) -> ApiResult<&dyn RenderWorkerPort> {
        self.worker.as_deref().ok_or(ApiError::WorkerNotConfigured)
    }

    pub async fn create_upload_url(
        &self,
        req: CreateUploadUrlRequest,
    ) -> ApiResult<CreateUploadUrlResponse> {
        let file_name = required(req.file_name, "fileName, size, type required")?;
        let content_type = required(req.content_type, "fileName, size, type required")?;
        if req.size.unwrap_or(0) == 0 {
            return Err(invalid("fileName, size, type required"));
        }
        if !is_safe_segment(&file_name) {
            return Err(invalid("fileName must be a plain file name"));
        }
        let scope = req.scope.unwrap_or_else(|| UPLOAD_SCOPES[0].to_string());
        if !UPLOAD_SCOPES.contains(&scope.as_str()) {
            return Err(invalid("scope must be uploads or logos"));
        }

        let storage = self.storage()?;
        let asset_id = next_asset_id(self.jobs.next_id());
        let key = format!("{}/{}/{}", scope, asset_id, file_name);
        let upload_url = storage.presign(PresignMethod::Put, &key, self.settings.upload_url_ttl_secs)?;
        info!(asset_id = %asset_id, key = %key, "Issued upload URL");

        Ok(CreateUploadUrlResponse {
            asset_id,
            upload_url,
            key,
            content_type,
            expires_in: self.settings.upload_url_ttl_secs,
        })
    }

    pub async fn ingest_asset(&self, caller: &str, req: IngestAssetRequest) -> ApiResult<Value> {
        let asset_id = required(req.asset_id, "assetId and key required")?;
        let key = required(req.key, "assetId and key required")?;
        let storage = self.storage()?;
        let worker = self.worker()?;

        self.ingest_guard.acquire(caller, &asset_id).await?;
        let result = async {
            let source_url = storage.presign(PresignMethod::Get, &key, SOURCE_URL_TTL_SECS)?;
            Ok::<_, ApiError>(worker.ingest(&asset_id, &source_url, req.md5).await?)
        }
        .await;
        self.ingest_guard.release(caller, &asset_id).await;

        if result.is_ok() {
            info!(asset_id = %asset_id, "Ingest requested");
        }
        result
    }

    pub async fn detect_highlights(&self, req: DetectHighlightsRequest) -> ApiResult<Value> {
        let proxy_url = req.proxy_url.or(req.video_url);
        if req.asset_id.is_none() && proxy_url.is_none() {
            return Err(invalid("assetId or videoUrl required"));
        }

        if let (Some(worker), Some(url)) = (&self.worker, proxy_url.as_deref()) {
            let asset_id = req.asset_id.as_deref().unwrap_or("demo");
            return Ok(worker.highlights(asset_id, url).await?);
        }

        let demo = DemoHighlightsResponse {
            segments: demo_highlights(),
            proxy_url,
            thumbnails: vec![],
        };
        serde_json::to_value(demo).map_err(|e| ApiError::Internal(e.to_string()))
    }

    pub fn detect_beats(&self, req: DetectBeatsRequest) -> DetectBeatsResponse {
        let track = req.track_id.or(req.track_url).or(req.asset_id);
        debug!(track = ?track, bpm = DEFAULT_BPM, "Serving fixed beat grid");
        DetectBeatsResponse {
            bpm: DEFAULT_BPM,
            beat_grid: beat_grid(DEFAULT_BPM),
        }
    }

    pub fn recommend_music(&self, req: RecommendMusicRequest) -> RecommendMusicResponse {
        debug!(
            asset_id = ?req.asset_id,
            play_style = ?req.play_style,
            target_length = ?req.target_length,
            "Recommending from catalog"
        );
        RecommendMusicResponse {
            tracks: recommend_tracks(req.query.as_deref()),
        }
    }

    pub async fn start_render_job(
        &self,
        caller: &str,
        req: StartRenderJobRequest,
    ) -> ApiResult<StartRenderJobResponse> {
        let preset_ids: Vec<String> = req
            .presets
            .into_iter()
            .map(PresetSelection::into_id)
            .collect();
        if preset_ids.is_empty() || preset_ids.iter().any(|p| p.trim().is_empty()) {
            return Err(invalid("at least one preset required"));
        }

        let job_id = self.jobs.next_id();
        self.render_guard.acquire(caller, &job_id).await?;

        let spec = JobSpec {
            asset_id: req.asset_id,
            track_id: req.track_id,
            preset_ids,
            metadata: req.metadata,
            owner: Some(caller.to_string()),
        };
        let job = match self.jobs.create_with_id(job_id.clone(), spec).await {
            Ok(job) => job,
            Err(e) => {
                self.render_guard.release(caller, &job_id).await;
                return Err(e);
            }
        };

        if let (Some(worker), Some(asset_id)) = (&self.worker, &job.asset_id) {
            let request = RenderRequest {
                job_id: job.id.clone(),
                asset_id: asset_id.clone(),
                track_url: job.track_id.clone().unwrap_or_default(),
                preset_ids: job.presets.clone(),
                metadata: job.metadata.clone(),
            };
            match worker.render(request).await {
                Ok(outputs) if !outputs.is_empty() => {
                    if let Err(e) = self.jobs.set_downloads(&job.id, outputs).await {
                        warn!(job_id = %job.id, error = %e, "Could not record worker outputs");
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(job_id = %job.id, error = %e, "Worker render request failed, simulating progress");
                }
            }
        }

        Ok(StartRenderJobResponse { job_id: job.id })
    }

    pub async fn get_job_status(&self, req: JobStatusRequest) -> ApiResult<JobStatusResponse> {
        let job_id = required(req.job_id, "jobId required")?;
        let report = self.jobs.status(&job_id).await?;
        if report.just_finalized {
            self.release_render_lock(&report.job.id, report.job.owner.as_deref())
                .await;
        }

        Ok(JobStatusResponse {
            job_id,
            status: report.projection.status,
            progress: report.projection.progress,
            eta: report.projection.eta,
            presets: report.projection.presets,
            payload: report.downloads.map(|downloads| StatusPayload { downloads }),
        })
    }

    pub async fn finalize_export(
        &self,
        req: FinalizeExportRequest,
    ) -> ApiResult<FinalizeExportResponse> {
        let job_id = required(req.render_job_id, "renderJobId required")?;
        let (downloads, report) = self.jobs.export(&job_id).await?;
        if report.just_finalized {
            self.release_render_lock(&report.job.id, report.job.owner.as_deref())
                .await;
        }
        info!(job_id = %job_id, count = downloads.len(), "Finalized export");
        Ok(FinalizeExportResponse { downloads })
    }

    pub async fn delete_asset(&self, req: DeleteAssetRequest) -> ApiResult<DeleteAssetResponse> {
        let asset_id = required(req.asset_id, "assetId required")?;
        if !is_safe_segment(&asset_id) {
            return Err(invalid("assetId is malformed"));
        }
        let storage = self.storage()?;

        // Originals live under a prefix; removing them needs a listing, so
        // only the proxy is deleted here.
        let keys = [format!("proxy/{}.mp4", asset_id)];
        let mut deleted = Vec::with_capacity(keys.len());
        for key in &keys {
            deleted.push(storage.delete(key).await?);
        }
        info!(asset_id = %asset_id, "Deleted asset objects");
        Ok(DeleteAssetResponse { deleted })
    }

    pub async fn delete_export(&self, req: DeleteExportRequest) -> ApiResult<DeleteExportResponse> {
        let asset_id = required(req.asset_id, "assetId and presetId required")?;
        let preset_id = required(req.preset_id, "assetId and presetId required")?;
        if !is_safe_segment(&asset_id) || !is_safe_segment(&preset_id) {
            return Err(invalid("assetId or presetId is malformed"));
        }
        let storage = self.storage()?;

        let key = format!("exports/{}-{}.mp4", asset_id, preset_id);
        let outcome = storage.delete(&key).await?;
        match outcome.status {
            _ if outcome.ok => Ok(DeleteExportResponse {
                deleted: true,
                key: outcome.key,
                status: outcome.status,
            }),
            404 => Err(ApiError::NotFound(format!("export {}", key))),
            status => Err(ApiError::Upstream(format!(
                "storage delete of {} returned {}",
                key, status
            ))),
        }
    }

    pub async fn worker_callback(
        &self,
        req: WorkerCallbackRequest,
    ) -> ApiResult<WorkerCallbackResponse> {
        let job_id = required(req.job_id, "jobId and status required")?;
        let status = req
            .status
            .ok_or_else(|| invalid("jobId and status required"))?;

        self.jobs.get(&job_id).await?;

        // Finished jobs acknowledge the callback without changing.
        if let Some(outputs) = req.outputs.filter(|o| !o.is_empty()) {
            self.jobs.set_downloads(&job_id, outputs).await?;
        }
        if status == CallbackStatus::Error {
            let (job, first) = self.jobs.fail(&job_id).await?;
            if first {
                self.release_render_lock(&job.id, job.owner.as_deref()).await;
            }
        }

        Ok(WorkerCallbackResponse { ok: true, job_id })
    }

    pub fn retention_policy(&self) -> RetentionPolicyResponse {
        RetentionPolicyResponse {
            ok: true,
            note: RETENTION_NOTE,
            retention_days: self.settings.retention_days,
        }
    }

    async fn release_render_lock(&self, job_id: &str, owner: Option<&str>) {
        if let Some(owner) = owner {
            if self.render_guard.release(owner, job_id).await {
                info!(job_id = %job_id, caller = %owner, "Released render lock");
            }
        }
    }
}

fn invalid(detail: &str) -> ApiError {
    ApiError::Validation(detail.to_string())
}

fn required(value: Option<String>, detail: &str) -> ApiResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| invalid(detail))
}

/// A single path segment: no separators, no parent references.
fn is_safe_segment(value: &str) -> bool {
    !value.contains('/') && !value.contains('\\') && !value.contains("..")
}

/// `asset_<millis>_<hex>` reusing the entropy of a job id.
fn next_asset_id(job_id: String) -> String {
    match job_id.strip_prefix("job_") {
        Some(rest) => format!("asset_{}", rest),
        None => job_id,
    }
}
