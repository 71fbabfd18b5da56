use super::caller::CallerKey;
use super::state::AppState;
use crate::application::dto::*;
use crate::error::{ApiError, ApiResult};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: &'static str,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        backend: state.backend,
    })
}

/// Log a failed operation with its name and caller, then pass it on.
fn logged<T>(op: &'static str, caller: &str, result: ApiResult<T>) -> ApiResult<T> {
    if let Err(e) = &result {
        if e.status_code().is_server_error() {
            error!(op, caller, error = %e, "Operation failed");
        } else {
            info!(op, caller, detail = %e.body().detail, "Operation rejected");
        }
    }
    result
}

pub async fn create_upload_url(
    State(state): State<AppState>,
    CallerKey(caller): CallerKey,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<CreateUploadUrlResponse>> {
    const OP: &str = "createUploadUrl";
    let result = async {
        let req = state.pipeline.admit(OP, &caller, &headers, &body).await?;
        Ok::<_, ApiError>(Json(state.studio.create_upload_url(req).await?))
    }
    .await;
    logged(OP, &caller, result)
}

pub async fn ingest_asset(
    State(state): State<AppState>,
    CallerKey(caller): CallerKey,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    const OP: &str = "ingestAsset";
    let result = async {
        let req = state.pipeline.admit(OP, &caller, &headers, &body).await?;
        Ok::<_, ApiError>(Json(state.studio.ingest_asset(&caller, req).await?))
    }
    .await;
    logged(OP, &caller, result)
}

pub async fn detect_highlights(
    State(state): State<AppState>,
    CallerKey(caller): CallerKey,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    const OP: &str = "detectHighlights";
    let result = async {
        let req = state.pipeline.admit(OP, &caller, &headers, &body).await?;
        Ok::<_, ApiError>(Json(state.studio.detect_highlights(req).await?))
    }
    .await;
    logged(OP, &caller, result)
}

pub async fn detect_beats(
    State(state): State<AppState>,
    CallerKey(caller): CallerKey,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<DetectBeatsResponse>> {
    const OP: &str = "detectBeats";
    let result = async {
        let req = state.pipeline.admit(OP, &caller, &headers, &body).await?;
        Ok::<_, ApiError>(Json(state.studio.detect_beats(req)))
    }
    .await;
    logged(OP, &caller, result)
}

pub async fn recommend_music(
    State(state): State<AppState>,
    CallerKey(caller): CallerKey,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<RecommendMusicResponse>> {
    const OP: &str = "recommendMusic";
    let result = async {
        let req = state.pipeline.admit(OP, &caller, &headers, &body).await?;
        Ok::<_, ApiError>(Json(state.studio.recommend_music(req)))
    }
    .await;
    logged(OP, &caller, result)
}

pub async fn start_render_job(
    State(state): State<AppState>,
    CallerKey(caller): CallerKey,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<StartRenderJobResponse>> {
    const OP: &str = "startRenderJob";
    let result = async {
        let req = state.pipeline.admit(OP, &caller, &headers, &body).await?;
        Ok::<_, ApiError>(Json(state.studio.start_render_job(&caller, req).await?))
    }
    .await;
    logged(OP, &caller, result)
}

pub async fn get_job_status(
    State(state): State<AppState>,
    CallerKey(caller): CallerKey,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<JobStatusResponse>> {
    const OP: &str = "getJobStatus";
    let result = async {
        let req = state.pipeline.admit(OP, &caller, &headers, &body).await?;
        Ok::<_, ApiError>(Json(state.studio.get_job_status(req).await?))
    }
    .await;
    logged(OP, &caller, result)
}

pub async fn finalize_export(
    State(state): State<AppState>,
    CallerKey(caller): CallerKey,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<FinalizeExportResponse>> {
    const OP: &str = "finalizeExport";
    let result = async {
        let req = state.pipeline.admit(OP, &caller, &headers, &body).await?;
        Ok::<_, ApiError>(Json(state.studio.finalize_export(req).await?))
    }
    .await;
    logged(OP, &caller, result)
}

pub async fn delete_asset(
    State(state): State<AppState>,
    CallerKey(caller): CallerKey,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<DeleteAssetResponse>> {
    const OP: &str = "deleteAsset";
    let result = async {
        let req = state.pipeline.admit(OP, &caller, &headers, &body).await?;
        Ok::<_, ApiError>(Json(state.studio.delete_asset(req).await?))
    }
    .await;
    logged(OP, &caller, result)
}

pub async fn delete_export(
    State(state): State<AppState>,
    CallerKey(caller): CallerKey,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<DeleteExportResponse>> {
    const OP: &str = "deleteExport";
    let result = async {
        let req = state.pipeline.admit(OP, &caller, &headers, &body).await?;
        Ok::<_, ApiError>(Json(state.studio.delete_export(req).await?))
    }
    .await;
    logged(OP, &caller, result)
}

pub async fn worker_callback(
    State(state): State<AppState>,
    CallerKey(caller): CallerKey,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WorkerCallbackResponse>> {
    const OP: &str = "workerCallback";
    let result = async {
        let req = state.pipeline.admit(OP, &caller, &headers, &body).await?;
        Ok::<_, ApiError>(Json(state.studio.worker_callback(req).await?))
    }
    .await;
    logged(OP, &caller, result)
}

pub async fn retention_policy(
    State(state): State<AppState>,
    CallerKey(caller): CallerKey,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<RetentionPolicyResponse>> {
    const OP: &str = "retentionPolicy";
    let result = async {
        let _: Value = state.pipeline.admit(OP, &caller, &headers, &body).await?;
        Ok::<_, ApiError>(Json(state.studio.retention_policy()))
    }
    .await;
    logged(OP, &caller, result)
}
