//! Request and response bodies of the studio operations.

use crate::domain::catalog::{HighlightSegment, Track};
use crate::domain::jobs::{Download, JobStatus, PresetProgress, RenderOutput};
use crate::ports::storage::DeleteOutcome;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUploadUrlRequest {
    pub file_name: Option<String>,
    pub size: Option<u64>,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUploadUrlResponse {
    pub asset_id: String,
    pub upload_url: String,
    pub key: String,
    /// Advisory; the URL does not sign the header
    pub content_type: String,
    pub expires_in: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestAssetRequest {
    pub asset_id: Option<String>,
    pub key: Option<String>,
    pub md5: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectHighlightsRequest {
    pub asset_id: Option<String>,
    pub video_url: Option<String>,
    pub proxy_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoHighlightsResponse {
    pub segments: Vec<HighlightSegment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    pub thumbnails: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectBeatsRequest {
    pub asset_id: Option<String>,
    pub track_id: Option<String>,
    pub track_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectBeatsResponse {
    pub bpm: u32,
    pub beat_grid: Vec<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendMusicRequest {
    pub asset_id: Option<String>,
    pub play_style: Option<String>,
    pub target_length: Option<f64>,
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecommendMusicResponse {
    pub tracks: Vec<Track>,
}

/// A preset given either as a bare id or as `{ "presetId": .. }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PresetSelection {
    Id(String),
    #[serde(rename_all = "camelCase")]
    Object { preset_id: String },
}

impl PresetSelection {
    pub fn into_id(self) -> String {
        match self {
            Self::Id(id) | Self::Object { preset_id: id } => id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRenderJobRequest {
    pub asset_id: Option<String>,
    pub track_id: Option<String>,
    #[serde(default)]
    pub presets: Vec<PresetSelection>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRenderJobResponse {
    pub job_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusRequest {
    pub job_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusPayload {
    pub downloads: Vec<Download>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<u64>,
    pub presets: Vec<PresetProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<StatusPayload>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeExportRequest {
    pub render_job_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FinalizeExportResponse {
    pub downloads: Vec<Download>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAssetRequest {
    pub asset_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteAssetResponse {
    pub deleted: Vec<DeleteOutcome>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteExportRequest {
    pub asset_id: Option<String>,
    pub preset_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteExportResponse {
    pub deleted: bool,
    pub key: String,
    pub status: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackStatus {
    Done,
    Error,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerCallbackRequest {
    pub job_id: Option<String>,
    pub status: Option<CallbackStatus>,
    pub outputs: Option<Vec<RenderOutput>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerCallbackResponse {
    pub ok: bool,
    pub job_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionPolicyResponse {
    pub ok: bool,
    pub note: &'static str,
    pub retention_days: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_accept_ids_and_objects() {
        let req: StartRenderJobRequest = serde_json::from_str(
            r#"{"presets": ["p1", {"presetId": "p2"}], "assetId": "a1"}"#,
        )
        .unwrap();
        let ids: Vec<String> = req.presets.into_iter().map(PresetSelection::into_id).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
    }

    #[test]
    fn test_status_response_omits_eta_when_done() {
        let body = serde_json::to_value(JobStatusResponse {
            job_id: "j".to_string(),
            status: JobStatus::Done,
            progress: 100,
            eta: None,
            presets: vec![],
            payload: Some(StatusPayload { downloads: vec![] }),
        })
        .unwrap();
        assert_eq!(body["status"], "done");
        assert!(body.get("eta").is_none());
        assert!(body["payload"]["downloads"].is_array());
    }
}
