//! HTTP client for the external render/analysis worker.

use crate::config::WorkerConfig;
use crate::domain::jobs::RenderOutput;
use crate::ports::worker::{RenderRequest, RenderWorkerPort, WorkerError};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IngestBody<'a> {
    asset_id: &'a str,
    source_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    md5: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HighlightsBody<'a> {
    asset_id: &'a str,
    proxy_url: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PresetRef<'a> {
    preset_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderBody<'a> {
    job_id: &'a str,
    asset_id: &'a str,
    track_url: &'a str,
    presets: Vec<PresetRef<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a Value>,
}

#[derive(Deserialize)]
struct RenderResponse {
    #[serde(default)]
    outputs: Vec<RenderOutput>,
}

/// Worker reached with a bearer token.
pub struct HttpRenderWorker {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpRenderWorker {
    pub fn new(config: &WorkerConfig) -> Result<Self, WorkerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| WorkerError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, WorkerError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Calling worker");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| WorkerError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WorkerError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<R>()
            .await
            .map_err(|e| WorkerError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl RenderWorkerPort for HttpRenderWorker {
    async fn ingest(
        &self,
        asset_id: &str,
        source_url: &str,
        md5: Option<String>,
    ) -> Result<Value, WorkerError> {
        let body = IngestBody {
            asset_id,
            source_url,
            md5,
        };
        self.post("/ingest", &body).await
    }

    async fn highlights(&self, asset_id: &str, proxy_url: &str) -> Result<Value, WorkerError> {
        let body = HighlightsBody {
            asset_id,
            proxy_url,
        };
        self.post("/highlights", &body).await
    }

    async fn render(&self, request: RenderRequest) -> Result<Vec<RenderOutput>, WorkerError> {
        let body = RenderBody {
            job_id: &request.job_id,
            asset_id: &request.asset_id,
            track_url: &request.track_url,
            presets: request
                .preset_ids
                .iter()
                .map(|id| PresetRef {
                    preset_id: id.as_str(),
                })
                .collect(),
            metadata: request.metadata.as_ref(),
        };
        let response: RenderResponse = self.post("/render", &body).await?;
        Ok(response.outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn worker(server: &MockServer) -> HttpRenderWorker {
        HttpRenderWorker::new(&WorkerConfig {
            base_url: format!("{}/", server.uri()),
            token: "tok".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_ingest_passes_response_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ingest"))
            .and(header("authorization", "Bearer tok"))
            .and(body_json(json!({"assetId": "a1", "sourceUrl": "https://s/a1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"proxyUrl": "p"})))
            .mount(&server)
            .await;

        let value = worker(&server)
            .ingest("a1", "https://s/a1", None)
            .await
            .unwrap();
        assert_eq!(value, json!({"proxyUrl": "p"}));
    }

    #[tokio::test]
    async fn test_render_sends_presets_and_parses_outputs() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/render"))
            .and(body_json(json!({
                "jobId": "job_1",
                "assetId": "a1",
                "trackUrl": "t1",
                "presets": [{"presetId": "p1"}, {"presetId": "p2"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "outputs": [{"presetId": "p1", "url": "https://cdn/p1.mp4"}]
            })))
            .mount(&server)
            .await;

        let outputs = worker(&server)
            .render(RenderRequest {
                job_id: "job_1".to_string(),
                asset_id: "a1".to_string(),
                track_url: "t1".to_string(),
                preset_ids: vec!["p1".to_string(), "p2".to_string()],
                metadata: None,
            })
            .await
            .unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].url, "https://cdn/p1.mp4");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/highlights"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let err = worker(&server).highlights("a1", "p").await.unwrap_err();
        match err {
            WorkerError::Status { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "unauthorized");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unparsable_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/render"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = worker(&server)
            .render(RenderRequest {
                job_id: "j".to_string(),
                asset_id: "a".to_string(),
                track_url: String::new(),
                preset_ids: vec![],
                metadata: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::InvalidResponse(_)));
    }
}
