//! Object storage reached only through presigned URLs.

use crate::clock::Clock;
use crate::config::StorageConfig;
use crate::domain::presign::{self, PresignError, PresignMethod, PresignRequest};
use crate::ports::storage::{DeleteOutcome, ObjectStoragePort};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use tracing::warn;

/// Expiry of the URL used for our own DELETE calls.
const DELETE_URL_TTL_SECS: u64 = 300;

pub struct S3ObjectStorage {
    config: StorageConfig,
    client: Client,
    clock: Arc<dyn Clock>,
}

impl S3ObjectStorage {
    pub fn new(config: StorageConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            client: Client::new(),
            clock,
        }
    }

    fn request(&self, method: PresignMethod, key: &str, expires_secs: u64) -> PresignRequest {
        PresignRequest {
            method,
            bucket: self.config.bucket.clone(),
            key: key.to_string(),
            region: self.config.region.clone(),
            access_key_id: self.config.access_key_id.clone(),
            secret_access_key: self.config.secret_access_key.clone(),
            endpoint: Some(self.config.endpoint.clone()),
            expires_secs,
        }
    }
}

#[async_trait]
impl ObjectStoragePort for S3ObjectStorage {
    fn presign(
        &self,
        method: PresignMethod,
        key: &str,
        expires_secs: u64,
    ) -> Result<String, PresignError> {
        presign::presign(&self.request(method, key, expires_secs), self.clock.now())
    }

    async fn delete(&self, key: &str) -> Result<DeleteOutcome, PresignError> {
        let url = self.presign(PresignMethod::Delete, key, DELETE_URL_TTL_SECS)?;
        let outcome = match self.client.delete(&url).send().await {
            Ok(response) => DeleteOutcome {
                key: key.to_string(),
                ok: response.status().is_success(),
                status: response.status().as_u16(),
            },
            Err(e) => {
                warn!(key = %key, error = %e, "Storage delete failed");
                DeleteOutcome {
                    key: key.to_string(),
                    ok: false,
                    status: 0,
                }
            }
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn storage(endpoint: String) -> S3ObjectStorage {
        S3ObjectStorage::new(
            StorageConfig {
                bucket: "media".to_string(),
                region: "auto".to_string(),
                access_key_id: "AK".to_string(),
                secret_access_key: "SK".to_string(),
                endpoint,
            },
            Arc::new(ManualClock::at_millis(1_705_311_000_000)),
        )
    }

    #[tokio::test]
    async fn test_delete_sends_presigned_request() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/media/exports/a1-p1.mp4"))
            .and(query_param("X-Amz-Expires", "300"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let outcome = storage(server.uri())
            .delete("exports/a1-p1.mp4")
            .await
            .unwrap();
        assert!(outcome.ok);
        assert_eq!(outcome.status, 204);
    }

    #[tokio::test]
    async fn test_delete_reports_missing_object() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let outcome = storage(server.uri()).delete("proxy/a1.mp4").await.unwrap();
        assert!(!outcome.ok);
        assert_eq!(outcome.status, 404);
        assert_eq!(outcome.key, "proxy/a1.mp4");
    }

    #[tokio::test]
    async fn test_unreachable_storage_is_status_zero() {
        let outcome = storage("http://127.0.0.1:1".to_string())
            .delete("proxy/a1.mp4")
            .await
            .unwrap();
        assert!(!outcome.ok);
        assert_eq!(outcome.status, 0);
    }

    #[test]
    fn test_presign_uses_configured_endpoint() {
        let url = storage("http://localhost:9000".to_string())
            .presign(PresignMethod::Put, "uploads/a1/f.mp4", 900)
            .unwrap();
        assert!(url.starts_with("http://localhost:9000/media/uploads/a1/f.mp4?"));
        assert!(url.contains("X-Amz-Expires=900"));
    }
}
