use crate::adapters::backends::Backends;
use crate::adapters::s3::S3ObjectStorage;
use crate::adapters::worker::HttpRenderWorker;
use crate::application::concurrency::ConcurrencyGuard;
use crate::application::jobs::{JobService, JobSettings};
use crate::application::pipeline::RequestPipeline;
use crate::application::rate_limit::RateLimiter;
use crate::application::signature::SignatureVerifier;
use crate::application::studio::{StudioService, StudioSettings};
use crate::clock::Clock;
use crate::config::AppConfig;
use crate::ports::worker::WorkerError;
use std::sync::Arc;

/// Shared state of the HTTP adapter.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RequestPipeline>,
    pub studio: Arc<StudioService>,
    /// Name of the selected store backend
    pub backend: &'static str,
}

impl AppState {
    pub fn new(pipeline: RequestPipeline, studio: StudioService, backend: &'static str) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            studio: Arc::new(studio),
            backend,
        }
    }

    /// Wire services from configuration over already selected backends.
    pub fn build(
        config: &AppConfig,
        backends: &Backends,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, WorkerError> {
        let verifier = SignatureVerifier::new(
            config.hmac_secret.clone(),
            backends.replay.clone(),
            clock.clone(),
            config.nonce_ttl_secs,
        );
        let limiter = RateLimiter::new(
            backends.rates.clone(),
            backends.rate_fallback.clone(),
            clock.clone(),
        );
        let pipeline = RequestPipeline::new(
            verifier,
            limiter,
            config.rate_limit_tokens,
            config.rate_limit_window_secs,
        );

        let jobs = JobService::new(
            backends.jobs.clone(),
            clock.clone(),
            JobSettings {
                exports_base_url: config.exports_base_url.clone(),
                ..Default::default()
            },
        );
        let mut studio = StudioService::new(
            jobs,
            ConcurrencyGuard::render(backends.locks.clone(), config.render_lock_ttl_secs),
            ConcurrencyGuard::ingest(backends.locks.clone(), config.render_lock_ttl_secs),
            StudioSettings {
                upload_url_ttl_secs: config.upload_url_ttl_secs,
                retention_days: config.retention_days,
            },
        );
        if let Some(storage) = &config.storage {
            studio = studio.with_storage(Arc::new(S3ObjectStorage::new(storage.clone(), clock)));
        }
        if let Some(worker) = &config.worker {
            studio = studio.with_worker(Arc::new(HttpRenderWorker::new(worker)?));
        }

        Ok(Self::new(pipeline, studio, backends.name))
    }
}
