//! Configuration loaded from the environment.

use std::env;
use std::str::FromStr;

/// Object storage credentials used for presigning.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Path-style endpoint, e.g. `https://<account>.r2.cloudflarestorage.com`
    pub endpoint: String,
}

/// External render/analysis worker reached over HTTP.
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub base_url: String,
    pub token: String,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: String,
    /// HMAC secret for inbound requests. Empty disables verification.
    pub hmac_secret: String,
    /// Redis connection URL. `None` selects the in-process backend.
    pub redis_url: Option<String>,
    /// Storage settings, present only when bucket and both keys are set
    pub storage: Option<StorageConfig>,
    /// Worker settings, present only when base URL and token are set
    pub worker: Option<WorkerConfig>,
    pub rate_limit_tokens: u64,
    pub rate_limit_window_secs: u64,
    pub render_lock_ttl_secs: u64,
    pub nonce_ttl_secs: u64,
    pub retention_days: u32,
    pub upload_url_ttl_secs: u64,
    pub exports_base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            addr: String::from("127.0.0.1"),
            port: String::from("3000"),
            hmac_secret: String::new(),
            redis_url: None,
            storage: None,
            worker: None,
            rate_limit_tokens: 60,
            rate_limit_window_secs: 60,
            render_lock_ttl_secs: 900,
            nonce_ttl_secs: 600,
            retention_days: 7,
            upload_url_ttl_secs: 900,
            exports_base_url: String::from("https://example.com/exports"),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let defaults = Self::default();

        let storage = match (
            non_empty("STORAGE_BUCKET"),
            non_empty("STORAGE_ACCESS_KEY"),
            non_empty("STORAGE_SECRET_KEY"),
        ) {
            (Some(bucket), Some(access_key_id), Some(secret_access_key)) => Some(StorageConfig {
                bucket,
                region: non_empty("STORAGE_REGION").unwrap_or_else(|| String::from("us-east-1")),
                access_key_id,
                secret_access_key,
                endpoint: non_empty("STORAGE_ENDPOINT")
                    .unwrap_or_else(|| String::from("https://s3.amazonaws.com")),
            }),
            _ => None,
        };

        let worker = match (non_empty("GPU_WORKER_BASE_URL"), non_empty("GPU_WORKER_TOKEN")) {
            (Some(base_url), Some(token)) => Some(WorkerConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                token,
            }),
            _ => None,
        };

        Self {
            addr: env::var("ADDR").unwrap_or(defaults.addr),
            port: env::var("PORT").unwrap_or(defaults.port),
            hmac_secret: env::var("EDGE_HMAC_SECRET").unwrap_or_default(),
            redis_url: non_empty("REDIS_URL"),
            storage,
            worker,
            rate_limit_tokens: parsed("RATE_LIMIT_TOKENS", defaults.rate_limit_tokens),
            rate_limit_window_secs: parsed("RATE_LIMIT_WINDOW_SECS", defaults.rate_limit_window_secs)
                .max(1),
            render_lock_ttl_secs: parsed("RENDER_LOCK_TTL_SECS", defaults.render_lock_ttl_secs),
            nonce_ttl_secs: parsed("NONCE_TTL_SECS", defaults.nonce_ttl_secs),
            retention_days: parsed("RETENTION_DAYS", defaults.retention_days),
            upload_url_ttl_secs: parsed("UPLOAD_URL_TTL_SECS", defaults.upload_url_ttl_secs),
            exports_base_url: non_empty("EXPORTS_BASE_URL").unwrap_or(defaults.exports_base_url),
        }
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(variable = name, value = %raw, "Ignoring unparsable value, using default");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_limits() {
        let config = AppConfig::default();
        assert_eq!(config.rate_limit_tokens, 60);
        assert_eq!(config.rate_limit_window_secs, 60);
        assert_eq!(config.render_lock_ttl_secs, 900);
        assert_eq!(config.nonce_ttl_secs, 600);
        assert!(config.hmac_secret.is_empty());
        assert!(config.storage.is_none());
    }

    #[test]
    fn test_parsed_falls_back_on_garbage() {
        env::set_var("HYPEGATE_TEST_PARSED", "not-a-number");
        assert_eq!(parsed("HYPEGATE_TEST_PARSED", 42u64), 42);
        env::set_var("HYPEGATE_TEST_PARSED", " 17 ");
        assert_eq!(parsed("HYPEGATE_TEST_PARSED", 42u64), 17);
        env::remove_var("HYPEGATE_TEST_PARSED");
    }
}
