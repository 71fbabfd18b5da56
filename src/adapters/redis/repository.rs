//! Redis RenderJobRepository implementation.
//!
//! The job record is written once. Downloads, the finalize flag and the
//! failure pin live in sibling keys; every transition touching them runs as
//! one script so a finished job cannot be reopened.

use super::pool::RedisPool;
use super::{DOWNLOADS_SUFFIX, FAILED_SUFFIX, FINALIZED_SUFFIX, JOB_PREFIX};
use crate::domain::jobs::{Download, JobStatus, RenderJob};
use crate::ports::error::StoreError;
use crate::ports::repository::{Finalized, RenderJobRepository, Transition};
use async_trait::async_trait;
use deadpool_redis::redis::{self, AsyncCommands};

// Every script takes KEYS = job, downloads, finalized, failed.

/// Returns nil for an unknown job, else `{first, downloads}`.
const FINALIZE: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return false
end
local first = 0
if redis.call('SET', KEYS[3], '1', 'NX') then
    first = 1
end
redis.call('SET', KEYS[2], ARGV[1], 'NX')
return {first, redis.call('GET', KEYS[2])}
"#;

const REPLACE_DOWNLOADS: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return -1
end
if redis.call('EXISTS', KEYS[3]) == 1 or redis.call('EXISTS', KEYS[4]) == 1 then
    return 0
end
redis.call('SET', KEYS[2], ARGV[1])
return 1
"#;

const MARK_FAILED: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return -1
end
if redis.call('EXISTS', KEYS[3]) == 1 then
    return 0
end
if redis.call('SET', KEYS[4], '1', 'NX') then
    return 1
end
return 0
"#;

struct JobKeys {
    job: String,
    downloads: String,
    finalized: String,
    failed: String,
}

impl JobKeys {
    fn new(id: &str) -> Self {
        let job = format!("{}{}", JOB_PREFIX, id);
        Self {
            downloads: format!("{}{}", job, DOWNLOADS_SUFFIX),
            finalized: format!("{}{}", job, FINALIZED_SUFFIX),
            failed: format!("{}{}", job, FAILED_SUFFIX),
            job,
        }
    }

    fn invocation<'a>(&self, script: &'a redis::Script) -> redis::ScriptInvocation<'a> {
        let mut invocation = script.prepare_invoke();
        invocation
            .key(&self.job)
            .key(&self.downloads)
            .key(&self.finalized)
            .key(&self.failed);
        invocation
    }
}

fn parse_downloads(json: Option<String>) -> Result<Option<Vec<Download>>, StoreError> {
    match json {
        Some(data) => Ok(Some(serde_json::from_str(&data)?)),
        None => Ok(None),
    }
}

fn transition(reply: i64) -> Transition {
    match reply {
        1 => Transition::Applied,
        0 => Transition::Terminal,
        _ => Transition::Missing,
    }
}

#[async_trait]
impl RenderJobRepository for RedisPool {
    async fn insert(&self, job: &RenderJob) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        let key = JobKeys::new(&job.id).job;
        let json = serde_json::to_string(job)?;
        conn.set::<_, _, ()>(&key, json).await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<RenderJob>, StoreError> {
        let mut conn = self.pool.get().await?;
        let keys = JobKeys::new(id);
        let (job, downloads, finalized, failed): (
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
        ) = redis::pipe()
            .get(&keys.job)
            .get(&keys.downloads)
            .get(&keys.finalized)
            .get(&keys.failed)
            .query_async(&mut conn)
            .await?;

        let Some(data) = job else {
            return Ok(None);
        };
        let mut job: RenderJob = serde_json::from_str(&data)?;
        if let Some(downloads) = parse_downloads(downloads)? {
            job.downloads = Some(downloads);
        }
        job.finalized = finalized.is_some();
        if failed.is_some() {
            job.status = JobStatus::Error;
        }
        Ok(Some(job))
    }

    async fn finalize(
        &self,
        id: &str,
        downloads: &[Download],
    ) -> Result<Option<Finalized>, StoreError> {
        let mut conn = self.pool.get().await?;
        let keys = JobKeys::new(id);
        let json = serde_json::to_string(downloads)?;
        let script = redis::Script::new(FINALIZE);
        let reply: Option<(i64, Option<String>)> = keys
            .invocation(&script)
            .arg(json)
            .invoke_async(&mut conn)
            .await?;

        let Some((first, stored)) = reply else {
            return Ok(None);
        };
        Ok(Some(Finalized {
            downloads: parse_downloads(stored)?.unwrap_or_default(),
            first: first == 1,
        }))
    }

    async fn replace_downloads(
        &self,
        id: &str,
        downloads: &[Download],
    ) -> Result<Transition, StoreError> {
        let mut conn = self.pool.get().await?;
        let keys = JobKeys::new(id);
        let json = serde_json::to_string(downloads)?;
        let script = redis::Script::new(REPLACE_DOWNLOADS);
        let reply: i64 = keys
            .invocation(&script)
            .arg(json)
            .invoke_async(&mut conn)
            .await?;
        Ok(transition(reply))
    }

    async fn mark_failed(&self, id: &str) -> Result<Transition, StoreError> {
        let mut conn = self.pool.get().await?;
        let keys = JobKeys::new(id);
        let script = redis::Script::new(MARK_FAILED);
        let reply: i64 = keys.invocation(&script).invoke_async(&mut conn).await?;
        Ok(transition(reply))
    }
}
