//! Redis adapter for distributed deployments.
//!
//! This module provides Redis-backed implementations of:
//! - `ReplayStore`, `RateStore` and `LockStore` using single atomic commands
//! - `RenderJobRepository` for render job state

mod pool;
mod repository;
mod stores;

pub use pool::RedisPool;

/// Redis key constants
const JOB_PREFIX: &str = "job:";
const DOWNLOADS_SUFFIX: &str = ":downloads";
const FINALIZED_SUFFIX: &str = ":finalized";
const FAILED_SUFFIX: &str = ":failed";
