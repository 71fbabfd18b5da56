//! Hypegate - trust and job-orchestration layer for the highlight studio.
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (presigning, job projection, demo catalog)
//! - ports/: Trait definitions (stores, job repository, worker, object storage)
//! - adapters/: Concrete implementations (Redis, in-process memory, HTTP)
//! - application/: Services that use ports (auth, limits, jobs, studio operations)
//! - config: Environment configuration
//!
//! Every inbound call passes through the [`application::pipeline::RequestPipeline`]
//! (signature, rate limit, concurrency) before the studio operation runs.

pub mod adapters;
pub mod application;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

// Re-exports for convenience
pub use adapters::http::{create_router, AppState};
pub use config::AppConfig;
pub use error::{ApiError, AuthError};
