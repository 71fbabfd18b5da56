//! Application layer - Services that use ports.

pub mod concurrency;
pub mod dto;
pub mod jobs;
pub mod pipeline;
pub mod rate_limit;
pub mod signature;
pub mod studio;
