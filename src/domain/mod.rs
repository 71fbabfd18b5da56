//! Domain layer - Pure business logic.

pub mod catalog;
pub mod crypto;
pub mod jobs;
pub mod presign;
