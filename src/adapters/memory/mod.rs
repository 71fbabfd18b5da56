//! In-process adapter for single-instance deployments.
//!
//! Correct only while a single process serves all traffic: nothing here is
//! shared across instances.

mod repository;
mod stores;

pub use repository::MemoryJobRepository;
pub use stores::MemoryStore;
