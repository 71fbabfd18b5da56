//! Ports - Trait definitions implemented by adapters.

pub mod error;
pub mod repository;
pub mod storage;
pub mod stores;
pub mod worker;
