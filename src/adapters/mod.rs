//! Adapters - Concrete implementations of ports.

pub mod backends;
pub mod http;
pub mod memory;
pub mod redis;
pub mod s3;
pub mod worker;
