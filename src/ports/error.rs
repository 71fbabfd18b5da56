//! Errors raised by store and repository backends.

pub type RedisError = deadpool_redis::redis::RedisError;
pub type PoolError = deadpool_redis::PoolError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Create pool error: {0}")]
    CreatePool(String),
}

impl From<deadpool_redis::CreatePoolError> for StoreError {
    fn from(err: deadpool_redis::CreatePoolError) -> Self {
        StoreError::CreatePool(format!("{}", err))
    }
}
