//! Task store adapters for buildq.
//!
//! Provides `TaskStore` implementations:
//! - Redis with the RedisJSON module (production)
//! - In-memory (tests and local runs)

pub mod error;
pub mod memory;
pub mod redisjson;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryTaskStore;
pub use redisjson::RedisTaskStore;

use buildq_core::QueueKey;

/// Connect to the Redis queue at `url`.
pub async fn connect(url: &str, key: QueueKey) -> StoreResult<RedisTaskStore> {
    RedisTaskStore::connect(url, key).await
}
