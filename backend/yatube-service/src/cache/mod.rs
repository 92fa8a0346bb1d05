/// Page caching layer
///
/// `PageCache` is the port the feed composer reads rendered pages through:
/// - `RedisPageCache`: shared cache for multi-instance deployments
/// - `MemoryPageCache`: process-local cache for tests and single instances
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

mod memory;
mod redis_cache;

pub use memory::MemoryPageCache;
pub use redis_cache::RedisPageCache;

/// Serialized page body as it was sent to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub content_type: String,
    pub body: Vec<u8>,
}

impl Snapshot {
    pub fn json(body: Vec<u8>) -> Self {
        Self {
            content_type: "application/json".to_string(),
            body,
        }
    }
}

#[async_trait::async_trait]
pub trait PageCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Snapshot>>;

    async fn put(&self, key: &str, snapshot: &Snapshot, ttl: Duration) -> Result<()>;

    async fn invalidate(&self, key: &str) -> Result<()>;

    /// Drop every entry whose key starts with `prefix`
    async fn invalidate_prefix(&self, prefix: &str) -> Result<()>;
}
