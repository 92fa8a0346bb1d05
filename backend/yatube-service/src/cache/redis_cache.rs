use super::{PageCache, Snapshot};
use crate::error::{AppError, Result};
use redis::{aio::ConnectionManager, AsyncCommands};
use std::time::Duration;
use tracing::{debug, warn};

const KEY_NAMESPACE: &str = "yatube:page:v1:";
const SCAN_BATCH: usize = 200;

/// Page cache stored in Redis as JSON-encoded snapshots
#[derive(Clone)]
pub struct RedisPageCache {
    redis: ConnectionManager,
}

impl RedisPageCache {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self::new(manager))
    }

    fn full_key(key: &str) -> String {
        format!("{}{}", KEY_NAMESPACE, key)
    }

    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.redis.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(AppError::Cache(format!("unexpected PING response: {}", pong)))
        }
    }
}

#[async_trait::async_trait]
impl PageCache for RedisPageCache {
    async fn get(&self, key: &str) -> Result<Option<Snapshot>> {
        let full_key = Self::full_key(key);
        let mut conn = self.redis.clone();

        match conn.get::<_, Option<String>>(&full_key).await {
            Ok(Some(data)) => {
                debug!(key, "page cache HIT");
                serde_json::from_str::<Snapshot>(&data)
                    .map(Some)
                    .map_err(|e| AppError::Cache(format!("snapshot deserialization: {}", e)))
            }
            Ok(None) => {
                debug!(key, "page cache MISS");
                Ok(None)
            }
            Err(e) => {
                warn!(key, error = %e, "Redis read error for page cache");
                Err(e.into())
            }
        }
    }

    async fn put(&self, key: &str, snapshot: &Snapshot, ttl: Duration) -> Result<()> {
        let full_key = Self::full_key(key);
        let data = serde_json::to_string(snapshot)?;
        let seconds = ttl.as_secs().max(1);

        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(&full_key, data, seconds).await?;

        debug!(key, ttl_secs = seconds, "page cache WRITE");
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<()> {
        let mut conn = self.redis.clone();
        conn.del::<_, ()>(Self::full_key(key)).await?;
        debug!(key, "page cache INVALIDATE");
        Ok(())
    }

    async fn invalidate_prefix(&self, prefix: &str) -> Result<()> {
        let pattern = format!("{}*", Self::full_key(prefix));
        let mut conn = self.redis.clone();
        let mut cursor: u64 = 0;
        let mut removed = 0usize;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                removed += keys.len();
                conn.del::<_, ()>(keys).await?;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(prefix, removed, "page cache INVALIDATE prefix");
        Ok(())
    }
}
