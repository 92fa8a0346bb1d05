use super::{PageCache, Snapshot};
use crate::error::Result;
use dashmap::DashMap;
use std::time::{Duration, Instant};

struct Entry {
    snapshot: Snapshot,
    expires_at: Instant,
}

/// Process-local page cache with per-entry expiry
#[derive(Default)]
pub struct MemoryPageCache {
    entries: DashMap<String, Entry>,
}

impl MemoryPageCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[async_trait::async_trait]
impl PageCache for MemoryPageCache {
    async fn get(&self, key: &str) -> Result<Option<Snapshot>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Ok(Some(entry.snapshot.clone()));
            }
        }
        // Expired entries are dropped lazily.
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        Ok(None)
    }

    async fn put(&self, key: &str, snapshot: &Snapshot, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
        self.entries.insert(
            key.to_string(),
            Entry {
                snapshot: snapshot.clone(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn invalidate_prefix(&self, prefix: &str) -> Result<()> {
        self.entries.retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(body: &str) -> Snapshot {
        Snapshot::json(body.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_put_get_invalidate() {
        let cache = MemoryPageCache::new();
        assert!(cache.get("index_page:1").await.unwrap().is_none());

        cache
            .put("index_page:1", &snapshot("{}"), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            cache.get("index_page:1").await.unwrap(),
            Some(snapshot("{}"))
        );

        cache.invalidate("index_page:1").await.unwrap();
        assert!(cache.get("index_page:1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entries_are_misses() {
        let cache = MemoryPageCache::new();
        cache
            .put("index_page:1", &snapshot("{}"), Duration::ZERO)
            .await
            .unwrap();
        assert!(cache.get("index_page:1").await.unwrap().is_none());
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_put_sweeps_expired_entries() {
        let cache = MemoryPageCache::new();
        for page in 1..=50 {
            cache
                .put(&format!("index_page:{}", page), &snapshot("{}"), Duration::ZERO)
                .await
                .unwrap();
        }
        assert_eq!(cache.len(), 1);

        cache
            .put("index_page:1", &snapshot("{}"), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.get("index_page:1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_invalidate_prefix_keeps_other_keys() {
        let cache = MemoryPageCache::new();
        let ttl = Duration::from_secs(60);
        cache.put("index_page:1", &snapshot("a"), ttl).await.unwrap();
        cache.put("index_page:2", &snapshot("b"), ttl).await.unwrap();
        cache.put("other:1", &snapshot("c"), ttl).await.unwrap();

        cache.invalidate_prefix("index_page:").await.unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.get("other:1").await.unwrap().is_some());
    }
}
