/// Feed composer - paginated post listings and the cached index
use crate::cache::{PageCache, Snapshot};
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::metrics::{FEED_PAGES_TOTAL, INDEX_CACHE_EVENTS, INDEX_CACHE_WRITE_TOTAL};
use crate::middleware::AuthUser;
use crate::models::{FollowCounts, Group, Page, Post, PostFilter, User};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Key prefix of cached index pages
pub const INDEX_CACHE_PREFIX: &str = "index_page:";

pub fn index_cache_key(page: usize) -> String {
    format!("{}{}", INDEX_CACHE_PREFIX, page)
}

#[derive(Debug, Clone, Copy)]
pub struct FeedSettings {
    pub page_size: usize,
    pub index_ttl: Duration,
}

#[derive(Debug, Serialize)]
pub struct IndexView {
    pub page_obj: Page<Post>,
}

#[derive(Debug, Serialize)]
pub struct GroupView {
    pub group: Group,
    pub page_obj: Page<Post>,
}

#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub author: User,
    pub page_obj: Page<Post>,
    pub post_count: i64,
    /// Whether the viewer follows this author
    pub following: bool,
    pub follow_counts: FollowCounts,
}

#[derive(Debug, Serialize)]
pub struct FollowView {
    pub page_obj: Page<Post>,
}

#[derive(Clone)]
pub struct FeedComposer {
    store: Arc<dyn Store>,
    cache: Arc<dyn PageCache>,
    settings: FeedSettings,
}

impl FeedComposer {
    pub fn new(store: Arc<dyn Store>, cache: Arc<dyn PageCache>, settings: FeedSettings) -> Self {
        Self {
            store,
            cache,
            settings,
        }
    }

    async fn page(&self, filter: PostFilter, number: usize) -> Result<Page<Post>> {
        let per_page = self.settings.page_size.max(1);
        let total = self.store.count_posts(filter).await?;

        // Pages past the end are empty without touching the store.
        let offset = match Page::<Post>::offset(number, per_page) {
            Some(offset) if number <= Page::<Post>::page_count(total, per_page) => offset,
            _ => return Ok(Page::new(Vec::new(), number, per_page, total)),
        };
        let limit = i64::try_from(per_page).unwrap_or(i64::MAX);
        let items = self.store.list_posts(filter, limit, offset).await?;

        Ok(Page::new(items, number, per_page, total))
    }

    /// Uncached index page
    pub async fn index(&self, number: usize) -> Result<IndexView> {
        FEED_PAGES_TOTAL.with_label_values(&["index"]).inc();
        Ok(IndexView {
            page_obj: self.page(PostFilter::All, number).await?,
        })
    }

    /// Serialized index page, served from the page cache while fresh.
    ///
    /// Cache failures never fail the request.
    pub async fn index_snapshot(&self, number: usize) -> Result<Snapshot> {
        let key = index_cache_key(number);

        match self.cache.get(&key).await {
            Ok(Some(snapshot)) => {
                INDEX_CACHE_EVENTS.with_label_values(&["hit"]).inc();
                return Ok(snapshot);
            }
            Ok(None) => {
                INDEX_CACHE_EVENTS.with_label_values(&["miss"]).inc();
            }
            Err(err) => {
                INDEX_CACHE_EVENTS.with_label_values(&["error"]).inc();
                tracing::warn!(%key, "index cache read failed: {}", err);
            }
        }

        let view = self.index(number).await?;
        let snapshot = Snapshot::json(serde_json::to_vec(&view)?);

        // Only real pages are cached; any number past the end would add a key.
        if view.page_obj.number > view.page_obj.num_pages {
            return Ok(snapshot);
        }

        match self
            .cache
            .put(&key, &snapshot, self.settings.index_ttl)
            .await
        {
            Ok(()) => INDEX_CACHE_WRITE_TOTAL.with_label_values(&["success"]).inc(),
            Err(err) => {
                INDEX_CACHE_WRITE_TOTAL.with_label_values(&["error"]).inc();
                tracing::warn!(%key, "index cache write failed: {}", err);
            }
        }

        Ok(snapshot)
    }

    /// Drop every cached index page
    pub async fn invalidate_index(&self) -> Result<()> {
        self.cache.invalidate_prefix(INDEX_CACHE_PREFIX).await?;
        tracing::debug!("index cache invalidated");
        Ok(())
    }

    pub async fn group(&self, slug: &str, number: usize) -> Result<GroupView> {
        let group = self
            .store
            .find_group_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Group not found: {}", slug)))?;

        FEED_PAGES_TOTAL.with_label_values(&["group"]).inc();
        let page_obj = self.page(PostFilter::Group(group.id), number).await?;
        Ok(GroupView { group, page_obj })
    }

    pub async fn profile(
        &self,
        username: &str,
        number: usize,
        viewer: Option<&AuthUser>,
    ) -> Result<ProfileView> {
        let author = self
            .store
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found: {}", username)))?;

        FEED_PAGES_TOTAL.with_label_values(&["profile"]).inc();
        let page_obj = self.page(PostFilter::Author(author.id), number).await?;
        let following = match viewer {
            Some(viewer) if viewer.id != author.id => {
                self.store.is_following(viewer.id, author.id).await?
            }
            _ => false,
        };
        let follow_counts = self.store.follow_counts(author.id).await?;

        Ok(ProfileView {
            post_count: page_obj.total_items,
            author,
            page_obj,
            following,
            follow_counts,
        })
    }

    /// Posts of authors followed by `user_id`
    pub async fn followed(&self, user_id: Uuid, number: usize) -> Result<FollowView> {
        FEED_PAGES_TOTAL.with_label_values(&["follow"]).inc();
        Ok(FollowView {
            page_obj: self.page(PostFilter::FollowedBy(user_id), number).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryPageCache;
    use crate::db::MemoryStore;
    use crate::models::{NewGroup, NewPost};

    async fn composer_with_posts(count: usize) -> (FeedComposer, Arc<MemoryStore>, User) {
        let store = Arc::new(MemoryStore::new());
        let author = store.upsert_user(Uuid::new_v4(), "auth").await.unwrap();
        for i in 0..count {
            store
                .insert_post(NewPost {
                    author_id: author.id,
                    text: format!("Тестовый пост {}", i),
                    group_id: None,
                    image: None,
                })
                .await
                .unwrap();
        }

        let composer = FeedComposer::new(
            store.clone(),
            Arc::new(MemoryPageCache::new()),
            FeedSettings {
                page_size: 10,
                index_ttl: Duration::from_secs(20),
            },
        );
        (composer, store, author)
    }

    #[tokio::test]
    async fn test_index_pages_split_by_page_size() {
        let (composer, _, _) = composer_with_posts(13).await;

        let first = composer.index(1).await.unwrap().page_obj;
        assert_eq!(first.len(), 10);
        assert_eq!(first.num_pages, 2);
        assert!(first.has_next);

        let second = composer.index(2).await.unwrap().page_obj;
        assert_eq!(second.len(), 3);
        assert!(!second.has_next);

        let beyond = composer.index(5).await.unwrap().page_obj;
        assert!(beyond.is_empty());
        assert_eq!(beyond.total_items, 13);
    }

    #[tokio::test]
    async fn test_index_snapshot_survives_deletion_until_invalidated() {
        let (composer, store, _) = composer_with_posts(1).await;

        let before = composer.index_snapshot(1).await.unwrap();
        let post = store.latest_post().await.unwrap().unwrap();
        assert!(store.delete_post(post.id).await.unwrap());

        let cached = composer.index_snapshot(1).await.unwrap();
        assert_eq!(before.body, cached.body);

        composer.invalidate_index().await.unwrap();
        let fresh = composer.index_snapshot(1).await.unwrap();
        assert_ne!(before.body, fresh.body);
    }

    #[tokio::test]
    async fn test_huge_page_number_is_empty() {
        let (composer, _, author) = composer_with_posts(3).await;
        let number = 9223372036854775807;

        let index = composer.index(number).await.unwrap().page_obj;
        assert!(index.is_empty());
        assert_eq!(index.number, number);
        assert_eq!(index.num_pages, 1);
        assert!(index.has_previous);
        assert!(!index.has_next);

        let profile = composer
            .profile(&author.username, number, None)
            .await
            .unwrap();
        assert!(profile.page_obj.is_empty());
        assert_eq!(profile.post_count, 3);

        let overflow = composer.index(usize::MAX).await.unwrap().page_obj;
        assert!(overflow.is_empty());
    }

    #[tokio::test]
    async fn test_pages_past_the_end_are_not_cached() {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemoryPageCache::new());
        let composer = FeedComposer::new(
            store,
            cache.clone(),
            FeedSettings {
                page_size: 10,
                index_ttl: Duration::from_secs(20),
            },
        );

        for number in 2..200 {
            let snapshot = composer.index_snapshot(number).await.unwrap();
            let body: serde_json::Value = serde_json::from_slice(&snapshot.body).unwrap();
            assert!(body["page_obj"]["items"].as_array().unwrap().is_empty());
        }
        assert_eq!(cache.len(), 0);

        composer.index_snapshot(1).await.unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_group_and_profile_lookups() {
        let (composer, store, author) = composer_with_posts(2).await;
        let group = store
            .create_group(NewGroup {
                slug: "test-slug".into(),
                title: "Тестовая группа".into(),
                description: "Тестовое описание".into(),
            })
            .await
            .unwrap();

        let view = composer.group("test-slug", 1).await.unwrap();
        assert_eq!(view.group.id, group.id);
        assert!(view.page_obj.is_empty());
        assert!(matches!(
            composer.group("missing", 1).await,
            Err(AppError::NotFound(_))
        ));

        let profile = composer.profile(&author.username, 1, None).await.unwrap();
        assert_eq!(profile.post_count, 2);
        assert!(!profile.following);
        assert!(matches!(
            composer.profile("nobody", 1, None).await,
            Err(AppError::NotFound(_))
        ));
    }
}
