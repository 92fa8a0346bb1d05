use super::Store;
use crate::error::{AppError, Result};
use crate::models::{
    AuthorRef, Comment, FollowCounts, Group, GroupRef, NewComment, NewGroup, NewPost, Post,
    PostChanges, PostFilter, User,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use uuid::Uuid;

struct PostRecord {
    id: i64,
    text: String,
    created_at: DateTime<Utc>,
    author_id: Uuid,
    group_id: Option<i64>,
    image: Option<String>,
}

struct CommentRecord {
    id: i64,
    post_id: i64,
    author_id: Uuid,
    text: String,
    created_at: DateTime<Utc>,
}

struct FollowRecord {
    user_id: Uuid,
    author_id: Uuid,
}

#[derive(Default)]
struct State {
    users: BTreeMap<Uuid, User>,
    groups: BTreeMap<i64, Group>,
    posts: BTreeMap<i64, PostRecord>,
    comments: BTreeMap<i64, CommentRecord>,
    follows: Vec<FollowRecord>,
    next_group_id: i64,
    next_post_id: i64,
    next_comment_id: i64,
}

impl State {
    fn author_ref(&self, id: Uuid) -> Result<AuthorRef> {
        self.users
            .get(&id)
            .map(|u| AuthorRef {
                id: u.id,
                username: u.username.clone(),
            })
            .ok_or_else(|| AppError::Internal(format!("dangling author reference {}", id)))
    }

    fn post(&self, record: &PostRecord) -> Result<Post> {
        let group = record
            .group_id
            .and_then(|id| self.groups.get(&id))
            .map(|g| GroupRef {
                id: g.id,
                slug: g.slug.clone(),
                title: g.title.clone(),
            });

        Ok(Post {
            id: record.id,
            text: record.text.clone(),
            created_at: record.created_at,
            author: self.author_ref(record.author_id)?,
            group,
            image: record.image.clone(),
        })
    }

    fn comment(&self, record: &CommentRecord) -> Result<Comment> {
        Ok(Comment {
            id: record.id,
            post_id: record.post_id,
            author: self.author_ref(record.author_id)?,
            text: record.text.clone(),
            created_at: record.created_at,
        })
    }

    fn follows(&self, user_id: Uuid, author_id: Uuid) -> bool {
        self.follows
            .iter()
            .any(|f| f.user_id == user_id && f.author_id == author_id)
    }

    fn matches(&self, filter: PostFilter, record: &PostRecord) -> bool {
        match filter {
            PostFilter::All => true,
            PostFilter::Group(id) => record.group_id == Some(id),
            PostFilter::Author(id) => record.author_id == id,
            PostFilter::FollowedBy(user_id) => self.follows(user_id, record.author_id),
        }
    }

    fn check_text(text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(AppError::Internal("blank text rejected by store".into()));
        }
        Ok(())
    }
}

/// In-memory entity store
///
/// Enforces the same uniqueness, ordering and cascade rules as the
/// PostgreSQL schema.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a user together with their posts, comments and follow edges
    pub async fn delete_user(&self, id: Uuid) -> bool {
        let mut state = self.state.write().await;
        if state.users.remove(&id).is_none() {
            return false;
        }

        let removed_posts: Vec<i64> = state
            .posts
            .values()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        for post_id in &removed_posts {
            state.posts.remove(post_id);
        }
        state
            .comments
            .retain(|_, c| c.author_id != id && !removed_posts.contains(&c.post_id));
        state.follows.retain(|f| f.user_id != id && f.author_id != id);
        true
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn upsert_user(&self, id: Uuid, username: &str) -> Result<User> {
        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|u| u.username == username && u.id != id)
        {
            return Err(AppError::Conflict(format!("username '{}' is taken", username)));
        }

        let user = state.users.entry(id).or_insert_with(|| User {
            id,
            username: username.to_string(),
            created_at: Utc::now(),
        });
        user.username = username.to_string();
        Ok(user.clone())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn create_group(&self, group: NewGroup) -> Result<Group> {
        let mut state = self.state.write().await;
        if state.groups.values().any(|g| g.slug == group.slug) {
            return Err(AppError::Conflict(format!(
                "group slug '{}' exists",
                group.slug
            )));
        }

        state.next_group_id += 1;
        let created = Group {
            id: state.next_group_id,
            slug: group.slug,
            title: group.title,
            description: group.description,
        };
        state.groups.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_group(&self, id: i64) -> Result<Option<Group>> {
        Ok(self.state.read().await.groups.get(&id).cloned())
    }

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let state = self.state.read().await;
        Ok(state.groups.values().find(|g| g.slug == slug).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let state = self.state.read().await;
        let mut groups: Vec<Group> = state.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn insert_post(&self, post: NewPost) -> Result<Post> {
        State::check_text(&post.text)?;
        let mut state = self.state.write().await;
        state.author_ref(post.author_id)?;

        state.next_post_id += 1;
        let record = PostRecord {
            id: state.next_post_id,
            text: post.text,
            created_at: Utc::now(),
            author_id: post.author_id,
            group_id: post.group_id.filter(|id| state.groups.contains_key(id)),
            image: post.image,
        };
        let created = state.post(&record)?;
        state.posts.insert(record.id, record);
        Ok(created)
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>> {
        let state = self.state.read().await;
        state.posts.get(&id).map(|r| state.post(r)).transpose()
    }

    async fn latest_post(&self) -> Result<Option<Post>> {
        let state = self.state.read().await;
        state
            .posts
            .values()
            .next_back()
            .map(|r| state.post(r))
            .transpose()
    }

    async fn update_post(&self, id: i64, changes: PostChanges) -> Result<Option<Post>> {
        State::check_text(&changes.text)?;
        let mut state = self.state.write().await;
        let group_id = changes.group_id.filter(|g| state.groups.contains_key(g));

        let Some(record) = state.posts.get_mut(&id) else {
            return Ok(None);
        };
        record.text = changes.text;
        record.group_id = group_id;
        if let Some(image) = changes.image {
            record.image = Some(image);
        }

        let state = &*state;
        state.posts.get(&id).map(|r| state.post(r)).transpose()
    }

    async fn delete_post(&self, id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        let removed = state.posts.remove(&id).is_some();
        if removed {
            state.comments.retain(|_, c| c.post_id != id);
        }
        Ok(removed)
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<i64> {
        let state = self.state.read().await;
        let count = state
            .posts
            .values()
            .filter(|r| state.matches(filter, r))
            .count();
        Ok(count as i64)
    }

    async fn list_posts(&self, filter: PostFilter, limit: i64, offset: i64) -> Result<Vec<Post>> {
        let state = self.state.read().await;
        let mut records: Vec<&PostRecord> = state
            .posts
            .values()
            .filter(|r| state.matches(filter, r))
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        records
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|r| state.post(r))
            .collect()
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment> {
        State::check_text(&comment.text)?;
        let mut state = self.state.write().await;
        if !state.posts.contains_key(&comment.post_id) {
            return Err(AppError::NotFound(format!("post {}", comment.post_id)));
        }
        state.author_ref(comment.author_id)?;

        state.next_comment_id += 1;
        let record = CommentRecord {
            id: state.next_comment_id,
            post_id: comment.post_id,
            author_id: comment.author_id,
            text: comment.text,
            created_at: Utc::now(),
        };
        let created = state.comment(&record)?;
        state.comments.insert(record.id, record);
        Ok(created)
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>> {
        let state = self.state.read().await;
        // Ids are assigned in insertion order, so map order is chronological.
        state
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .map(|c| state.comment(c))
            .collect()
    }

    async fn count_comments(&self, post_id: i64) -> Result<i64> {
        let state = self.state.read().await;
        let count = state
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .count();
        Ok(count as i64)
    }

    async fn insert_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool> {
        if user_id == author_id {
            return Err(AppError::Internal("self-follow rejected by store".into()));
        }
        let mut state = self.state.write().await;
        state.author_ref(user_id)?;
        state.author_ref(author_id)?;
        if state.follows(user_id, author_id) {
            return Ok(false);
        }
        state.follows.push(FollowRecord { user_id, author_id });
        Ok(true)
    }

    async fn delete_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.follows.len();
        state
            .follows
            .retain(|f| !(f.user_id == user_id && f.author_id == author_id));
        Ok(state.follows.len() < before)
    }

    async fn is_following(&self, user_id: Uuid, author_id: Uuid) -> Result<bool> {
        Ok(self.state.read().await.follows(user_id, author_id))
    }

    async fn follow_counts(&self, user_id: Uuid) -> Result<FollowCounts> {
        let state = self.state.read().await;
        Ok(FollowCounts {
            followers: state
                .follows
                .iter()
                .filter(|f| f.author_id == user_id)
                .count() as i64,
            following: state.follows.iter().filter(|f| f.user_id == user_id).count() as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryStore, User, User, Group) {
        let store = MemoryStore::new();
        let alice = store.upsert_user(Uuid::new_v4(), "alice").await.unwrap();
        let bob = store.upsert_user(Uuid::new_v4(), "bob").await.unwrap();
        let group = store
            .create_group(NewGroup {
                slug: "cats".into(),
                title: "Cats".into(),
                description: "All about cats".into(),
            })
            .await
            .unwrap();
        (store, alice, bob, group)
    }

    fn new_post(author: &User, text: &str, group: Option<&Group>) -> NewPost {
        NewPost {
            author_id: author.id,
            text: text.into(),
            group_id: group.map(|g| g.id),
            image: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_conflict() {
        let (store, ..) = seeded().await;
        let err = store
            .create_group(NewGroup {
                slug: "cats".into(),
                title: "Other".into(),
                description: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_username_is_unique() {
        let (store, alice, ..) = seeded().await;
        let err = store
            .upsert_user(Uuid::new_v4(), &alice.username)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Same id refreshes in place
        let renamed = store.upsert_user(alice.id, "alice2").await.unwrap();
        assert_eq!(renamed.username, "alice2");
    }

    #[tokio::test]
    async fn test_listing_is_newest_first_with_id_tiebreak() {
        let (store, alice, _, group) = seeded().await;
        for i in 0..5 {
            store
                .insert_post(new_post(&alice, &format!("post {}", i), Some(&group)))
                .await
                .unwrap();
        }

        let posts = store.list_posts(PostFilter::All, 10, 0).await.unwrap();
        let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![5, 4, 3, 2, 1]);

        let page = store.list_posts(PostFilter::All, 2, 4).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, 1);

        let latest = store.latest_post().await.unwrap().unwrap();
        assert_eq!(latest.id, 5);
        assert_eq!(latest.group.unwrap().slug, "cats");
    }

    #[tokio::test]
    async fn test_filters() {
        let (store, alice, bob, group) = seeded().await;
        store
            .insert_post(new_post(&alice, "grouped", Some(&group)))
            .await
            .unwrap();
        store.insert_post(new_post(&bob, "loose", None)).await.unwrap();

        assert_eq!(store.count_posts(PostFilter::All).await.unwrap(), 2);
        assert_eq!(store.count_posts(PostFilter::Group(group.id)).await.unwrap(), 1);
        assert_eq!(store.count_posts(PostFilter::Author(bob.id)).await.unwrap(), 1);
        assert_eq!(
            store.count_posts(PostFilter::FollowedBy(alice.id)).await.unwrap(),
            0
        );

        assert!(store.insert_follow(alice.id, bob.id).await.unwrap());
        let followed = store
            .list_posts(PostFilter::FollowedBy(alice.id), 10, 0)
            .await
            .unwrap();
        assert_eq!(followed.len(), 1);
        assert_eq!(followed[0].author.username, "bob");
    }

    #[tokio::test]
    async fn test_follow_edges_are_unique() {
        let (store, alice, bob, _) = seeded().await;
        assert!(store.insert_follow(alice.id, bob.id).await.unwrap());
        assert!(!store.insert_follow(alice.id, bob.id).await.unwrap());
        assert!(store.insert_follow(alice.id, alice.id).await.is_err());

        let counts = store.follow_counts(bob.id).await.unwrap();
        assert_eq!(counts.followers, 1);
        assert_eq!(counts.following, 0);

        assert!(store.delete_follow(alice.id, bob.id).await.unwrap());
        assert!(!store.delete_follow(alice.id, bob.id).await.unwrap());
        assert!(!store.is_following(alice.id, bob.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_keeps_image_unless_replaced() {
        let (store, alice, _, group) = seeded().await;
        let mut draft = new_post(&alice, "with image", Some(&group));
        draft.image = Some("posts/cat.gif".into());
        let post = store.insert_post(draft).await.unwrap();

        let updated = store
            .update_post(
                post.id,
                PostChanges {
                    text: "edited".into(),
                    group_id: None,
                    image: None,
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.text, "edited");
        assert!(updated.group.is_none());
        assert_eq!(updated.image.as_deref(), Some("posts/cat.gif"));

        let missing = store
            .update_post(
                999,
                PostChanges {
                    text: "x".into(),
                    group_id: None,
                    image: None,
                },
            )
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_deleting_user_cascades() {
        let (store, alice, bob, _) = seeded().await;
        let post = store.insert_post(new_post(&alice, "mine", None)).await.unwrap();
        store
            .insert_comment(NewComment {
                post_id: post.id,
                author_id: bob.id,
                text: "nice".into(),
            })
            .await
            .unwrap();
        store.insert_follow(bob.id, alice.id).await.unwrap();

        assert!(store.delete_user(alice.id).await);
        assert_eq!(store.count_posts(PostFilter::All).await.unwrap(), 0);
        assert_eq!(store.count_comments(post.id).await.unwrap(), 0);
        assert_eq!(store.follow_counts(bob.id).await.unwrap().following, 0);
    }
}
