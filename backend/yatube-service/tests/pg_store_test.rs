//! PostgreSQL store tests
//!
//! Run against a disposable database:
//! `DATABASE_URL=postgres://... cargo test --test pg_store_test`
//! The tests are skipped when `DATABASE_URL` is not set.

use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;
use yatube_service::db::{PgStore, Store};
use yatube_service::error::AppError;
use yatube_service::models::{NewComment, NewGroup, NewPost, PostChanges, PostFilter};

async fn connect() -> Option<PgStore> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL not set; skipping PostgreSQL store test");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("failed to connect to DATABASE_URL");
    let store = PgStore::new(pool);
    store.migrate().await.expect("migrations failed");
    Some(store)
}

fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

#[tokio::test]
async fn test_pg_posts_comments_and_follows() {
    let Some(store) = connect().await else {
        return;
    };

    let author = store
        .upsert_user(Uuid::new_v4(), &unique("author"))
        .await
        .unwrap();
    let reader = store
        .upsert_user(Uuid::new_v4(), &unique("reader"))
        .await
        .unwrap();
    let slug = unique("group");
    let group = store
        .create_group(NewGroup {
            slug: slug.clone(),
            title: "Тестовая группа".into(),
            description: "Тестовое описание".into(),
        })
        .await
        .unwrap();

    let duplicate = store
        .create_group(NewGroup {
            slug,
            title: "Дубликат".into(),
            description: String::new(),
        })
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let first = store
        .insert_post(NewPost {
            author_id: author.id,
            text: "Первый".into(),
            group_id: Some(group.id),
            image: Some("posts/small.gif".into()),
        })
        .await
        .unwrap();
    let second = store
        .insert_post(NewPost {
            author_id: author.id,
            text: "Второй".into(),
            group_id: None,
            image: None,
        })
        .await
        .unwrap();
    assert_eq!(first.group.as_ref().map(|g| g.id), Some(group.id));

    let listed = store
        .list_posts(PostFilter::Author(author.id), 10, 0)
        .await
        .unwrap();
    assert_eq!(
        listed.iter().map(|p| p.id).collect::<Vec<_>>(),
        vec![second.id, first.id]
    );
    assert_eq!(store.count_posts(PostFilter::Group(group.id)).await.unwrap(), 1);

    let edited = store
        .update_post(
            first.id,
            PostChanges {
                text: "Изменённый".into(),
                group_id: None,
                image: None,
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(edited.text, "Изменённый");
    assert!(edited.group.is_none());
    assert_eq!(edited.image.as_deref(), Some("posts/small.gif"));

    store
        .insert_comment(NewComment {
            post_id: first.id,
            author_id: reader.id,
            text: "Коммент".into(),
        })
        .await
        .unwrap();
    assert_eq!(store.count_comments(first.id).await.unwrap(), 1);

    assert!(store.insert_follow(reader.id, author.id).await.unwrap());
    assert!(!store.insert_follow(reader.id, author.id).await.unwrap());
    assert_eq!(
        store
            .count_posts(PostFilter::FollowedBy(reader.id))
            .await
            .unwrap(),
        2
    );
    assert!(store.delete_follow(reader.id, author.id).await.unwrap());
    assert!(!store.is_following(reader.id, author.id).await.unwrap());

    assert!(store.delete_post(first.id).await.unwrap());
    assert!(store.delete_post(second.id).await.unwrap());
    assert!(store.health_check().await.is_ok());
}
