//! Shared fixtures for yatube-service integration tests
#![allow(dead_code)]

use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::header;
use actix_web::{test, web, App};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use yatube_service::cache::{MemoryPageCache, PageCache};
use yatube_service::db::{MemoryStore, Store};
use yatube_service::handlers::{self, SiteSettings};
use yatube_service::middleware::{IdentityMiddleware, JwtKeys};
use yatube_service::models::{Group, NewGroup, NewPost, Post, User};
use yatube_service::services::{FeedComposer, FeedSettings};

pub const TEST_SECRET: &str = "integration-test-secret";
pub const LOGIN_URL: &str = "/auth/login/";
pub const POSTS_IN_PAGE: usize = 10;

pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub cache: Arc<MemoryPageCache>,
    pub keys: Arc<JwtKeys>,
    pub site: SiteSettings,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            cache: Arc::new(MemoryPageCache::new()),
            keys: Arc::new(JwtKeys::from_secret(TEST_SECRET)),
            site: SiteSettings {
                login_url: LOGIN_URL.to_string(),
                feed: FeedSettings {
                    page_size: POSTS_IN_PAGE,
                    index_ttl: Duration::from_secs(20),
                },
            },
        }
    }

    pub async fn app(
        &self,
    ) -> impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>
    {
        let store: Arc<dyn Store> = self.store.clone();
        let cache: Arc<dyn PageCache> = self.cache.clone();

        test::init_service(
            App::new()
                .app_data(web::Data::new(store))
                .app_data(web::Data::new(cache))
                .app_data(web::Data::new(self.site.clone()))
                .wrap(IdentityMiddleware::new(self.keys.clone()))
                .configure(handlers::configure),
        )
        .await
    }

    pub fn feed(&self) -> FeedComposer {
        FeedComposer::new(self.store.clone(), self.cache.clone(), self.site.feed)
    }

    /// Registered user plus a bearer token for it
    pub async fn user(&self, username: &str) -> (User, String) {
        let user = self
            .store
            .upsert_user(Uuid::new_v4(), username)
            .await
            .expect("failed to create user");
        let token = self
            .keys
            .issue(user.id, &user.username, chrono::Duration::hours(1))
            .expect("failed to issue token");
        (user, token)
    }

    pub async fn group(&self, slug: &str) -> Group {
        self.store
            .create_group(NewGroup {
                slug: slug.to_string(),
                title: format!("Тестовая группа {}", slug),
                description: "Тестовое описание".to_string(),
            })
            .await
            .expect("failed to create group")
    }

    pub async fn post(&self, author: &User, text: &str, group: Option<&Group>) -> Post {
        self.store
            .insert_post(NewPost {
                author_id: author.id,
                text: text.to_string(),
                group_id: group.map(|g| g.id),
                image: None,
            })
            .await
            .expect("failed to create post")
    }
}

pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

pub fn location(resp: &ServiceResponse) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub fn login_redirect_for(path: &str) -> String {
    format!("{}?next={}", LOGIN_URL, path)
}
