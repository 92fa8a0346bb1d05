/// HTTP handlers for yatube-service
///
/// This module contains handlers for:
/// - Feeds: index (cached), group, profile and followed-authors pages
/// - Posts: detail view, create/edit forms and comments
/// - Follow: follow/unfollow an author
/// - Pages: static about pages and the not-found document
/// - Health: liveness and store readiness
///
/// Every view responds with its JSON context. Anonymous callers of
/// protected views are redirected to the login route.
pub mod feed;
pub mod follow;
pub mod health;
pub mod pages;
pub mod posts;

use crate::cache::PageCache;
use crate::config::Config;
use crate::db::Store;
use crate::services::{FeedComposer, FeedSettings};
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use std::sync::Arc;
use std::time::Duration;

/// Site-wide view settings shared by all handlers
#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub login_url: String,
    pub feed: FeedSettings,
}

impl SiteSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            login_url: config.auth.login_url.clone(),
            feed: FeedSettings {
                page_size: config.feed.posts_in_page,
                index_ttl: Duration::from_secs(config.cache.index_ttl_secs),
            },
        }
    }
}

pub(crate) fn feed_composer(
    store: &web::Data<Arc<dyn Store>>,
    cache: &web::Data<Arc<dyn PageCache>>,
    site: &SiteSettings,
) -> FeedComposer {
    FeedComposer::new(store.get_ref().clone(), cache.get_ref().clone(), site.feed)
}

pub fn profile_url(username: &str) -> String {
    format!("/profile/{}/", username)
}

pub fn post_url(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

pub(crate) fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// Login location carrying the requested path in `next`, slashes kept literal
pub fn login_location(login_url: &str, next: &str) -> String {
    let next = urlencoding::encode(next).replace("%2F", "/");
    format!("{}?next={}", login_url, next)
}

pub(crate) fn login_redirect(req: &HttpRequest, site: &SiteSettings) -> HttpResponse {
    let next = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| req.path());
    redirect(&login_location(&site.login_url, next))
}

/// Register all yatube routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(feed::index))
        .route("/group/{slug}/", web::get().to(feed::group_posts))
        .route("/profile/{username}/", web::get().to(feed::profile))
        .route("/profile/{username}/follow/", web::get().to(follow::profile_follow))
        .route(
            "/profile/{username}/unfollow/",
            web::get().to(follow::profile_unfollow),
        )
        .route("/follow/", web::get().to(feed::follow_index))
        .service(
            web::resource("/create/")
                .route(web::get().to(posts::create_form))
                .route(web::post().to(posts::create_post)),
        )
        .route("/posts/{post_id}/", web::get().to(posts::post_detail))
        .service(
            web::resource("/posts/{post_id}/edit/")
                .route(web::get().to(posts::edit_form))
                .route(web::post().to(posts::edit_post)),
        )
        .route("/posts/{post_id}/comment/", web::post().to(posts::add_comment))
        .route("/about/author/", web::get().to(pages::about_author))
        .route("/about/tech/", web::get().to(pages::about_tech))
        .route("/health", web::get().to(health::liveness))
        .route("/health/ready", web::get().to(health::readiness))
        .route("/metrics", web::get().to(crate::metrics::serve_metrics))
        .default_service(web::to(pages::not_found));
}
