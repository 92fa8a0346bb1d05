//! Prometheus metrics for yatube-service.
//!
//! Exposes feed and content collectors and an HTTP handler for the `/metrics` endpoint.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

lazy_static! {
    /// Index page cache events (hit/miss/error).
    pub static ref INDEX_CACHE_EVENTS: IntCounterVec = register_int_counter_vec!(
        "yatube_index_cache_events_total",
        "Index page cache lookups segmented by outcome",
        &["event"]
    )
    .expect("failed to register yatube_index_cache_events_total");

    /// Index page cache write results (success/error).
    pub static ref INDEX_CACHE_WRITE_TOTAL: IntCounterVec = register_int_counter_vec!(
        "yatube_index_cache_write_total",
        "Index page cache write attempts segmented by outcome",
        &["result"]
    )
    .expect("failed to register yatube_index_cache_write_total");

    /// Feed pages served per scope (index/group/profile/follow).
    pub static ref FEED_PAGES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "yatube_feed_pages_total",
        "Feed pages composed segmented by scope",
        &["scope"]
    )
    .expect("failed to register yatube_feed_pages_total");

    /// Content mutations (post_created/post_edited/comment_created).
    pub static ref CONTENT_MUTATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "yatube_content_mutations_total",
        "Accepted content mutations segmented by kind",
        &["kind"]
    )
    .expect("failed to register yatube_content_mutations_total");

    /// Follow graph changes (followed/unfollowed).
    pub static ref FOLLOW_CHANGES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "yatube_follow_changes_total",
        "Follow edges created or removed",
        &["change"]
    )
    .expect("failed to register yatube_follow_changes_total");
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
