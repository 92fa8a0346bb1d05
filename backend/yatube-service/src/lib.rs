/// Yatube Service Library
///
/// Blog-style posts service: users publish text posts (optionally with an
/// image reference and a group), comment on posts and follow other authors
/// to get a personalized feed.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers and route table
/// - `models`: Users, groups, posts, comments, follows and pages
/// - `services`: Feed composition, post/comment mutations, follow graph
/// - `db`: Entity store trait with PostgreSQL and in-memory backends
/// - `cache`: Page cache port with Redis and in-memory backends
/// - `middleware`: Identity extraction from bearer tokens
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Prometheus collectors
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};
