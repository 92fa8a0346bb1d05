/// Configuration management for Yatube Service
///
/// Configuration is loaded from environment variables (a `.env` file is
/// honoured by the binary through `dotenv`).
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Entity store configuration
    pub database: DatabaseConfig,
    /// Page cache configuration
    pub cache: CacheConfig,
    /// Identity token and login redirect settings
    pub auth: AuthConfig,
    /// Feed pagination
    pub feed: FeedConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown STORE_BACKEND '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(CacheBackend::Redis),
            "memory" => Ok(CacheBackend::Memory),
            other => Err(format!("unknown CACHE_BACKEND '{}'", other)),
        }
    }
}

/// Entity store configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    /// Database URL
    pub url: String,
    /// Max connections in pool
    pub max_connections: u32,
    /// Min connections kept open
    pub min_connections: u32,
    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
    /// Apply embedded migrations on start-up
    pub run_migrations: bool,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("run_migrations", &self.run_migrations)
            .finish()
    }
}

/// Page cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Redis URL
    pub url: String,
    /// Lifetime of a cached index page
    pub index_ttl_secs: u64,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity provider
    pub jwt_secret: String,
    /// Where anonymous callers are sent, `?next=` is appended
    pub login_url: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("login_url", &self.login_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Posts per page on every feed
    pub posts_in_page: usize,
}

pub const DEFAULT_POSTS_IN_PAGE: usize = 10;
pub const DEFAULT_LOGIN_URL: &str = "/auth/login/";
const DEV_JWT_SECRET: &str = "yatube-development-secret";

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let production = app_env.eq_ignore_ascii_case("production");

        Ok(Config {
            app: AppConfig {
                env: app_env.clone(),
                host: std::env::var("YATUBE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or_default("YATUBE_PORT", 8000)?,
            },
            cors: {
                let allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
                    Ok(value) => value,
                    Err(_) if production => {
                        return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                    }
                    Err(_) => "http://localhost:3000".to_string(),
                };

                if production && allowed_origins.trim() == "*" {
                    return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
                }

                CorsConfig { allowed_origins }
            },
            database: DatabaseConfig {
                backend: parse_env_or_default("STORE_BACKEND", StoreBackend::Postgres)?,
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgresql://localhost/yatube".to_string()),
                max_connections: parse_env_or_default("DATABASE_MAX_CONNECTIONS", 10)?,
                min_connections: parse_env_or_default("DATABASE_MIN_CONNECTIONS", 1)?,
                acquire_timeout_secs: parse_env_or_default("DATABASE_ACQUIRE_TIMEOUT_SECS", 10)?,
                run_migrations: parse_env_or_default("DATABASE_RUN_MIGRATIONS", true)?,
            },
            cache: CacheConfig {
                backend: parse_env_or_default("CACHE_BACKEND", CacheBackend::Redis)?,
                url: std::env::var("REDIS_URL")
                    .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
                index_ttl_secs: parse_env_or_default("INDEX_CACHE_TTL_SECS", 20)?,
            },
            auth: AuthConfig {
                jwt_secret: match std::env::var("JWT_SECRET") {
                    Ok(secret) if !secret.trim().is_empty() => secret,
                    _ if production => {
                        return Err("JWT_SECRET must be set in production".to_string())
                    }
                    _ => DEV_JWT_SECRET.to_string(),
                },
                login_url: std::env::var("LOGIN_URL")
                    .unwrap_or_else(|_| DEFAULT_LOGIN_URL.to_string()),
            },
            feed: FeedConfig {
                posts_in_page: match parse_env_or_default("POSTS_IN_PAGE", DEFAULT_POSTS_IN_PAGE)? {
                    0 => return Err("POSTS_IN_PAGE must be greater than zero".to_string()),
                    n => n,
                },
            },
        })
    }
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "APP_ENV",
        "YATUBE_PORT",
        "CORS_ALLOWED_ORIGINS",
        "STORE_BACKEND",
        "CACHE_BACKEND",
        "JWT_SECRET",
        "POSTS_IN_PAGE",
        "INDEX_CACHE_TTL_SECS",
    ];

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = Config::from_env().unwrap();
        assert_eq!(config.app.port, 8000);
        assert_eq!(config.feed.posts_in_page, 10);
        assert_eq!(config.cache.index_ttl_secs, 20);
        assert_eq!(config.database.backend, StoreBackend::Postgres);
        assert_eq!(config.cache.backend, CacheBackend::Redis);
        assert_eq!(config.auth.login_url, "/auth/login/");
    }

    #[test]
    #[serial]
    fn test_backends_and_page_size_from_env() {
        clear_env();
        std::env::set_var("STORE_BACKEND", "memory");
        std::env::set_var("CACHE_BACKEND", "Memory");
        std::env::set_var("POSTS_IN_PAGE", "25");
        let config = Config::from_env().unwrap();
        assert_eq!(config.database.backend, StoreBackend::Memory);
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.feed.posts_in_page, 25);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_numbers_are_errors() {
        clear_env();
        std::env::set_var("YATUBE_PORT", "eighty");
        assert!(Config::from_env().is_err());
        std::env::remove_var("YATUBE_PORT");

        std::env::set_var("POSTS_IN_PAGE", "0");
        assert!(Config::from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_production_requires_secrets() {
        clear_env();
        std::env::set_var("APP_ENV", "production");
        std::env::set_var("CORS_ALLOWED_ORIGINS", "https://yatube.example");
        let err = Config::from_env().unwrap_err();
        assert!(err.contains("JWT_SECRET"));

        std::env::set_var("JWT_SECRET", "s3cret");
        std::env::set_var("CORS_ALLOWED_ORIGINS", "*");
        let err = Config::from_env().unwrap_err();
        assert!(err.contains("CORS_ALLOWED_ORIGINS"));
        clear_env();
    }

    #[test]
    fn test_secrets_are_redacted_in_debug() {
        let auth = AuthConfig {
            jwt_secret: "top-secret".into(),
            login_url: DEFAULT_LOGIN_URL.into(),
        };
        assert!(!format!("{:?}", auth).contains("top-secret"));
    }
}
