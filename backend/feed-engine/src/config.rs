use crate::error::{FeedError, FeedResult};
use serde::Deserialize;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedEngineConfig {
    pub app: AppConfig,
    #[serde(default)]
    pub cache: FeedCacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_env")]
    pub env: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Materialized feed cache. Off unless explicitly enabled.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedCacheConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Users whose feeds may be held at once
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env: default_app_env(),
            log_level: default_log_level(),
        }
    }
}

impl Default for FeedCacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_entries: default_cache_max_entries(),
        }
    }
}

impl FeedEngineConfig {
    pub fn from_env() -> FeedResult<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            app: AppConfig {
                env: env::var("APP_ENV").unwrap_or_else(|_| default_app_env()),
                log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| default_log_level()),
            },
            cache: FeedCacheConfig {
                enabled: parse_var("FEED_CACHE_ENABLED", false)?,
                max_entries: parse_var("FEED_CACHE_MAX_ENTRIES", default_cache_max_entries())?,
            },
        })
    }

    /// Config with the feed cache switched on.
    pub fn with_cache(max_entries: usize) -> Self {
        Self {
            cache: FeedCacheConfig {
                enabled: true,
                max_entries,
            },
            ..Self::default()
        }
    }
}

fn parse_var<T>(key: &str, default: T) -> FeedResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| FeedError::Config(format!("{key} must be valid: {e}"))),
        Err(_) => Ok(default),
    }
}

fn default_app_env() -> String {
    "development".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_cache_max_entries() -> usize {
    100_000
}
