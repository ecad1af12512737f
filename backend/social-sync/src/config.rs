/// Configuration management for the sync engine
///
/// Loads configuration from environment variables (and `.env` when present).
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Main engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub feed: FeedConfig,
    pub store: StoreConfig,
    /// Media host; image publishing is rejected when absent
    pub media: Option<MediaConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Posts per feed page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            other => bail!("unknown STORE_BACKEND '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Required for the postgres backend
    pub database_url: Option<String>,
    /// Change notifications; required for the postgres backend
    pub redis_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Unsigned upload endpoint
    pub upload_url: String,
    pub upload_preset: String,
    pub timeout_secs: u64,
}

fn default_page_size() -> usize {
    10
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        };

        let feed = FeedConfig {
            page_size: parse_var("FEED_PAGE_SIZE").unwrap_or_else(default_page_size),
        };
        if feed.page_size == 0 {
            bail!("FEED_PAGE_SIZE must be greater than zero");
        }

        let backend = match std::env::var("STORE_BACKEND") {
            Ok(value) => value.parse().context("invalid STORE_BACKEND")?,
            Err(_) => StoreBackend::Memory,
        };

        let store = StoreConfig {
            backend,
            database_url: std::env::var("DATABASE_URL").ok(),
            redis_url: std::env::var("REDIS_URL").ok(),
            max_connections: parse_var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(default_max_connections),
            min_connections: parse_var("DB_MIN_CONNECTIONS")
                .unwrap_or_else(default_min_connections),
        };
        if store.backend == StoreBackend::Postgres {
            store
                .database_url
                .as_ref()
                .context("DATABASE_URL environment variable not set")?;
            store
                .redis_url
                .as_ref()
                .context("REDIS_URL environment variable not set")?;
        }

        let media = match std::env::var("MEDIA_UPLOAD_URL") {
            Ok(upload_url) => Some(MediaConfig {
                upload_url,
                upload_preset: std::env::var("MEDIA_UPLOAD_PRESET")
                    .context("MEDIA_UPLOAD_PRESET environment variable not set")?,
                timeout_secs: parse_var("MEDIA_TIMEOUT_SECS").unwrap_or(30),
            }),
            Err(_) => None,
        };

        Ok(Config {
            app,
            feed,
            store,
            media,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "APP_ENV",
        "FEED_PAGE_SIZE",
        "STORE_BACKEND",
        "DATABASE_URL",
        "REDIS_URL",
        "DB_MAX_CONNECTIONS",
        "DB_MIN_CONNECTIONS",
        "MEDIA_UPLOAD_URL",
        "MEDIA_UPLOAD_PRESET",
        "MEDIA_TIMEOUT_SECS",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_default_values() {
        clear_env();

        let config = Config::from_env().unwrap();

        assert_eq!(config.app.env, "development");
        assert_eq!(config.feed.page_size, 10);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.max_connections, 10);
        assert!(config.media.is_none());
    }

    #[test]
    #[serial]
    fn test_postgres_requires_urls() {
        clear_env();
        std::env::set_var("STORE_BACKEND", "postgres");
        std::env::set_var("DATABASE_URL", "postgres://localhost/konnekt");

        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("REDIS_URL"));

        std::env::set_var("REDIS_URL", "redis://localhost:6379");
        let config = Config::from_env().unwrap();
        assert_eq!(config.store.backend, StoreBackend::Postgres);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_page_size_and_media() {
        clear_env();
        std::env::set_var("FEED_PAGE_SIZE", "25");
        std::env::set_var("MEDIA_UPLOAD_URL", "https://media.example/upload");
        std::env::set_var("MEDIA_UPLOAD_PRESET", "konnekt");

        let config = Config::from_env().unwrap();
        assert_eq!(config.feed.page_size, 25);
        let media = config.media.unwrap();
        assert_eq!(media.upload_preset, "konnekt");
        assert_eq!(media.timeout_secs, 30);

        std::env::set_var("FEED_PAGE_SIZE", "0");
        assert!(Config::from_env().is_err());

        clear_env();
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("Memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert_eq!(
            "postgresql".parse::<StoreBackend>().unwrap(),
            StoreBackend::Postgres
        );
        assert!("mongo".parse::<StoreBackend>().is_err());
    }
}
