//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;

use crate::auth::token::MAX_TOKEN_AGE_SECONDS;

/// Development-only signing secret used when none is configured.
pub const DEVELOPMENT_TOKEN_SECRET: &str = "fallback-secret-key-for-development-12345";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub feed: FeedConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 3000)
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Flat-file and media storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding users.json and posts.json
    pub data_dir: PathBuf,
    /// Directory receiving uploaded media, served under /uploads
    pub uploads_dir: PathBuf,
    /// Maximum accepted request body / media size in bytes (default: 50 MiB)
    pub max_upload_bytes: usize,
}

impl StorageConfig {
    pub fn users_path(&self) -> PathBuf {
        self.data_dir.join("users.json")
    }

    pub fn posts_path(&self) -> PathBuf {
        self.data_dir.join("posts.json")
    }
}

/// Bearer token configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC signing secret (32+ bytes)
    pub token_secret: String,
    /// Token lifetime in seconds (default: 604800 = 7 days)
    pub token_max_age: i64,
}

/// Result caps for listing and search
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Posts returned by the feed (default: 100)
    pub page_size: usize,
    /// Posts returned by a search (default: 50)
    pub post_search_limit: usize,
    /// Users returned by a search (default: 20)
    pub user_search_limit: usize,
    /// Users returned by the directory listing (default: 50)
    pub user_list_limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            post_search_limit: 50,
            user_search_limit: 20,
            user_list_limit: 50,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl LoggingConfig {
    /// Filter used when `RUST_LOG` is not set
    pub fn default_filter(&self) -> String {
        format!("microsocial={},tower_http=debug", self.level)
    }

    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl AuthConfig {
    pub fn uses_development_secret(&self) -> bool {
        self.token_secret == DEVELOPMENT_TOKEN_SECRET
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (MICROSOCIAL__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("storage.data_dir", "data")?
            .set_default("storage.uploads_dir", "uploads")?
            .set_default("storage.max_upload_bytes", 50 * 1024 * 1024)?
            .set_default("auth.token_secret", DEVELOPMENT_TOKEN_SECRET)?
            .set_default("auth.token_max_age", 604800)?
            .set_default("feed.page_size", 100)?
            .set_default("feed.post_search_limit", 50)?
            .set_default("feed.user_search_limit", 20)?
            .set_default("feed.user_list_limit", 50)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (MICROSOCIAL__*)
            .add_source(
                Environment::with_prefix("MICROSOCIAL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_TOKEN_SECRET_BYTES: usize = 32;

        if self.auth.token_secret.len() < MIN_TOKEN_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.token_secret must be at least {} bytes",
                MIN_TOKEN_SECRET_BYTES
            )));
        }

        if self.auth.token_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.token_max_age must be greater than 0".to_string(),
            ));
        }

        if self.auth.token_max_age > MAX_TOKEN_AGE_SECONDS {
            return Err(crate::error::AppError::Config(format!(
                "auth.token_max_age must be at most {} seconds",
                MAX_TOKEN_AGE_SECONDS
            )));
        }

        if self.storage.max_upload_bytes == 0 {
            return Err(crate::error::AppError::Config(
                "storage.max_upload_bytes must be greater than 0".to_string(),
            ));
        }

        if self.feed.page_size == 0
            || self.feed.post_search_limit == 0
            || self.feed.user_search_limit == 0
            || self.feed.user_list_limit == 0
        {
            return Err(crate::error::AppError::Config(
                "feed limits must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            storage: StorageConfig {
                data_dir: PathBuf::from("/tmp/microsocial-test/data"),
                uploads_dir: PathBuf::from("/tmp/microsocial-test/uploads"),
                max_upload_bytes: 50 * 1024 * 1024,
            },
            auth: AuthConfig {
                token_secret: "x".repeat(32),
                token_max_age: 604_800,
            },
            feed: FeedConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn validate_accepts_defaults() {
        let config = valid_config();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.storage.users_path(),
            PathBuf::from("/tmp/microsocial-test/data/users.json")
        );
    }

    #[test]
    fn validate_rejects_short_token_secret() {
        let mut config = valid_config();
        config.auth.token_secret = "short-secret".to_string();

        let error = config
            .validate()
            .expect_err("token secret shorter than 32 bytes must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("auth.token_secret")
        ));
    }

    #[test]
    fn validate_rejects_non_positive_token_age() {
        let mut config = valid_config();
        config.auth.token_max_age = 0;

        let error = config.validate().expect_err("zero max age must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("token_max_age")
        ));
    }

    #[test]
    fn validate_rejects_token_age_beyond_cap() {
        let mut config = valid_config();
        config.auth.token_max_age = i64::MAX;
        let error = config.validate().expect_err("unbounded max age must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message) if message.contains("at most")
        ));

        config.auth.token_max_age = MAX_TOKEN_AGE_SECONDS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn logging_settings_drive_the_subscriber() {
        let mut config = valid_config();
        config.logging.level = "debug".to_string();
        config.logging.format = "JSON".to_string();
        assert_eq!(
            config.logging.default_filter(),
            "microsocial=debug,tower_http=debug"
        );
        assert!(config.logging.is_json());

        config.logging.format = "pretty".to_string();
        assert!(!config.logging.is_json());
    }

    #[test]
    fn validate_rejects_zero_feed_limit() {
        let mut config = valid_config();
        config.feed.post_search_limit = 0;

        assert!(config.validate().is_err());
    }
}
