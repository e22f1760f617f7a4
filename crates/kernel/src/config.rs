//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::FixedOffset;

use crate::content::{PaginationLimits, SiteInfo};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// PostgreSQL connection URL. When None, pages live in memory.
    pub database_url: Option<String>,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Public site URL used for links, guids and REST URLs.
    pub site_url: String,

    /// Site timezone as minutes east of UTC (default: 0).
    pub gmt_offset_minutes: i32,

    /// Active theme directory scanned for page templates (default: ./theme).
    pub theme_dir: PathBuf,

    /// TOML file listing users, roles and API token hashes.
    pub users_file: Option<PathBuf>,

    /// CORS allowed origins (comma-separated, default: "*").
    pub cors_allowed_origins: Vec<String>,

    /// Page size used when `per_page` is absent (default: 10).
    pub default_per_page: u64,

    /// Largest accepted `per_page` (default: 100).
    pub max_per_page: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: None,
            database_max_connections: 10,
            site_url: "http://localhost:3000".to_string(),
            gmt_offset_minutes: 0,
            theme_dir: PathBuf::from("./theme"),
            users_file: None,
            cors_allowed_origins: vec!["*".to_string()],
            default_per_page: 10,
            max_per_page: 100,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let site_url = env::var("SITE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_string();

        let gmt_offset_minutes = env::var("GMT_OFFSET_MINUTES")
            .unwrap_or_else(|_| "0".to_string())
            .parse()
            .context("GMT_OFFSET_MINUTES must be a valid i32")?;

        let theme_dir = env::var("THEME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./theme"));

        let users_file = env::var("USERS_FILE").ok().map(PathBuf::from);

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|_| vec!["*".to_string()]);

        let default_per_page = env::var("DEFAULT_PER_PAGE")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DEFAULT_PER_PAGE must be a valid u64")?;

        let max_per_page = env::var("MAX_PER_PAGE")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .context("MAX_PER_PAGE must be a valid u64")?;

        let config = Self {
            port,
            database_url,
            database_max_connections,
            site_url,
            gmt_offset_minutes,
            theme_dir,
            users_file,
            cors_allowed_origins,
            default_per_page,
            max_per_page,
        };

        // Surface a bad offset or page size at startup instead of on first request.
        config.site()?;
        config.limits()?;

        Ok(config)
    }

    /// Site identity used to build links and local dates.
    pub fn site(&self) -> Result<SiteInfo> {
        let gmt_offset = FixedOffset::east_opt(self.gmt_offset_minutes * 60)
            .context("GMT_OFFSET_MINUTES is out of range")?;

        Ok(SiteInfo {
            url: self.site_url.trim_end_matches('/').to_string(),
            gmt_offset,
        })
    }

    /// Page size bounds for collection requests.
    pub fn limits(&self) -> Result<PaginationLimits> {
        anyhow::ensure!(self.max_per_page >= 1, "MAX_PER_PAGE must be at least 1");
        anyhow::ensure!(
            (1..=self.max_per_page).contains(&self.default_per_page),
            "DEFAULT_PER_PAGE must be between 1 and MAX_PER_PAGE"
        );

        Ok(PaginationLimits {
            default_per_page: self.default_per_page,
            max_per_page: self.max_per_page,
        })
    }
}
