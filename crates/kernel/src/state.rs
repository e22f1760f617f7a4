//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::auth::UserDirectory;
use crate::config::Config;
use crate::content::PageService;
use crate::db;
use crate::store::{MemoryPageStore, PageStore, PgPageStore};
use crate::theme::TemplateRegistry;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,

    /// Page persistence (PostgreSQL or in-memory).
    store: Arc<dyn PageStore>,

    /// Known users and their API token hashes.
    users: UserDirectory,

    /// Page templates offered by the active theme.
    templates: Arc<TemplateRegistry>,

    /// Page CRUD on top of the store.
    pages: PageService,
}

impl AppState {
    /// Create application state from configuration.
    ///
    /// Uses PostgreSQL when `DATABASE_URL` is set and the in-memory store
    /// otherwise.
    pub async fn new(config: &Config) -> Result<Self> {
        let store: Arc<dyn PageStore> = if config.database_url.is_some() {
            let pool = db::create_pool(config).await?;
            db::run_migrations(&pool)
                .await
                .context("failed to run migrations")?;
            info!("using PostgreSQL page store");
            Arc::new(PgPageStore::new(pool))
        } else {
            info!("DATABASE_URL not set, using in-memory page store");
            Arc::new(MemoryPageStore::new())
        };

        let users = match &config.users_file {
            Some(path) => UserDirectory::load(path)?,
            None => UserDirectory::new(),
        };
        info!(count = users.len(), "user directory loaded");

        let templates = TemplateRegistry::new(Some(config.theme_dir.clone()))?;
        info!(
            dir = %config.theme_dir.display(),
            count = templates.page_templates().len(),
            "theme templates scanned"
        );

        Self::from_parts(config.clone(), store, users, templates)
    }

    /// Assemble state from ready-made parts.
    pub fn from_parts(
        config: Config,
        store: Arc<dyn PageStore>,
        users: UserDirectory,
        templates: TemplateRegistry,
    ) -> Result<Self> {
        let templates = Arc::new(templates);
        let pages = PageService::new(
            store.clone(),
            templates.clone(),
            config.site()?,
            config.limits()?,
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                users,
                templates,
                pages,
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<dyn PageStore> {
        &self.inner.store
    }

    pub fn users(&self) -> &UserDirectory {
        &self.inner.users
    }

    pub fn templates(&self) -> &Arc<TemplateRegistry> {
        &self.inner.templates
    }

    pub fn pages(&self) -> &PageService {
        &self.inner.pages
    }

    /// Check if the page store is reachable.
    pub async fn store_healthy(&self) -> bool {
        self.inner.store.healthy().await
    }
}
