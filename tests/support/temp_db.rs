use std::sync::Arc;

use tempfile::TempDir;
use wagerbook::adapter::outbound::sqlite::SqliteStore;
use wagerbook::infrastructure::bootstrap;
use wagerbook::infrastructure::config::database::DatabaseConfig;

/// Temporary SQLite database, removed with its directory on drop.
pub struct TempDb {
    dir: TempDir,
    config: DatabaseConfig,
}

impl TempDb {
    pub fn create() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config = DatabaseConfig {
            url: dir.path().join("wagerbook.db").display().to_string(),
            ..DatabaseConfig::default()
        };
        Self { dir, config }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }

    /// Open a fresh store over the same file.
    pub fn store(&self) -> Arc<SqliteStore> {
        bootstrap::open_store(&self.config).expect("open sqlite store")
    }
}
