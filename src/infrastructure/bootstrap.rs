//! Infrastructure bootstrap helpers for runtime wiring.

use std::sync::Arc;

use tracing::{info, warn};

use crate::adapter::outbound::badge::BadgeTracker;
use crate::adapter::outbound::notifier::{LogNotifier, NotifierRegistry};
use crate::adapter::outbound::sqlite::{create_pool, run_migrations, SqliteStore};
use crate::application::event::{self, EventReceiver};
use crate::application::{Engine, EngineSettings};
use crate::domain::AuditReport;
use crate::error::Result;
use crate::infrastructure::config::database::DatabaseConfig;
use crate::infrastructure::config::settings::Config;
use crate::port::LedgerStore;

/// Open the SQLite database and apply pending migrations.
///
/// # Errors
///
/// Returns an error if the pool cannot be created or migrations fail.
pub fn open_store(database: &DatabaseConfig) -> Result<Arc<SqliteStore>> {
    let pool = create_pool(&database.url, database.pool_size, database.busy_timeout())?;
    run_migrations(&pool)?;
    info!(url = %database.url, pool_size = database.pool_size, "database ready");
    Ok(Arc::new(SqliteStore::new(pool)))
}

/// Build the notifier registry every dispatcher forwards to.
#[must_use]
pub fn build_notifier_registry(badges: Option<Arc<BadgeTracker>>) -> NotifierRegistry {
    let mut registry = NotifierRegistry::new();
    registry.register(Box::new(LogNotifier));
    if let Some(badges) = badges {
        registry.register(Box::new(badges));
    }
    registry
}

/// A restored engine plus the receiving end of its event queue.
pub struct Runtime {
    pub engine: Engine,
    pub events: EventReceiver,
    /// Audit of every market found in the store.
    pub reports: Vec<AuditReport>,
}

/// Restore an engine from `store`, configured from `config`.
///
/// # Errors
///
/// Returns an error if the store cannot be loaded.
pub fn restore_engine(config: &Config, store: Arc<dyn LedgerStore>) -> Result<Runtime> {
    let (tx, rx) = event::channel(config.events.backlog_warning);
    let (engine, reports) = Engine::restore(EngineSettings::from(config), store, tx)?;
    let halted = reports.iter().filter(|r| !r.is_consistent()).count();
    if halted > 0 {
        warn!(halted, "markets failed audit on restore");
    }
    Ok(Runtime {
        engine,
        events: rx,
        reports,
    })
}
