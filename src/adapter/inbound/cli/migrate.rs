//! Handler for `wagerbook migrate`.

use super::output;
use crate::error::Result;
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::Config;

/// Execute `migrate`.
pub fn execute(config: &Config) -> Result<()> {
    bootstrap::open_store(&config.database)?;

    if output::is_json() {
        output::data(
            "migrate",
            &serde_json::json!({ "database": config.database.url, "status": "ok" }),
        );
        return Ok(());
    }
    output::success("Migrations applied");
    output::field("Database", &config.database.url);
    Ok(())
}
