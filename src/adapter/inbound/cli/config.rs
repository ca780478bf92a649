//! Handler for the `config` command group.

use std::path::Path;

use super::output;
use crate::error::Result;
use crate::infrastructure::config::Config;

/// Execute `config show`.
pub fn execute_show(config: &Config) -> Result<()> {
    if output::is_json() {
        output::data("config", config);
        return Ok(());
    }

    output::section("Engine");
    output::field("Lock timeout", format!("{}ms", config.engine.lock_timeout_ms));
    output::field(
        "Settlement timeout",
        format!("{}ms", config.engine.settlement_lock_timeout_ms),
    );
    output::field(
        "Drift policy",
        format!("{:?}", config.engine.probability_drift).to_lowercase(),
    );

    output::section("Accounts");
    output::field("Signup bonus", config.accounts.signup_bonus);
    output::field("Monthly bonus", config.accounts.monthly_bonus);

    output::section("Events");
    output::field("Backlog warning", config.events.backlog_warning);

    output::section("Database");
    output::field("Url", &config.database.url);
    output::field("Pool size", config.database.pool_size);
    output::field("Busy timeout", format!("{}ms", config.database.busy_timeout_ms));

    output::section("Logging");
    output::field("Level", &config.logging.level);
    output::field("Format", format!("{:?}", config.logging.format).to_lowercase());
    Ok(())
}

/// Execute `config check`. Fails if the file is missing or invalid.
pub fn execute_check(path: &Path) -> Result<()> {
    Config::load(path)?;
    output::success(&format!("{} is valid", path.display()));
    Ok(())
}
