//! Handler for `wagerbook audit`.

use super::output;
use crate::error::{LedgerError, Result};
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::Config;

/// Execute `audit`.
///
/// Restoring the engine audits every market and halts any that fail, so
/// this command can change `halted_reason` in the database.
pub fn execute(config: &Config) -> Result<()> {
    let store = bootstrap::open_store(&config.database)?;
    let runtime = bootstrap::restore_engine(config, store)?;
    let failed = runtime
        .reports
        .iter()
        .filter(|r| !r.is_consistent())
        .count();

    if output::is_json() {
        output::data("audit", &runtime.reports);
    } else {
        output::section("Audit");
        for report in &runtime.reports {
            if report.is_consistent() {
                output::success(&format!(
                    "{}: {} wagers, {} bettors",
                    report.market_id, report.wager_count, report.distinct_bettors
                ));
            } else {
                output::error(&format!(
                    "{}: {}",
                    report.market_id,
                    report.violations.join("; ")
                ));
            }
        }
        output::field("Markets", runtime.reports.len());
        output::field("Failed", failed);
    }

    match runtime.reports.iter().find(|r| !r.is_consistent()) {
        Some(report) => Err(LedgerError::InconsistentState {
            market_id: report.market_id.clone(),
            reason: report.violations.join("; "),
        }
        .into()),
        None => Ok(()),
    }
}
