//! On-demand consistency checks.

use tracing::info;

use super::engine::Engine;
use crate::domain::{AuditReport, MarketId};
use crate::error::Result;

impl Engine {
    /// Verify pool conservation and counters for one market.
    ///
    /// A failing market is halted and every later mutation on it is refused.
    ///
    /// # Errors
    ///
    /// Returns `InconsistentState` if the market is (or becomes) halted,
    /// `MarketNotFound`, or `Contention`.
    pub fn audit_market(&self, market_id: &MarketId) -> Result<AuditReport> {
        let handle = self.market_handle(market_id)?;
        let mut ledger =
            self.lock_market(&handle, market_id, self.settings.settlement_lock_timeout)?;
        let report = self.verify(&mut ledger)?;
        info!(
            market_id = %market_id,
            wagers = report.wager_count,
            probability_sum = report.probability_sum,
            "market audit passed"
        );
        Ok(report)
    }

    /// Audit every market, returning each result.
    pub fn audit_all(&self) -> Vec<(MarketId, Result<AuditReport>)> {
        self.market_ids()
            .into_iter()
            .map(|id| {
                let result = self.audit_market(&id);
                (id, result)
            })
            .collect()
    }
}
