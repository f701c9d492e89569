// Lazy settlement: there is no background scheduler. Every financial read or
// write path calls settle() for the user first, so matured pending recharges
// fold into the wallet before any balance-dependent decision is made.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::error::{AppError, AppResult};
use crate::ledger::models::RechargeStatus;
use crate::ledger::LedgerRepository;

/// Direction of an admin bulk resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RechargeResolution {
    Completed,
    Failed,
}

/// Outcome of an admin reconciliation pass
#[derive(Debug, Clone)]
pub struct ResolvedBatch {
    pub count: u64,
    pub credited: Decimal,
}

pub struct SettlementEngine {
    ledger: Arc<LedgerRepository>,
    maturation_delay: Duration,
}

impl SettlementEngine {
    pub fn new(ledger: Arc<LedgerRepository>, config: &LedgerConfig) -> Self {
        Self {
            ledger,
            maturation_delay: config.maturation_delay,
        }
    }

    /// Folds the user's matured pending recharges into the wallet balance.
    /// Returns the amount credited (zero when nothing was eligible).
    ///
    /// Safe to call concurrently for the same user: the FOR UPDATE lock on the
    /// pending rows means one caller performs the fold while the others block
    /// and then observe zero eligible rows. Any error rolls back the whole
    /// transaction, so a retry on the next request starts clean.
    pub async fn settle(&self, user_id: Uuid) -> AppResult<Decimal> {
        let cutoff = maturation_cutoff(Utc::now(), self.maturation_delay);

        let mut tx = self.ledger.begin_tx().await?;
        let matured = self
            .ledger
            .lock_matured_pending_recharges(&mut tx, user_id, cutoff)
            .await?;

        if matured.is_empty() {
            tx.commit().await?;
            return Ok(Decimal::ZERO);
        }

        let total: Decimal = matured.iter().map(|r| r.amount).sum();
        let recharge_ids: Vec<Uuid> = matured.iter().map(|r| r.id).collect();

        self.ledger
            .mark_recharges(&mut tx, &recharge_ids, RechargeStatus::Completed)
            .await?;
        self.ledger.credit_wallet(&mut tx, user_id, total).await?;
        tx.commit().await?;

        info!(%user_id, %total, count = recharge_ids.len(), "settled matured recharges");
        Ok(total)
    }

    /// Admin reconciliation: transitions ALL of the user's pending recharges
    /// to the given status regardless of maturation, crediting the wallet only
    /// on completion. Shares the locked-transaction shape of settle().
    pub async fn resolve_pending_recharges(
        &self,
        user_id: Uuid,
        resolution: RechargeResolution,
    ) -> AppResult<ResolvedBatch> {
        let mut tx = self.ledger.begin_tx().await?;
        let pending = self.ledger.lock_pending_recharges(&mut tx, user_id).await?;

        if pending.is_empty() {
            tx.rollback().await?;
            return Err(AppError::NoPendingRecharges);
        }

        let total: Decimal = pending.iter().map(|r| r.amount).sum();
        let recharge_ids: Vec<Uuid> = pending.iter().map(|r| r.id).collect();

        let (status, credited) = match resolution {
            RechargeResolution::Completed => (RechargeStatus::Completed, total),
            RechargeResolution::Failed => (RechargeStatus::Failed, Decimal::ZERO),
        };

        let count = self
            .ledger
            .mark_recharges(&mut tx, &recharge_ids, status)
            .await?;
        if credited > Decimal::ZERO {
            self.ledger.credit_wallet(&mut tx, user_id, credited).await?;
        }
        tx.commit().await?;

        info!(%user_id, ?resolution, count, %credited, "resolved pending recharges");
        Ok(ResolvedBatch { count, credited })
    }
}

/// A recharge created at or before this instant is eligible for settlement
pub fn maturation_cutoff(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    now - delay
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, h, m, s).unwrap()
    }

    #[test]
    fn recharge_matures_only_after_full_delay() {
        let delay = Duration::minutes(2);
        let created = at(12, 0, 0);

        // One second short of the delay: not yet matured
        let cutoff = maturation_cutoff(at(12, 1, 59), delay);
        assert!(created > cutoff);

        // One second past the delay: matured
        let cutoff = maturation_cutoff(at(12, 2, 1), delay);
        assert!(created <= cutoff);
    }

    #[test]
    fn recharge_matures_exactly_at_boundary() {
        let delay = Duration::minutes(2);
        let created = at(12, 0, 0);
        let cutoff = maturation_cutoff(at(12, 2, 0), delay);
        assert!(created <= cutoff);
    }
}
