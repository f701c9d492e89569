use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::error::{AppError, AppResult};
use crate::ledger::LedgerRepository;

#[derive(Debug, Clone)]
pub struct ClaimOutcome {
    pub link_id: Uuid,
    pub credited: Decimal,
}

/// Grants the fixed one-time credit per (user, review link) pair.
///
/// The unique constraint on reward_claims is the only concurrency guard: of N
/// simultaneous claims for the same pair, exactly one insert lands and gets
/// credited; the rest see a duplicate.
pub struct RewardClaimProcessor {
    ledger: Arc<LedgerRepository>,
    reward_credit: Decimal,
}

impl RewardClaimProcessor {
    pub fn new(ledger: Arc<LedgerRepository>, config: &LedgerConfig) -> Self {
        Self {
            ledger,
            reward_credit: config.reward_credit,
        }
    }

    pub async fn claim_reward(&self, user_id: Uuid, link_id: Uuid) -> AppResult<ClaimOutcome> {
        self.ledger
            .get_active_review_link(link_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("review link {}", link_id)))?;

        // Claim insert and wallet credit commit or roll back together
        let mut tx = self.ledger.begin_tx().await?;
        if !self.ledger.insert_reward_claim(&mut tx, user_id, link_id).await? {
            tx.rollback().await?;
            return Err(AppError::DuplicateClaim);
        }
        self.ledger
            .credit_wallet(&mut tx, user_id, self.reward_credit)
            .await?;
        tx.commit().await?;

        info!(%user_id, %link_id, credited = %self.reward_credit, "reward claimed");
        Ok(ClaimOutcome {
            link_id,
            credited: self.reward_credit,
        })
    }
}
