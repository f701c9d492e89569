use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::error::{AppResult, EligibilityDenied};
use crate::ledger::models::WithdrawHistory;
use crate::ledger::LedgerRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EligibilityDecision {
    Allowed,
    Denied(EligibilityDenied),
}

impl EligibilityDecision {
    pub fn into_result(self) -> Result<(), EligibilityDenied> {
        match self {
            EligibilityDecision::Allowed => Ok(()),
            EligibilityDecision::Denied(reason) => Err(reason),
        }
    }
}

/// Derives the withdrawal permission from recharge/withdrawal history.
///
/// Policy: each completed recharge unlocks at most one subsequent withdrawal,
/// gated by a fixed cooldown after the recharge. A second withdrawal needs a
/// new recharge. The caller must run settlement first so a just-matured
/// recharge is visible here.
pub struct EligibilityGate {
    ledger: Arc<LedgerRepository>,
    cooldown: Duration,
}

impl EligibilityGate {
    pub fn new(ledger: Arc<LedgerRepository>, config: &LedgerConfig) -> Self {
        Self {
            ledger,
            cooldown: config.withdraw_cooldown,
        }
    }

    pub async fn check(&self, user_id: Uuid) -> AppResult<EligibilityDecision> {
        let history = self.ledger.withdraw_history(user_id).await?;
        Ok(evaluate(&history, self.cooldown, Utc::now()))
    }
}

/// Pure decision function over the fetched history
pub fn evaluate(
    history: &WithdrawHistory,
    cooldown: Duration,
    now: DateTime<Utc>,
) -> EligibilityDecision {
    let Some(recharge_at) = history.last_completed_recharge_at else {
        return EligibilityDecision::Denied(EligibilityDenied::RechargeRequired);
    };

    // A withdrawal made after the latest recharge already consumed its
    // cooldown; the next one is allowed outright until a fresh recharge
    // restarts the cycle.
    if history.last_withdrawal_at.is_some() && history.withdrawal_since_recharge {
        return EligibilityDecision::Allowed;
    }

    let unlock_at = recharge_at + cooldown;
    if now < unlock_at {
        return EligibilityDecision::Denied(EligibilityDenied::Cooldown { unlock_at });
    }

    EligibilityDecision::Allowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, h, m, 0).unwrap()
    }

    fn cooldown() -> Duration {
        Duration::hours(1)
    }

    #[test]
    fn no_completed_recharge_requires_recharge() {
        let history = WithdrawHistory::default();
        assert_eq!(
            evaluate(&history, cooldown(), t(10, 0)),
            EligibilityDecision::Denied(EligibilityDenied::RechargeRequired)
        );
    }

    #[test]
    fn first_withdrawal_waits_out_cooldown() {
        let history = WithdrawHistory {
            last_completed_recharge_at: Some(t(9, 0)),
            last_withdrawal_at: None,
            withdrawal_since_recharge: false,
        };

        // One minute before the window opens
        assert_eq!(
            evaluate(&history, cooldown(), t(9, 59)),
            EligibilityDecision::Denied(EligibilityDenied::Cooldown { unlock_at: t(10, 0) })
        );

        // One minute after
        assert_eq!(
            evaluate(&history, cooldown(), t(10, 1)),
            EligibilityDecision::Allowed
        );
    }

    #[test]
    fn unlock_boundary_is_inclusive() {
        let history = WithdrawHistory {
            last_completed_recharge_at: Some(t(9, 0)),
            last_withdrawal_at: None,
            withdrawal_since_recharge: false,
        };
        assert_eq!(
            evaluate(&history, cooldown(), t(10, 0)),
            EligibilityDecision::Allowed
        );
    }

    #[test]
    fn withdrawal_after_recharge_allows_without_new_cooldown() {
        let history = WithdrawHistory {
            last_completed_recharge_at: Some(t(9, 0)),
            last_withdrawal_at: Some(t(10, 30)),
            withdrawal_since_recharge: true,
        };
        assert_eq!(
            evaluate(&history, cooldown(), t(10, 31)),
            EligibilityDecision::Allowed
        );
    }

    #[test]
    fn older_withdrawal_still_gated_by_latest_recharge() {
        // Withdrawal predates the latest recharge, so the recharge has not
        // paid for a withdrawal yet and the cooldown applies.
        let history = WithdrawHistory {
            last_completed_recharge_at: Some(t(12, 0)),
            last_withdrawal_at: Some(t(9, 0)),
            withdrawal_since_recharge: false,
        };

        assert_eq!(
            evaluate(&history, cooldown(), t(12, 30)),
            EligibilityDecision::Denied(EligibilityDenied::Cooldown { unlock_at: t(13, 0) })
        );
        assert_eq!(
            evaluate(&history, cooldown(), t(13, 30)),
            EligibilityDecision::Allowed
        );
    }
}
