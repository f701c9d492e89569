use rand::Rng;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::error::{AppError, AppResult};
use crate::ledger::models::{BankDetails, WithdrawRequest};
use crate::ledger::LedgerRepository;
use crate::settlement::SettlementEngine;
use crate::withdrawal::EligibilityGate;

const REFERENCE_RETRY_LIMIT: u32 = 5;

/// Validates and executes a withdrawal: settle, gate, then debit the wallet
/// and create the pending request in one transaction.
pub struct WithdrawalProcessor {
    ledger: Arc<LedgerRepository>,
    settlement: Arc<SettlementEngine>,
    gate: Arc<EligibilityGate>,
    min_withdrawal: Decimal,
}

impl WithdrawalProcessor {
    pub fn new(
        ledger: Arc<LedgerRepository>,
        settlement: Arc<SettlementEngine>,
        gate: Arc<EligibilityGate>,
        config: &LedgerConfig,
    ) -> Self {
        Self {
            ledger,
            settlement,
            gate,
            min_withdrawal: config.min_withdrawal,
        }
    }

    /// The debit happens at submission time, not at admin approval. An admin
    /// later marking the request failed does not refund the wallet; that
    /// reversal is a manual reconciliation step.
    pub async fn submit_withdrawal(
        &self,
        user_id: Uuid,
        amount: Decimal,
        bank: BankDetails,
    ) -> AppResult<WithdrawRequest> {
        // A recharge that matured since the last page load must count toward
        // both the eligibility decision and the spendable balance.
        self.settlement.settle(user_id).await?;
        self.gate.check(user_id).await?.into_result()?;

        validate_amount(amount, self.min_withdrawal)?;

        let mut tx = self.ledger.begin_tx().await?;
        if !self.ledger.try_debit_wallet(&mut tx, user_id, amount).await? {
            tx.rollback().await?;
            return Err(AppError::InsufficientBalance);
        }

        let mut attempts = 0;
        let request = loop {
            let reference = generate_reference();
            match self
                .ledger
                .insert_withdraw_request(&mut tx, user_id, amount, &bank, &reference)
                .await?
            {
                Some(request) => break request,
                None => {
                    attempts += 1;
                    warn!(%user_id, attempts, "withdraw reference collision, regenerating");
                    if attempts >= REFERENCE_RETRY_LIMIT {
                        tx.rollback().await?;
                        return Err(AppError::Internal(
                            "could not generate a unique withdrawal reference".to_string(),
                        ));
                    }
                }
            }
        };
        tx.commit().await?;

        info!(%user_id, %amount, reference = %request.reference, "withdrawal submitted");
        Ok(request)
    }
}

fn validate_amount(amount: Decimal, minimum: Decimal) -> AppResult<()> {
    if amount < minimum {
        return Err(AppError::Validation(format!(
            "withdrawal amount must be at least {}",
            minimum
        )));
    }
    Ok(())
}

/// Timestamp plus a random suffix; the unique index on the column catches the
/// rare collision and the caller retries with a fresh value.
fn generate_reference() -> String {
    let suffix: u32 = rand::rng().random_range(0..1000);
    format!("WD{}{:03}", chrono::Utc::now().timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn amount_below_minimum_rejected() {
        assert!(matches!(
            validate_amount(dec!(19.99), dec!(20)),
            Err(AppError::Validation(_))
        ));
        assert!(validate_amount(dec!(20), dec!(20)).is_ok());
        assert!(validate_amount(dec!(500), dec!(20)).is_ok());
    }

    #[test]
    fn negative_amount_rejected() {
        assert!(matches!(
            validate_amount(dec!(-50), dec!(20)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn reference_has_prefix_and_suffix() {
        let reference = generate_reference();
        assert!(reference.starts_with("WD"));
        // millisecond timestamp (13 digits) plus a 3-digit suffix
        assert_eq!(reference.len(), 2 + 13 + 3);
        assert!(reference[2..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn references_differ_across_calls() {
        let a: Vec<String> = (0..32).map(|_| generate_reference()).collect();
        let mut unique = a.clone();
        unique.sort();
        unique.dedup();
        // Same millisecond is possible; the random suffix keeps them apart in
        // all but vanishingly rare cases.
        assert!(unique.len() > 1);
    }
}
