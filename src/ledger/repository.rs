use super::models::*;
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Ledger repository - THE source of truth for all financial state.
///
/// Every balance mutation goes through here inside a transaction that locks
/// the rows it reads, so concurrent settlement, withdrawal and reconciliation
/// calls for the same user serialize instead of losing updates.
pub struct LedgerRepository {
    pub pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn begin_tx(&self) -> AppResult<Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await?)
    }

    // ========== USER OPERATIONS ==========

    pub async fn create_user(&self, name: &str, email: &str, phone: &str) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, phone)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, phone, status, created_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(phone)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Validation("email already registered".to_string())
            }
            _ => AppError::Database(e),
        })?;

        Ok(user)
    }

    pub async fn get_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, phone, status, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn set_user_status(&self, user_id: Uuid, status: UserStatus) -> AppResult<()> {
        let result = sqlx::query("UPDATE users SET status = $2 WHERE id = $1")
            .bind(user_id)
            .bind(status)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("user {}", user_id)));
        }
        Ok(())
    }

    /// Removes the user and, through cascade, every financial row owned by them
    pub async fn delete_user(&self, user_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("user {}", user_id)));
        }
        Ok(())
    }

    // ========== WALLET OPERATIONS ==========

    /// Creates the wallet row if missing. An existing balance is never touched,
    /// so calling this on every login is harmless.
    pub async fn ensure_wallet(&self, user_id: Uuid, opening_balance: Decimal) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO wallets (user_id, balance)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(opening_balance)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_balance(&self, user_id: Uuid) -> AppResult<Decimal> {
        let balance: Option<Decimal> =
            sqlx::query_scalar("SELECT balance FROM wallets WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(balance.unwrap_or(Decimal::ZERO))
    }

    /// Upsert-add onto the wallet balance inside an open transaction
    pub async fn credit_wallet(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        amount: Decimal,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO wallets (user_id, balance)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET balance = wallets.balance + EXCLUDED.balance, updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Debit guarded by the current balance; returns false when the wallet
    /// cannot cover the amount. The guard re-reads balance atomically, so a
    /// stale session snapshot can never overdraw.
    pub async fn try_debit_wallet(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        amount: Decimal,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE wallets
            SET balance = balance - $2, updated_at = NOW()
            WHERE user_id = $1 AND balance >= $2
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // ========== RECHARGE OPERATIONS ==========

    pub async fn create_recharge(
        &self,
        user_id: Uuid,
        amount: Decimal,
        payment_method: &str,
    ) -> AppResult<Recharge> {
        let recharge = sqlx::query_as::<_, Recharge>(
            r#"
            INSERT INTO recharges (user_id, amount, payment_method, status)
            VALUES ($1, $2, $3, 'pending')
            RETURNING id, user_id, amount, payment_method, status, created_at
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .bind(payment_method)
        .fetch_one(&self.pool)
        .await?;

        Ok(recharge)
    }

    /// Locks the user's pending recharges created at or before `matured_before`.
    /// The row lock is what serializes concurrent settlement attempts: a second
    /// caller blocks here, then sees the rows already completed.
    pub async fn lock_matured_pending_recharges(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        matured_before: DateTime<Utc>,
    ) -> AppResult<Vec<Recharge>> {
        let rows = sqlx::query_as::<_, Recharge>(
            r#"
            SELECT id, user_id, amount, payment_method, status, created_at
            FROM recharges
            WHERE user_id = $1 AND status = 'pending' AND created_at <= $2
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(matured_before)
        .fetch_all(&mut **tx)
        .await?;

        Ok(rows)
    }

    /// Locks all pending recharges regardless of age (admin reconciliation path)
    pub async fn lock_pending_recharges(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
    ) -> AppResult<Vec<Recharge>> {
        let rows = sqlx::query_as::<_, Recharge>(
            r#"
            SELECT id, user_id, amount, payment_method, status, created_at
            FROM recharges
            WHERE user_id = $1 AND status = 'pending'
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut **tx)
        .await?;

        Ok(rows)
    }

    pub async fn mark_recharges(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        recharge_ids: &[Uuid],
        status: RechargeStatus,
    ) -> AppResult<u64> {
        let result = sqlx::query("UPDATE recharges SET status = $1 WHERE id = ANY($2)")
            .bind(status)
            .bind(recharge_ids)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn recent_recharges(&self, user_id: Uuid, limit: i64) -> AppResult<Vec<Recharge>> {
        let rows = sqlx::query_as::<_, Recharge>(
            r#"
            SELECT id, user_id, amount, payment_method, status, created_at
            FROM recharges
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Gathers the timestamps the eligibility gate decides from. Plain reads;
    /// the gate is always preceded by a settlement pass so a just-matured
    /// recharge is already visible as completed.
    pub async fn withdraw_history(&self, user_id: Uuid) -> AppResult<WithdrawHistory> {
        let last_completed_recharge_at: Option<DateTime<Utc>> = sqlx::query_scalar(
            r#"
            SELECT created_at
            FROM recharges
            WHERE user_id = $1 AND status = 'completed'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let last_withdrawal_at: Option<DateTime<Utc>> = sqlx::query_scalar(
            r#"
            SELECT created_at
            FROM withdraw_requests
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let withdrawal_since_recharge = match last_completed_recharge_at {
            Some(recharge_at) => sqlx::query_scalar::<_, bool>(
                r#"
                SELECT EXISTS (
                    SELECT 1 FROM withdraw_requests
                    WHERE user_id = $1 AND created_at > $2
                )
                "#,
            )
            .bind(user_id)
            .bind(recharge_at)
            .fetch_one(&self.pool)
            .await?,
            None => false,
        };

        Ok(WithdrawHistory {
            last_completed_recharge_at,
            last_withdrawal_at,
            withdrawal_since_recharge,
        })
    }

    // ========== WITHDRAWAL OPERATIONS ==========

    /// Inserts the request row inside the debit transaction. Returns None when
    /// the generated reference collided, letting the caller retry with a fresh
    /// one.
    pub async fn insert_withdraw_request(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        amount: Decimal,
        bank: &BankDetails,
        reference: &str,
    ) -> AppResult<Option<WithdrawRequest>> {
        let result = sqlx::query_as::<_, WithdrawRequest>(
            r#"
            INSERT INTO withdraw_requests
                (user_id, amount, account_holder, bank_name, account_number, ifsc_code, status, reference)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7)
            RETURNING id, user_id, amount, account_holder, bank_name, account_number,
                      ifsc_code, status, reference, created_at
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .bind(&bank.account_holder)
        .bind(&bank.bank_name)
        .bind(&bank.account_number)
        .bind(&bank.ifsc_code)
        .bind(reference)
        .fetch_one(&mut **tx)
        .await;

        match result {
            Ok(request) => Ok(Some(request)),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn recent_withdrawals(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> AppResult<Vec<WithdrawRequest>> {
        let rows = sqlx::query_as::<_, WithdrawRequest>(
            r#"
            SELECT id, user_id, amount, account_holder, bank_name, account_number,
                   ifsc_code, status, reference, created_at
            FROM withdraw_requests
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn pending_withdraw_requests(&self) -> AppResult<Vec<WithdrawRequest>> {
        let rows = sqlx::query_as::<_, WithdrawRequest>(
            r#"
            SELECT id, user_id, amount, account_holder, bank_name, account_number,
                   ifsc_code, status, reference, created_at
            FROM withdraw_requests
            WHERE status = 'pending'
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn get_withdraw_request(&self, request_id: Uuid) -> AppResult<Option<WithdrawRequest>> {
        let request = sqlx::query_as::<_, WithdrawRequest>(
            r#"
            SELECT id, user_id, amount, account_holder, bank_name, account_number,
                   ifsc_code, status, reference, created_at
            FROM withdraw_requests
            WHERE id = $1
            "#,
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    /// Admin disposition of a request. Marking a request failed does NOT
    /// refund the debited balance; reversal is a manual ledger step.
    pub async fn update_withdraw_status(
        &self,
        request_id: Uuid,
        status: WithdrawStatus,
    ) -> AppResult<()> {
        let result = sqlx::query("UPDATE withdraw_requests SET status = $2 WHERE id = $1")
            .bind(request_id)
            .bind(status)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("withdraw request {}", request_id)));
        }
        Ok(())
    }

    /// Cross-user aggregate for the admin dashboard; unlocked read, eventual
    /// consistency is fine here.
    pub async fn total_withdrawn(&self) -> AppResult<Decimal> {
        let total: Option<Decimal> = sqlx::query_scalar(
            "SELECT SUM(amount) FROM withdraw_requests WHERE status = 'completed'",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or(Decimal::ZERO))
    }

    // ========== REWARD OPERATIONS ==========

    pub async fn get_active_review_link(&self, link_id: Uuid) -> AppResult<Option<ReviewLink>> {
        let link = sqlx::query_as::<_, ReviewLink>(
            r#"
            SELECT id, title, url, is_active, created_at
            FROM review_links
            WHERE id = $1 AND is_active
            "#,
        )
        .bind(link_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(link)
    }

    /// Returns false when the (user, link) pair already exists. The unique
    /// constraint makes exactly one of N concurrent inserts win.
    pub async fn insert_reward_claim(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        link_id: Uuid,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO reward_claims (user_id, review_link_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, review_link_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(link_id)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn active_links_for_user(&self, user_id: Uuid) -> AppResult<Vec<ReviewLinkView>> {
        let rows = sqlx::query_as::<_, ReviewLinkView>(
            r#"
            SELECT rl.id, rl.title, rl.url, (rc.user_id IS NOT NULL) AS claimed
            FROM review_links rl
            LEFT JOIN reward_claims rc
              ON rc.review_link_id = rl.id AND rc.user_id = $1
            WHERE rl.is_active
            ORDER BY rl.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
