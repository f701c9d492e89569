use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, Type};
use std::fmt;
use uuid::Uuid;

/// Member account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "user_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Blocked,
}

/// Recharge lifecycle. Pending rows are the only mutable ones; completed and
/// failed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "recharge_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RechargeStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "withdraw_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WithdrawStatus {
    Pending,
    Completed,
    Failed,
}

impl fmt::Display for WithdrawStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WithdrawStatus::Pending => "pending",
            WithdrawStatus::Completed => "completed",
            WithdrawStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Member entity. Not itself financial; financial rows hang off it with
/// cascade deletes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recharge {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub payment_method: String,
    pub status: RechargeStatus,
    pub created_at: DateTime<Utc>,
}

/// Destination bank account for a withdrawal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankDetails {
    pub account_holder: String,
    pub bank_name: String,
    pub account_number: String,
    pub ifsc_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WithdrawRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub account_holder: String,
    pub bank_name: String,
    pub account_number: String,
    pub ifsc_code: String,
    pub status: WithdrawStatus,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReviewLink {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Active review link annotated with whether this member already claimed it
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReviewLinkView {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub claimed: bool,
}

/// The timestamps the eligibility gate decides from
#[derive(Debug, Clone, Default)]
pub struct WithdrawHistory {
    pub last_completed_recharge_at: Option<DateTime<Utc>>,
    pub last_withdrawal_at: Option<DateTime<Utc>>,
    /// True when some withdrawal was created strictly after the most recent
    /// completed recharge
    pub withdrawal_since_recharge: bool,
}
