use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::ledger::models::{
    BankDetails, Recharge, RechargeStatus, ReviewLinkView, UserStatus, WithdrawRequest,
    WithdrawStatus,
};
use crate::settlement::RechargeResolution;
use crate::withdrawal::EligibilityDecision;
use crate::error::EligibilityDenied;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMemberRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 20))]
    pub phone: String,
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
}

#[derive(Debug, Serialize)]
pub struct WalletResponse {
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub settled: Decimal,
    pub withdrawals: Vec<WithdrawRequest>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    pub review_links: Vec<ReviewLinkView>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRechargeRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub payment_method: String,
}

#[derive(Debug, Serialize)]
pub struct RechargeResponse {
    pub id: Uuid,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub payment_method: String,
    pub status: RechargeStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Recharge> for RechargeResponse {
    fn from(r: Recharge) -> Self {
        Self {
            id: r.id,
            amount: r.amount,
            payment_method: r.payment_method,
            status: r.status,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitWithdrawalRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[validate(length(min = 1, max = 255))]
    pub account_holder: String,
    #[validate(length(min = 1, max = 255))]
    pub bank_name: String,
    #[validate(length(min = 1, max = 255))]
    pub account_number: String,
    #[validate(length(min = 1, max = 50))]
    pub ifsc_code: String,
}

impl SubmitWithdrawalRequest {
    pub fn bank_details(&self) -> BankDetails {
        BankDetails {
            account_holder: self.account_holder.clone(),
            bank_name: self.bank_name.clone(),
            account_number: self.account_number.clone(),
            ifsc_code: self.ifsc_code.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WithdrawalResponse {
    pub id: Uuid,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub status: WithdrawStatus,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

impl From<WithdrawRequest> for WithdrawalResponse {
    fn from(r: WithdrawRequest) -> Self {
        Self {
            id: r.id,
            amount: r.amount,
            status: r.status,
            reference: r.reference,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EligibilityResponse {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlock_at: Option<DateTime<Utc>>,
}

impl From<EligibilityDecision> for EligibilityResponse {
    fn from(decision: EligibilityDecision) -> Self {
        match decision {
            EligibilityDecision::Allowed => Self {
                allowed: true,
                reason: None,
                unlock_at: None,
            },
            EligibilityDecision::Denied(EligibilityDenied::RechargeRequired) => Self {
                allowed: false,
                reason: Some("recharge_required".to_string()),
                unlock_at: None,
            },
            EligibilityDecision::Denied(EligibilityDenied::Cooldown { unlock_at }) => Self {
                allowed: false,
                reason: Some("wait".to_string()),
                unlock_at: Some(unlock_at),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SettleResponse {
    #[serde(with = "rust_decimal::serde::float")]
    pub credited: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct ClaimRewardRequest {
    pub review_link_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ClaimRewardResponse {
    pub review_link_id: Uuid,
    #[serde(with = "rust_decimal::serde::float")]
    pub credited: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRechargesRequest {
    pub status: RechargeResolution,
}

#[derive(Debug, Serialize)]
pub struct ResolveRechargesResponse {
    pub count: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub credited: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct UpdateWithdrawStatusRequest {
    pub status: WithdrawStatus,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemberStatusRequest {
    pub status: UserStatus,
}

#[derive(Debug, Serialize)]
pub struct AdminSummaryResponse {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_withdrawn: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn eligibility_response_carries_wait_details() {
        let unlock_at = Utc.with_ymd_and_hms(2024, 6, 1, 13, 0, 0).unwrap();
        let response: EligibilityResponse =
            EligibilityDecision::Denied(EligibilityDenied::Cooldown { unlock_at }).into();

        assert!(!response.allowed);
        assert_eq!(response.reason.as_deref(), Some("wait"));
        assert_eq!(response.unlock_at, Some(unlock_at));
    }

    #[test]
    fn eligibility_response_allowed_is_bare() {
        let response: EligibilityResponse = EligibilityDecision::Allowed.into();
        assert!(response.allowed);
        assert!(response.reason.is_none());
        assert!(response.unlock_at.is_none());
    }

    #[test]
    fn resolve_status_deserializes_lowercase() {
        let request: ResolveRechargesRequest =
            serde_json::from_str(r#"{"status":"completed"}"#).unwrap();
        assert_eq!(request.status, RechargeResolution::Completed);

        let request: ResolveRechargesRequest =
            serde_json::from_str(r#"{"status":"failed"}"#).unwrap();
        assert_eq!(request.status, RechargeResolution::Failed);
    }
}
