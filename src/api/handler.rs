use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::models::*;
use crate::{
    config::LedgerConfig,
    error::{AppError, AppResult},
    ledger::LedgerRepository,
    middleware::{AdminIdentity, MemberIdentity},
    rewards::RewardClaimProcessor,
    settlement::SettlementEngine,
    withdrawal::{EligibilityGate, WithdrawalProcessor},
};

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerRepository>,
    pub settlement: Arc<SettlementEngine>,
    pub eligibility: Arc<EligibilityGate>,
    pub withdrawals: Arc<WithdrawalProcessor>,
    pub rewards: Arc<RewardClaimProcessor>,
    pub ledger_config: LedgerConfig,
}

/// GET /health
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Registration hook for the external auth layer: creates the member row and
/// the wallet with the signup grant.
/// POST /members
pub async fn create_member(
    State(state): State<AppState>,
    Json(request): Json<CreateMemberRequest>,
) -> AppResult<Json<MemberResponse>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let user = state
        .ledger
        .create_user(&request.name, &request.email, &request.phone)
        .await?;
    state
        .ledger
        .ensure_wallet(user.id, state.ledger_config.signup_grant)
        .await?;
    let balance = state.ledger.get_balance(user.id).await?;

    info!(user_id = %user.id, "member registered");
    Ok(Json(MemberResponse {
        user_id: user.id,
        name: user.name,
        email: user.email,
        balance,
    }))
}

/// GET /profile
pub async fn get_profile(
    State(state): State<AppState>,
    member: MemberIdentity,
) -> AppResult<Json<MemberResponse>> {
    let user = state
        .ledger
        .get_user(member.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", member.user_id)))?;

    state.settlement.settle(user.id).await?;
    let balance = state.ledger.get_balance(user.id).await?;

    Ok(Json(MemberResponse {
        user_id: user.id,
        name: user.name,
        email: user.email,
        balance,
    }))
}

/// GET /wallet
pub async fn get_wallet(
    State(state): State<AppState>,
    member: MemberIdentity,
) -> AppResult<Json<WalletResponse>> {
    let settled = state.settlement.settle(member.user_id).await?;
    let balance = state.ledger.get_balance(member.user_id).await?;
    let withdrawals = state.ledger.recent_withdrawals(member.user_id, 10).await?;

    Ok(Json(WalletResponse {
        balance,
        settled,
        withdrawals,
    }))
}

/// GET /dashboard
pub async fn get_dashboard(
    State(state): State<AppState>,
    member: MemberIdentity,
) -> AppResult<Json<DashboardResponse>> {
    state.settlement.settle(member.user_id).await?;
    let balance = state.ledger.get_balance(member.user_id).await?;
    let review_links = state.ledger.active_links_for_user(member.user_id).await?;

    Ok(Json(DashboardResponse {
        balance,
        review_links,
    }))
}

/// Explicit reconciliation trigger, same engine the read paths invoke lazily
/// POST /wallet/settle
pub async fn settle_wallet(
    State(state): State<AppState>,
    member: MemberIdentity,
) -> AppResult<Json<SettleResponse>> {
    let credited = state.settlement.settle(member.user_id).await?;
    Ok(Json(SettleResponse { credited }))
}

/// POST /recharges
pub async fn submit_recharge(
    State(state): State<AppState>,
    member: MemberIdentity,
    Json(request): Json<SubmitRechargeRequest>,
) -> AppResult<Json<RechargeResponse>> {
    if !state
        .ledger_config
        .is_allowed_recharge_amount(request.amount)
    {
        return Err(AppError::Validation("invalid recharge amount".to_string()));
    }
    if !state
        .ledger_config
        .is_allowed_payment_method(&request.payment_method)
    {
        return Err(AppError::Validation("invalid payment method".to_string()));
    }

    let recharge = state
        .ledger
        .create_recharge(member.user_id, request.amount, &request.payment_method)
        .await?;

    info!(user_id = %member.user_id, amount = %recharge.amount, "recharge submitted");
    Ok(Json(recharge.into()))
}

/// GET /recharges
pub async fn list_recharges(
    State(state): State<AppState>,
    member: MemberIdentity,
) -> AppResult<Json<Vec<RechargeResponse>>> {
    state.settlement.settle(member.user_id).await?;
    let recharges = state.ledger.recent_recharges(member.user_id, 10).await?;
    Ok(Json(recharges.into_iter().map(Into::into).collect()))
}

/// GET /withdrawals/eligibility
pub async fn check_withdraw_eligibility(
    State(state): State<AppState>,
    member: MemberIdentity,
) -> AppResult<Json<EligibilityResponse>> {
    state.settlement.settle(member.user_id).await?;
    let decision = state.eligibility.check(member.user_id).await?;
    Ok(Json(decision.into()))
}

/// POST /withdrawals
pub async fn submit_withdrawal(
    State(state): State<AppState>,
    member: MemberIdentity,
    Json(request): Json<SubmitWithdrawalRequest>,
) -> AppResult<Json<WithdrawalResponse>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let submitted = state
        .withdrawals
        .submit_withdrawal(member.user_id, request.amount, request.bank_details())
        .await?;

    Ok(Json(submitted.into()))
}

/// POST /rewards/claim
pub async fn claim_reward(
    State(state): State<AppState>,
    member: MemberIdentity,
    Json(request): Json<ClaimRewardRequest>,
) -> AppResult<Json<ClaimRewardResponse>> {
    let outcome = state
        .rewards
        .claim_reward(member.user_id, request.review_link_id)
        .await?;

    Ok(Json(ClaimRewardResponse {
        review_link_id: outcome.link_id,
        credited: outcome.credited,
    }))
}

// ========== ADMIN HANDLERS ==========

/// POST /admin/members/:user_id/recharges/resolve
pub async fn resolve_pending_recharges(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Path(user_id): Path<Uuid>,
    Json(request): Json<ResolveRechargesRequest>,
) -> AppResult<Json<ResolveRechargesResponse>> {
    let batch = state
        .settlement
        .resolve_pending_recharges(user_id, request.status)
        .await?;

    info!(admin = %admin.admin, %user_id, count = batch.count, "admin resolved pending recharges");

    Ok(Json(ResolveRechargesResponse {
        count: batch.count,
        credited: batch.credited,
    }))
}

/// GET /admin/withdrawals/pending
pub async fn list_pending_withdrawals(
    State(state): State<AppState>,
    _admin: AdminIdentity,
) -> AppResult<Json<Vec<WithdrawalResponse>>> {
    let pending = state.ledger.pending_withdraw_requests().await?;
    Ok(Json(pending.into_iter().map(Into::into).collect()))
}

/// POST /admin/withdrawals/:id/status
pub async fn update_withdraw_status(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Path(request_id): Path<Uuid>,
    Json(request): Json<UpdateWithdrawStatusRequest>,
) -> AppResult<Json<WithdrawalResponse>> {
    state
        .ledger
        .update_withdraw_status(request_id, request.status)
        .await?;

    let updated = state
        .ledger
        .get_withdraw_request(request_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("withdraw request {}", request_id)))?;

    info!(admin = %admin.admin, %request_id, status = %updated.status, "withdraw request updated");
    Ok(Json(updated.into()))
}

/// POST /admin/members/:user_id/status
pub async fn update_member_status(
    State(state): State<AppState>,
    _admin: AdminIdentity,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UpdateMemberStatusRequest>,
) -> AppResult<Json<serde_json::Value>> {
    state.ledger.set_user_status(user_id, request.status).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// DELETE /admin/members/:user_id
pub async fn delete_member(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    state.ledger.delete_user(user_id).await?;
    info!(admin = %admin.admin, %user_id, "member deleted");
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// GET /admin/summary
pub async fn admin_summary(
    State(state): State<AppState>,
    _admin: AdminIdentity,
) -> AppResult<Json<AdminSummaryResponse>> {
    let total_withdrawn = state.ledger.total_withdrawn().await?;
    Ok(Json(AdminSummaryResponse { total_withdrawn }))
}
