use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::api::handler::{
    admin_summary, check_withdraw_eligibility, claim_reward, create_member, delete_member,
    get_dashboard, get_profile, get_wallet, health_check, list_pending_withdrawals,
    list_recharges, resolve_pending_recharges, settle_wallet, submit_recharge, submit_withdrawal,
    update_member_status, update_withdraw_status, AppState,
};

pub async fn create_app(state: AppState) -> Router {
    info!("⚙️ Setting up HTTP routes...");

    let app = Router::new()
        // Public health check endpoint
        .route("/health", get(health_check))
        .nest(
            "/api/v1",
            Router::new()
                // Registration hook for the external auth layer
                .route("/members", post(create_member))
                // Member endpoints (identity from x-member-id)
                .route("/profile", get(get_profile))
                .route("/wallet", get(get_wallet))
                .route("/wallet/settle", post(settle_wallet))
                .route("/dashboard", get(get_dashboard))
                .route("/recharges", get(list_recharges).post(submit_recharge))
                .route("/withdrawals", post(submit_withdrawal))
                .route("/withdrawals/eligibility", get(check_withdraw_eligibility))
                .route("/rewards/claim", post(claim_reward))
                // Admin endpoints (identity from x-admin-id)
                .route(
                    "/admin/members/:user_id/recharges/resolve",
                    post(resolve_pending_recharges),
                )
                .route("/admin/members/:user_id/status", post(update_member_status))
                .route("/admin/members/:user_id", delete(delete_member))
                .route("/admin/withdrawals/pending", get(list_pending_withdrawals))
                .route("/admin/withdrawals/:id/status", post(update_withdraw_status))
                .route("/admin/summary", get(admin_summary)),
        )
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("✓ HTTP routes configured");
    app
}

pub async fn run_server(app: Router, bind_address: &str) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("🌐 Server listening on: {}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}
