use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::migrate::MigrateError;
use thiserror::Error;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Withdrawal not permitted: {0}")]
    Eligibility(#[from] EligibilityDenied),

    #[error("Insufficient wallet balance")]
    InsufficientBalance,

    #[error("Reward already claimed")]
    DuplicateClaim,

    #[error("No pending recharges to resolve")]
    NoPendingRecharges,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Structured denial reasons from the eligibility gate
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EligibilityDenied {
    #[error("a completed recharge is required before withdrawal")]
    RechargeRequired,

    #[error("withdrawal locked until {unlock_at}")]
    Cooldown { unlock_at: DateTime<Utc> },
}

/// API error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg, None),
            AppError::Eligibility(EligibilityDenied::RechargeRequired) => (
                StatusCode::FORBIDDEN,
                "RECHARGE_REQUIRED",
                "A recharge is required before withdrawal".to_string(),
                None,
            ),
            AppError::Eligibility(EligibilityDenied::Cooldown { unlock_at }) => (
                StatusCode::FORBIDDEN,
                "WITHDRAWAL_LOCKED",
                "Withdrawal is not yet unlocked for the latest recharge".to_string(),
                Some(serde_json::json!({ "unlock_at": unlock_at })),
            ),
            AppError::InsufficientBalance => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INSUFFICIENT_BALANCE",
                "Insufficient wallet balance".to_string(),
                None,
            ),
            AppError::DuplicateClaim => (
                StatusCode::CONFLICT,
                "ALREADY_CLAIMED",
                "Reward has already been claimed".to_string(),
                None,
            ),
            AppError::NoPendingRecharges => (
                StatusCode::CONFLICT,
                "NO_PENDING_RECHARGES",
                "No pending recharges found for this user".to_string(),
                None,
            ),
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Not found: {}", what),
                None,
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Missing or invalid identity".to_string(),
                None,
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "A database error occurred".to_string(),
                None,
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: message,
            error_code: error_code.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal(format!("Error converting: {:?}", error))
    }
}

impl From<rust_decimal::Error> for AppError {
    fn from(error: rust_decimal::Error) -> Self {
        AppError::Validation(format!("Decimal conversion error: {:?}", error))
    }
}

impl From<MigrateError> for AppError {
    fn from(error: MigrateError) -> Self {
        AppError::Internal(format!("Migration error: {:?}", error))
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
