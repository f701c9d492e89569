// The fronting session layer authenticates members and admins and forwards
// the verified identity in headers. The core trusts these headers and performs
// no credential checks of its own.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::AppError;

pub const MEMBER_ID_HEADER: &str = "x-member-id";
pub const ADMIN_ID_HEADER: &str = "x-admin-id";

/// Verified member identity supplied by the session layer
#[derive(Debug, Clone, Copy)]
pub struct MemberIdentity {
    pub user_id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for MemberIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(MEMBER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or(AppError::Unauthorized)?;

        Ok(MemberIdentity { user_id })
    }
}

/// Verified admin identity supplied by the session layer
#[derive(Debug, Clone)]
pub struct AdminIdentity {
    pub admin: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let admin = parts
            .headers
            .get(ADMIN_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or(AppError::Unauthorized)?;

        Ok(AdminIdentity {
            admin: admin.to_string(),
        })
    }
}
