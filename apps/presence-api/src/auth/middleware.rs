//! Bearer token extraction and the administrative authorization gate.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::auth::tokens;
use crate::error::ApiError;
use crate::models::user::UserId;
use crate::AppState;

/// Authenticated caller extracted from the `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header format"))?;

        let data = tokens::lookup_pat(state.kv.as_ref(), token)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Invalid or expired token"))?;

        Ok(AuthUser {
            user_id: data.user_id,
        })
    }
}

/// Caller verified to hold the administrative role in the directory.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user_id: UserId,
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser { user_id } = AuthUser::from_request_parts(parts, state).await?;

        let user = state
            .directory
            .find_user(&user_id)
            .ok_or_else(|| ApiError::unauthorized("Token does not belong to a known user"))?;

        if !user.is_admin() {
            tracing::debug!(user_id = %user_id, role = %user.role, "admin access denied");
            return Err(ApiError::forbidden("Administrator role required"));
        }

        Ok(AdminUser { user_id })
    }
}
