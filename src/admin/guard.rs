use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use crate::{
    auth::{jwt::JwtKeys, repo::User},
    error::ApiError,
    state::AppState,
};

/// A caller holding a valid access token whose account has `role = "admin"`.
///
/// Login only hands out placeholder tokens and signup never assigns a role,
/// so nothing issued in-band passes this check yet.
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".into()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header".into()))?;

        let claims = JwtKeys::from_ref(state).verify_access(token).map_err(|e| {
            warn!(error = %e, "admin token rejected");
            ApiError::Unauthorized("Invalid or expired token".into())
        })?;

        let user = state
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Invalid or expired token".into()))?;

        if !user.is_admin() {
            warn!(user_id = %user.id, "non-admin hit admin route");
            return Err(ApiError::Forbidden("Admin access required".into()));
        }
        Ok(AdminUser(user))
    }
}
