use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::{error, warn};

use super::repo::User;
use crate::{error::AppError, state::AppState};

/// The authenticated caller, resolved from a bearer token.
///
/// Rejects with [`AppError::Unauthorized`] when the header is missing or not a
/// bearer token, when the token fails verification, or when its subject no
/// longer exists. The reason is only logged.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| {
                warn!("missing Authorization header");
                AppError::Unauthorized
            })?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| {
                warn!("invalid auth scheme");
                AppError::Unauthorized
            })?;

        let claims = state.jwt.verify(token.trim()).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AppError::Unauthorized
        })?;

        match User::find_by_username(&state.db, &claims.sub).await {
            Ok(Some(user)) => Ok(AuthUser(user)),
            Ok(None) => {
                warn!(username = %claims.sub, "token subject not found");
                Err(AppError::Unauthorized)
            }
            Err(e) => {
                error!(error = %e, "find_by_username failed");
                Err(AppError::Internal(e))
            }
        }
    }
}
