//! `AuthUser` extractor: pulls the bearer token from the Authorization header
//! and validates it.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::debug;

use orkut_auth::jwt::Claims;
use orkut_core::error::AppError;
use orkut_core::types::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// Message for requests without a bearer token.
pub const MISSING_TOKEN: &str = "Token de autenticação não fornecido";
/// Message for requests whose token does not validate.
pub const NOT_AUTHENTICATED: &str = "Usuário não autenticado";

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
    pub claims: Claims,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::authentication(MISSING_TOKEN))?;

        let claims = state.jwt_decoder.decode_access_token(token).map_err(|e| {
            debug!(error = %e.message, "Bearer token rejected");
            AppError::authentication(NOT_AUTHENTICATED)
        })?;

        Ok(AuthUser {
            user_id: claims.user_id(),
            claims,
        })
    }
}
