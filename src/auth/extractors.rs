use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use jsonwebtoken::{decode, DecodingKey, Validation};
use tracing::warn;
use uuid::Uuid;

use super::claims::Claims;
use crate::error::AppError;
use crate::state::AppState;

/// Extracts and validates the Bearer token, returning the resolved user id.
#[derive(Debug)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing Authorization header".into()))?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| AppError::Unauthorized("invalid auth scheme".into()))?;

        let cfg = &state.config.jwt;
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&cfg.audience));
        validation.set_issuer(std::slice::from_ref(&cfg.issuer));
        let decoding = DecodingKey::from_secret(cfg.secret.as_bytes());

        let data = decode::<Claims>(token, &decoding, &validation).map_err(|e| {
            warn!(error = %e, "token rejected");
            AppError::Unauthorized("invalid or expired token".into())
        })?;

        Ok(AuthUser(data.claims.sub))
    }
}
