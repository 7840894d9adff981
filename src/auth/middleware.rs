//! Authentication extractor
//!
//! Protects routes that require a signed-in user.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejectionReason,
};

use super::token::{Identity, verify_token};
use crate::AppState;
use crate::error::AppError;

/// Extractor for current authenticated user
///
/// Reads `Authorization: Bearer <token>` and verifies it against the
/// configured secret.
///
/// # Usage
/// ```ignore
/// async fn handler(
///     CurrentUser(identity): CurrentUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}", identity.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>().cloned() {
            return Ok(CurrentUser(identity));
        }

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|rejection| match rejection.reason() {
                    TypedHeaderRejectionReason::Missing => {
                        AppError::Unauthorized("No token provided".to_string())
                    }
                    _ => AppError::Unauthorized("Invalid token format".to_string()),
                })?;

        let app_state = AppState::from_ref(state);
        let identity = verify_token(bearer.token(), &app_state.config.auth.token_secret)
            .inspect_err(|_| tracing::debug!("Rejected bearer token"))?;

        parts.extensions.insert(identity.clone());
        Ok(CurrentUser(identity))
    }
}
