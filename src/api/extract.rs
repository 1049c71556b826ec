//! Request extractors for the REST surface.

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::app_state::AppState;
use crate::auth::Identity;
use crate::error::ChatError;

/// Extractor gating a REST handler on a valid `Authorization: Bearer`
/// credential.
///
/// The token goes through the same [`crate::auth::IdentityResolver`] as
/// WebSocket admission; a missing header or a failed resolution rejects
/// the request with `401 Unauthorized`.
#[derive(Debug)]
pub struct RequireIdentity(pub Identity);

impl FromRequestParts<AppState> for RequireIdentity {
    type Rejection = ChatError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        let Some(token) = token else {
            return Err(ChatError::Unauthorized(
                "missing bearer token".to_string(),
            ));
        };

        let identity = state
            .identity_resolver
            .resolve(token)
            .await
            .map_err(|err| ChatError::Unauthorized(err.to_string()))?;
        Ok(Self(identity))
    }
}
