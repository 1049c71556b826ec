//! HS256 bearer token resolver.
//!
//! Verifies a JWT with `jsonwebtoken`, extracts the subject, and looks the
//! account up in a [`UserDirectory`]. Disabled accounts are rejected with
//! the same error as a bad token.

use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use super::{AdmissionError, Identity, IdentityResolver, UserDirectory};

/// Claims the gateway requires in a bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the account id (email).
    pub sub: String,
    /// Expiry (Unix timestamp), enforced by `jsonwebtoken` validation.
    pub exp: i64,
}

/// [`IdentityResolver`] backed by HS256 tokens and a user directory.
pub struct JwtIdentityResolver {
    decoding_key: DecodingKey,
    validation: Validation,
    directory: Arc<dyn UserDirectory>,
}

impl std::fmt::Debug for JwtIdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtIdentityResolver")
            .field("directory", &self.directory)
            .finish_non_exhaustive()
    }
}

impl JwtIdentityResolver {
    /// Creates a resolver verifying tokens against `secret`.
    #[must_use]
    pub fn new(secret: &str, directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            directory,
        }
    }
}

#[async_trait]
impl IdentityResolver for JwtIdentityResolver {
    async fn resolve(&self, credential: &str) -> Result<Identity, AdmissionError> {
        let data = jsonwebtoken::decode::<Claims>(credential, &self.decoding_key, &self.validation)
            .map_err(|err| {
                tracing::debug!(error = %err, "token verification failed");
                AdmissionError::InvalidToken
            })?;

        let Some(user) = self.directory.find(&data.claims.sub).await else {
            return Err(AdmissionError::UserNotFound);
        };

        // Indistinguishable from a bad credential on the wire.
        if user.disabled {
            return Err(AdmissionError::InvalidToken);
        }

        Ok(Identity {
            display_name: user.resolved_display_name(),
            user_id: user.user_id,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::auth::{InMemoryUserDirectory, UserRecord};
    use jsonwebtoken::{EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn token_for(sub: &str, secret: &str) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            exp: chrono::Utc::now().timestamp() + 3600,
        };
        let Ok(token) = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        ) else {
            panic!("token encoding failed");
        };
        token
    }

    async fn resolver_with(records: Vec<UserRecord>) -> JwtIdentityResolver {
        let dir = InMemoryUserDirectory::new();
        for record in records {
            dir.insert(record).await;
        }
        JwtIdentityResolver::new(SECRET, Arc::new(dir))
    }

    fn alice() -> UserRecord {
        UserRecord {
            user_id: "alice@example.com".to_string(),
            display_name: Some("Alice".to_string()),
            username: None,
            disabled: false,
        }
    }

    #[tokio::test]
    async fn valid_token_resolves_identity() {
        let resolver = resolver_with(vec![alice()]).await;
        let identity = resolver.resolve(&token_for("alice@example.com", SECRET)).await;
        let Ok(identity) = identity else {
            panic!("expected resolution");
        };
        assert_eq!(identity.user_id, "alice@example.com");
        assert_eq!(identity.display_name, "Alice");
    }

    #[tokio::test]
    async fn wrong_secret_is_invalid_token() {
        let resolver = resolver_with(vec![alice()]).await;
        let result = resolver
            .resolve(&token_for("alice@example.com", "other-secret"))
            .await;
        assert_eq!(result, Err(AdmissionError::InvalidToken));
    }

    #[tokio::test]
    async fn garbage_credential_is_invalid_token() {
        let resolver = resolver_with(vec![alice()]).await;
        let result = resolver.resolve("not-a-jwt").await;
        assert_eq!(result, Err(AdmissionError::InvalidToken));
    }

    #[tokio::test]
    async fn unknown_subject_is_user_not_found() {
        let resolver = resolver_with(vec![alice()]).await;
        let result = resolver.resolve(&token_for("ghost@example.com", SECRET)).await;
        assert_eq!(result, Err(AdmissionError::UserNotFound));
    }

    #[tokio::test]
    async fn disabled_user_looks_like_invalid_token() {
        let mut record = alice();
        record.disabled = true;
        let resolver = resolver_with(vec![record]).await;
        let result = resolver.resolve(&token_for("alice@example.com", SECRET)).await;
        assert_eq!(result, Err(AdmissionError::InvalidToken));
    }
}
