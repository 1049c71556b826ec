//! Admission: bearer-credential resolution into a stable user identity.
//!
//! The gateway never mints credentials; it only consumes them. A connection
//! supplies a token once at admission, the [`IdentityResolver`] turns it
//! into an [`Identity`], and that identity is fixed for the connection's
//! lifetime. There is no periodic re-validation.

pub mod jwt;

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use tokio::sync::RwLock;

pub use jwt::JwtIdentityResolver;

/// Authenticated user identity, resolved once at admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable user id (the account's email in the backing directory).
    pub user_id: String,
    /// Display name snapshot used for all messages sent on this connection.
    pub display_name: String,
}

/// Why admission was refused.
///
/// Each variant carries the close reason sent to the client. A disabled
/// account resolves to [`AdmissionError::InvalidToken`] on purpose, so a
/// probing client cannot distinguish it from a bad credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    /// No credential was supplied with the connection request.
    #[error("authentication required")]
    AuthRequired,
    /// The credential failed verification or decoding.
    #[error("invalid token")]
    InvalidToken,
    /// The credential verified but its subject is unknown.
    #[error("user not found")]
    UserNotFound,
}

/// WebSocket close code used for every admission rejection.
pub const ADMISSION_CLOSE_CODE: u16 = 4003;

impl AdmissionError {
    /// Returns the close reason string sent in the rejection close frame.
    #[must_use]
    pub const fn close_reason(self) -> &'static str {
        match self {
            Self::AuthRequired => "auth_required",
            Self::InvalidToken => "invalid_token",
            Self::UserNotFound => "user_not_found",
        }
    }
}

/// Resolves a bearer credential into an [`Identity`].
#[async_trait]
pub trait IdentityResolver: Send + Sync + fmt::Debug {
    /// Validates `credential` and returns the identity it belongs to.
    ///
    /// # Errors
    ///
    /// Returns an [`AdmissionError`] naming the rejection reason.
    async fn resolve(&self, credential: &str) -> Result<Identity, AdmissionError>;
}

/// One account in the user directory backing the resolver.
#[derive(Debug, Clone)]
pub struct UserRecord {
    /// Stable account id (email).
    pub user_id: String,
    /// Preferred display name, if the user set one.
    pub display_name: Option<String>,
    /// Account username, if any.
    pub username: Option<String>,
    /// Disabled accounts are refused admission.
    pub disabled: bool,
}

impl UserRecord {
    /// Resolved display name: display name, else username, else the local
    /// part of the account email.
    #[must_use]
    pub fn resolved_display_name(&self) -> String {
        self.display_name
            .clone()
            .or_else(|| self.username.clone())
            .unwrap_or_else(|| {
                self.user_id
                    .split('@')
                    .next()
                    .unwrap_or(&self.user_id)
                    .to_string()
            })
    }
}

/// Lookup of user accounts by id.
#[async_trait]
pub trait UserDirectory: Send + Sync + fmt::Debug {
    /// Returns the account with the given id, if one exists.
    async fn find(&self, user_id: &str) -> Option<UserRecord>;
}

/// In-memory [`UserDirectory`], used in tests and when no external
/// directory is wired up.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryUserDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an account.
    pub async fn insert(&self, record: UserRecord) {
        let mut users = self.users.write().await;
        users.insert(record.user_id.clone(), record);
    }

    /// Seeds accounts from a `user_id:Display Name` list separated by
    /// commas (`alice@example.com:Alice,bob@example.com:Bob`). Entries
    /// without a colon get the fallback display name. Used for
    /// development setups without a backing database.
    pub async fn seed_from_list(&self, list: &str) {
        for entry in list.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let (user_id, display_name) = match entry.split_once(':') {
                Some((id, name)) => (id.trim(), Some(name.trim().to_string())),
                None => (entry, None),
            };
            self.insert(UserRecord {
                user_id: user_id.to_string(),
                display_name,
                username: None,
                disabled: false,
            })
            .await;
        }
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find(&self, user_id: &str) -> Option<UserRecord> {
        self.users.read().await.get(user_id).cloned()
    }
}
