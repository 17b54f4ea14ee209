use thiserror::Error;

use crate::identity::{ExternalUser, Secret};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityProviderError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("this account has been disabled")]
    AccountDisabled,

    #[error("no account exists for this email")]
    UserNotFound,

    #[error("identity provider failed: {0}")]
    Provider(String),
}

/// Centralized email/password identity provider.
#[async_trait::async_trait]
pub trait IdentityProviderPort: Send + Sync {
    /// Authenticate an existing provider account.
    async fn authenticate(
        &self,
        email: &str,
        password: &Secret,
    ) -> Result<ExternalUser, IdentityProviderError>;

    /// Create a new provider account, used as a backup identity.
    async fn register(
        &self,
        email: &str,
        password: &Secret,
    ) -> Result<ExternalUser, IdentityProviderError>;
}
