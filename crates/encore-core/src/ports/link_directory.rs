use thiserror::Error;

use crate::identity::{ExternalUser, LinkedKeypair, LinkingProof};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("link directory unreachable: {0}")]
    Network(String),

    #[error("link directory rejected credentials: {0}")]
    Auth(String),

    #[error("keypair already linked to a different account")]
    AlreadyLinked,
}

impl LinkError {
    /// Actionable message for the user choosing between retry/continue
    /// options. Raw transport errors are never shown.
    pub fn user_message(&self) -> &'static str {
        match self {
            LinkError::Network(_) => {
                "We couldn't reach the server. Check your connection and try again."
            }
            LinkError::Auth(_) => "Your session expired. Please sign in again.",
            LinkError::AlreadyLinked => {
                "This Nostr identity is already linked to a different account."
            }
        }
    }
}

/// Store of associations between external accounts and protocol keypairs.
#[async_trait::async_trait]
pub trait LinkDirectoryPort: Send + Sync {
    /// Keypairs previously linked to this external account.
    async fn lookup(&self, user: &ExternalUser) -> Result<Vec<LinkedKeypair>, LinkError>;

    /// Record a new link. The directory keeps earlier links; readers
    /// resolve by most-recent.
    async fn link(&self, proof: &LinkingProof) -> Result<(), LinkError>;
}

#[cfg(test)]
mockall::mock! {
    pub LinkDirectory {}

    #[async_trait::async_trait]
    impl LinkDirectoryPort for LinkDirectory {
        async fn lookup(&self, user: &ExternalUser) -> Result<Vec<LinkedKeypair>, LinkError>;
        async fn link(&self, proof: &LinkingProof) -> Result<(), LinkError>;
    }
}
