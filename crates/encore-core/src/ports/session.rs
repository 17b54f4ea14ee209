use thiserror::Error;

use crate::identity::{NameHint, PendingCredential};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("keypair generation failed: {0}")]
    Generation(String),

    #[error("login activation failed: {0}")]
    Activation(String),
}

/// Local session store.
#[async_trait::async_trait]
pub trait SessionPort: Send + Sync {
    /// Generate a keypair-backed credential with a generated display name.
    /// Does not activate a session.
    async fn create_pending_credential(
        &self,
        hint: NameHint,
    ) -> Result<PendingCredential, SessionError>;

    /// Make the credential the active session. Side-effecting and not
    /// undoable within a flow.
    async fn activate(&self, credential: &PendingCredential) -> Result<(), SessionError>;
}
