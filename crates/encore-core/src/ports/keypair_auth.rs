use thiserror::Error;

use crate::identity::{AuthCredentials, AuthMethod, LinkingProof, NostrAccount, Pubkey};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeypairAuthError {
    #[error("no signing extension is available")]
    ExtensionUnavailable,

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("remote signer failed: {0}")]
    RemoteSigner(String),

    #[error("authentication rejected: {0}")]
    Rejected(String),
}

/// Protocol keypair authenticator.
///
/// Capabilities are queried through [`supported_methods`], once, at flow
/// construction; flows never probe the environment ambiently.
///
/// [`supported_methods`]: KeypairAuthPort::supported_methods
#[async_trait::async_trait]
pub trait KeypairAuthPort: Send + Sync {
    fn supported_methods(&self) -> Vec<AuthMethod>;

    /// Authenticate a keypair and make it the active session.
    async fn authenticate(
        &self,
        method: AuthMethod,
        credentials: AuthCredentials,
    ) -> Result<NostrAccount, KeypairAuthError>;

    /// Produce a signed proof of keypair control, bound to the external
    /// account's stable id. The signer for `pubkey` must already be held
    /// by the adapter.
    async fn sign_linking_proof(
        &self,
        pubkey: &Pubkey,
        external_account_id: &str,
    ) -> Result<LinkingProof, KeypairAuthError>;
}
