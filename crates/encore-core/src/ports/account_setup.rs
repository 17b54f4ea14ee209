use crate::identity::{ProfileData, Pubkey};

/// Best-effort wallet and profile enrichment after a session is valid.
///
/// Failures here are logged by callers, never surfaced: the user is
/// already authenticated and must not be blocked by downstream setup.
#[async_trait::async_trait]
pub trait AccountSetupPort: Send + Sync {
    /// Wallet creation plus profile publication.
    async fn setup_account(
        &self,
        profile: Option<&ProfileData>,
        generated_name: &str,
    ) -> anyhow::Result<()>;

    /// Degraded fallback when full setup fails: publish a minimal profile
    /// carrying only a name.
    async fn publish_minimal_profile(&self, name: &str) -> anyhow::Result<()>;

    /// Pull the latest published profile for an authenticated account.
    async fn sync_profile(&self, pubkey: &Pubkey) -> anyhow::Result<Option<ProfileData>>;
}
