use serde::Serialize;

use crate::flow::OpTracker;
use crate::identity::{
    ExternalUser, LinkedKeypair, NostrAccount, PendingCredential, ProfileData, Pubkey,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MigrationStep {
    /// Email/password authentication against the identity provider.
    ProviderAuth,
    /// Looking up previously linked keypairs.
    CheckingLinks,
    /// The user authenticates the keypair the directory expects.
    LinkedKeypairAuth,
    /// The authenticated keypair diverges from the expected one.
    PubkeyMismatch,
    /// No links exist: generate a fresh account or bring a keypair.
    AccountChoice,
    AccountGeneration,
    BringOwnKeypair,
    ProfileSetup,
    Complete,
}

/// Named async operations tracked independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationOp {
    ProviderAuth,
    LinkedKeypairAuth,
    AcceptNewPubkey,
    GenerateAccount,
    BringOwnKeypair,
    CompleteProfile,
    CompleteLogin,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MigrationState {
    pub step: MigrationStep,
    pub tracker: OpTracker<MigrationOp>,
    /// External account handle after provider authentication.
    pub provider_user: Option<ExternalUser>,
    /// Lookup result, cached for the rest of the flow.
    pub linked_keypairs: Vec<LinkedKeypair>,
    /// Keypair the user is expected to authenticate with, derived from the
    /// most-recently-linked entry. Only mismatch-resolution events change
    /// it once set.
    pub expected_pubkey: Option<Pubkey>,
    /// Populated only while a mismatch is unresolved.
    pub actual_pubkey: Option<Pubkey>,
    pub mismatched_account: Option<NostrAccount>,
    /// Fresh keypair-backed credential on the generated-account path.
    pub generated_account: Option<PendingCredential>,
    /// Created but not yet activated; not an authenticated session.
    pub created_login: Option<PendingCredential>,
    pub generated_name: Option<String>,
    pub profile: Option<ProfileData>,
    pub login_activated: bool,
}

impl MigrationState {
    pub fn has_linked_keypairs(&self) -> bool {
        !self.linked_keypairs.is_empty()
    }

    pub fn can_go_back(&self) -> bool {
        crate::migration::MigrationMachine::previous_step(self).is_some()
    }
}
