//! Legacy migration orchestrator.
//!
//! Moves a centralized email/password account onto a keypair identity.
//! The provider step and the link lookup share one tracked operation;
//! the lookup result decides between authenticating a previously linked
//! keypair and the fresh-account branch.
//!
//! Linking always runs before activation, so a directory failure leaves
//! no half-migrated session behind. A matching linked-keypair login is
//! idempotent: the link exists, nothing is written.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, info_span, warn, Instrument};

use encore_core::flow::{ActionResult, FlowError, FlowHandle};
use encore_core::identity::{AuthCredentials, AuthMethod, NameHint, ProfileData, Secret};
use encore_core::migration::{MigrationEvent, MigrationOp, MigrationState, MigrationStep};
use encore_core::ports::{
    AccountSetupPort, IdentityProviderPort, KeypairAuthPort, LinkDirectoryPort, SessionPort,
};

use crate::flows::{validate_email, validate_password};

pub struct MigrationDeps {
    pub identity_provider: Arc<dyn IdentityProviderPort>,
    pub link_directory: Arc<dyn LinkDirectoryPort>,
    pub keypair_auth: Arc<dyn KeypairAuthPort>,
    pub session: Arc<dyn SessionPort>,
    pub account_setup: Arc<dyn AccountSetupPort>,
}

#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Pause between session activation and the completing dispatch, so
    /// downstream consumers of the new signer observe it before the flow
    /// reports itself finished.
    pub activation_settle: Duration,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            activation_settle: Duration::from_millis(500),
        }
    }
}

pub struct MigrationFlow {
    handle: FlowHandle<MigrationState>,
    deps: MigrationDeps,
    config: MigrationConfig,
    methods: Vec<AuthMethod>,
}

impl MigrationFlow {
    pub fn new(deps: MigrationDeps, config: MigrationConfig) -> Self {
        let methods = deps.keypair_auth.supported_methods();
        Self {
            handle: FlowHandle::new(),
            deps,
            config,
            methods,
        }
    }

    pub fn supported_methods(&self) -> &[AuthMethod] {
        &self.methods
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<MigrationState> {
        self.handle.subscribe()
    }

    pub async fn state(&self) -> MigrationState {
        self.handle.snapshot().await
    }

    pub async fn reset(&self) -> MigrationState {
        self.handle.reset().await
    }

    pub async fn go_back(&self) -> MigrationState {
        self.handle.go_back().await
    }

    /// Authenticate against the legacy provider, then look up previously
    /// linked keypairs. One operation covers both calls; a lookup failure
    /// is retryable by calling this again.
    pub async fn authenticate_provider(&self, email: &str, password: &Secret) -> ActionResult<()> {
        self.handle
            .run_op(MigrationOp::ProviderAuth, async {
                validate_email(email)?;
                validate_password(password)?;

                let user = self
                    .deps
                    .identity_provider
                    .authenticate(email.trim(), password)
                    .await?;
                info!(uid = %user.uid, "provider authentication succeeded");
                self.handle
                    .dispatch(MigrationEvent::ProviderAuthenticated { user: user.clone() })
                    .await;

                let linked = self.deps.link_directory.lookup(&user).await?;
                info!(count = linked.len(), "linked keypairs found");
                self.handle
                    .dispatch(MigrationEvent::LinksChecked { linked })
                    .await;
                Ok(())
            })
            .instrument(info_span!("migration_provider_auth"))
            .await
    }

    /// Authenticate the keypair the directory expects. A different pubkey
    /// is not an operation failure; it moves the flow to the mismatch
    /// step for an explicit user decision.
    pub async fn authenticate_linked(
        &self,
        method: AuthMethod,
        credentials: AuthCredentials,
    ) -> ActionResult<()> {
        self.handle
            .run_op(MigrationOp::LinkedKeypairAuth, async {
                let state = self.handle.snapshot().await;
                if state.step != MigrationStep::LinkedKeypairAuth {
                    return Err(FlowError::NotAllowed("keypair authentication"));
                }
                let expected = state
                    .expected_pubkey
                    .ok_or(FlowError::NotAllowed("keypair authentication"))?;

                let mut account =
                    self.deps.keypair_auth.authenticate(method, credentials).await?;

                if account.pubkey == expected {
                    match self.deps.account_setup.sync_profile(&account.pubkey).await {
                        Ok(Some(profile)) => account.profile = Some(profile),
                        Ok(None) => {}
                        Err(err) => {
                            warn!(error = %err, "profile sync failed after migration login");
                        }
                    }
                    info!(pubkey = %account.pubkey, "linked keypair matched, migration complete");
                    self.handle
                        .dispatch(MigrationEvent::LinkedAuthMatched { account })
                        .await;
                } else {
                    warn!(
                        expected = %expected,
                        actual = %account.pubkey,
                        "authenticated keypair differs from the linked one"
                    );
                    self.handle
                        .dispatch(MigrationEvent::LinkedAuthMismatched { account })
                        .await;
                }
                Ok(())
            })
            .instrument(info_span!("migration_linked_auth", ?method))
            .await
    }

    /// Drop the mismatched attempt and try the expected keypair again.
    pub async fn retry_mismatch(&self) -> MigrationState {
        self.handle.dispatch(MigrationEvent::MismatchRetried).await
    }

    /// Keep the keypair that actually authenticated and link it. The old
    /// link stays in the directory; readers resolve by most-recent.
    pub async fn accept_new_pubkey(&self) -> ActionResult<()> {
        self.handle
            .run_op(MigrationOp::AcceptNewPubkey, async {
                let state = self.handle.snapshot().await;
                if state.step != MigrationStep::PubkeyMismatch {
                    return Err(FlowError::NotAllowed("accepting a new keypair"));
                }
                let account = state
                    .mismatched_account
                    .ok_or(FlowError::NotAllowed("accepting a new keypair"))?;
                let user = state
                    .provider_user
                    .ok_or(FlowError::NotAllowed("accepting a new keypair"))?;

                let proof = self
                    .deps
                    .keypair_auth
                    .sign_linking_proof(&account.pubkey, &user.uid)
                    .await?;
                self.deps.link_directory.link(&proof).await?;

                info!(pubkey = %account.pubkey, "new keypair linked over the old one");
                self.handle.dispatch(MigrationEvent::NewPubkeyAccepted).await;
                Ok(())
            })
            .instrument(info_span!("migration_accept_new_pubkey"))
            .await
    }

    pub async fn choose_generate(&self) -> MigrationState {
        self.handle.dispatch(MigrationEvent::GenerateChosen).await
    }

    pub async fn choose_bring_own(&self) -> MigrationState {
        self.handle.dispatch(MigrationEvent::BringOwnChosen).await
    }

    /// Generate a fresh keypair credential and link it to the provider
    /// account. The credential is not activated yet; profile setup and
    /// activation follow as their own steps.
    pub async fn generate_account(&self) -> ActionResult<()> {
        self.handle
            .run_op(MigrationOp::GenerateAccount, async {
                let state = self.handle.snapshot().await;
                if state.step != MigrationStep::AccountGeneration {
                    return Err(FlowError::NotAllowed("account generation"));
                }
                let user = state
                    .provider_user
                    .ok_or(FlowError::NotAllowed("account generation"))?;

                let credential = self
                    .deps
                    .session
                    .create_pending_credential(NameHint::Migrated)
                    .await?;
                let proof = self
                    .deps
                    .keypair_auth
                    .sign_linking_proof(&credential.pubkey, &user.uid)
                    .await?;
                self.deps.link_directory.link(&proof).await?;

                info!(name = %credential.generated_name, "generated account linked");
                self.handle
                    .dispatch(MigrationEvent::AccountGenerated { credential })
                    .await;
                Ok(())
            })
            .instrument(info_span!("migration_generate_account"))
            .await
    }

    /// Authenticate an externally held keypair and link it.
    pub async fn bring_own_keypair(
        &self,
        method: AuthMethod,
        credentials: AuthCredentials,
    ) -> ActionResult<()> {
        self.handle
            .run_op(MigrationOp::BringOwnKeypair, async {
                let state = self.handle.snapshot().await;
                if state.step != MigrationStep::BringOwnKeypair {
                    return Err(FlowError::NotAllowed("linking a keypair"));
                }
                let user = state
                    .provider_user
                    .ok_or(FlowError::NotAllowed("linking a keypair"))?;

                let mut account =
                    self.deps.keypair_auth.authenticate(method, credentials).await?;
                let proof = self
                    .deps
                    .keypair_auth
                    .sign_linking_proof(&account.pubkey, &user.uid)
                    .await?;
                self.deps.link_directory.link(&proof).await?;

                // Session is already active through the authenticator; any
                // existing profile is pulled best-effort.
                match self.deps.account_setup.sync_profile(&account.pubkey).await {
                    Ok(Some(profile)) => account.profile = Some(profile),
                    Ok(None) => {}
                    Err(err) => {
                        warn!(error = %err, "profile sync failed after linking, continuing");
                    }
                }

                info!(pubkey = %account.pubkey, "own keypair linked");
                self.handle
                    .dispatch(MigrationEvent::OwnKeypairLinked { account })
                    .await;
                Ok(())
            })
            .instrument(info_span!("migration_bring_own_keypair"))
            .await
    }

    /// Stage the profile, activate the generated credential and finish.
    /// Wallet/profile setup afterwards is best-effort.
    pub async fn complete_profile(&self, profile: ProfileData) -> ActionResult<()> {
        self.handle
            .run_op(MigrationOp::CompleteProfile, async {
                if profile.name.trim().is_empty() {
                    return Err(FlowError::Validation("a name is required".into()));
                }
                let state = self.handle.snapshot().await;
                if state.step != MigrationStep::ProfileSetup {
                    return Err(FlowError::NotAllowed("profile completion"));
                }
                let credential = state
                    .created_login
                    .ok_or(FlowError::NotAllowed("profile completion"))?;

                self.deps.session.activate(&credential).await?;
                tokio::time::sleep(self.config.activation_settle).await;
                self.handle
                    .dispatch(MigrationEvent::ProfileCompleted {
                        profile: profile.clone(),
                    })
                    .await;

                if let Err(err) = self
                    .deps
                    .account_setup
                    .setup_account(Some(&profile), &credential.generated_name)
                    .await
                {
                    error!(error = %err, "account setup failed, falling back to minimal profile");
                    if let Err(err) = self
                        .deps
                        .account_setup
                        .publish_minimal_profile(&credential.generated_name)
                        .await
                    {
                        warn!(error = %err, "minimal profile publication failed");
                    }
                }
                Ok(())
            })
            .instrument(info_span!("migration_complete_profile"))
            .await
    }

    /// Skip profile details: activate the generated credential and finish
    /// with only the generated name published.
    pub async fn complete_login(&self) -> ActionResult<()> {
        self.handle
            .run_op(MigrationOp::CompleteLogin, async {
                let state = self.handle.snapshot().await;
                if state.step != MigrationStep::ProfileSetup {
                    return Err(FlowError::NotAllowed("login activation"));
                }
                let credential = state
                    .created_login
                    .ok_or(FlowError::NotAllowed("login activation"))?;

                self.deps.session.activate(&credential).await?;
                tokio::time::sleep(self.config.activation_settle).await;
                self.handle.dispatch(MigrationEvent::LoginActivated).await;

                if let Err(err) = self
                    .deps
                    .account_setup
                    .publish_minimal_profile(&credential.generated_name)
                    .await
                {
                    warn!(error = %err, "minimal profile publication failed");
                }
                Ok(())
            })
            .instrument(info_span!("migration_complete_login"))
            .await
    }
}

/// UI copy for the migration steps.
pub fn step_title(step: MigrationStep) -> &'static str {
    match step {
        MigrationStep::ProviderAuth => "Sign in to your old account",
        MigrationStep::CheckingLinks => "Checking your account",
        MigrationStep::LinkedKeypairAuth => "Unlock your Nostr identity",
        MigrationStep::PubkeyMismatch => "Different identity detected",
        MigrationStep::AccountChoice => "Choose your Nostr identity",
        MigrationStep::AccountGeneration => "Creating your identity",
        MigrationStep::BringOwnKeypair => "Connect your identity",
        MigrationStep::ProfileSetup => "Set up your profile",
        MigrationStep::Complete => "Migration complete",
    }
}

pub fn step_description(step: MigrationStep) -> &'static str {
    match step {
        MigrationStep::ProviderAuth => "Use the email and password you signed up with.",
        MigrationStep::CheckingLinks => "Looking for identities linked to this account.",
        MigrationStep::LinkedKeypairAuth => {
            "Sign in with the Nostr identity you linked to this account."
        }
        MigrationStep::PubkeyMismatch => {
            "The identity you unlocked is not the one linked to this account."
        }
        MigrationStep::AccountChoice => {
            "Generate a new identity, or connect one you already have."
        }
        MigrationStep::AccountGeneration => "A fresh keypair is being created and linked.",
        MigrationStep::BringOwnKeypair => "Sign in with your existing Nostr identity.",
        MigrationStep::ProfileSetup => "Pick a name and tell the community about yourself.",
        MigrationStep::Complete => "Your account now lives on your Nostr identity.",
    }
}
