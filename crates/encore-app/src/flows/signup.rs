//! Signup orchestrator.
//!
//! Drives the signup state machine and its side effects: credential
//! generation at the branch points, the optional artist backup link, and
//! final activation with best-effort wallet/profile setup.
//!
//! Linking runs before activation on the backup path: if the directory
//! rejects the link, no session has been created yet and the user can
//! retry or skip without cleanup.

use std::sync::Arc;

use tracing::{error, info, info_span, warn, Instrument};

use encore_core::flow::{ActionResult, FlowError, FlowHandle};
use encore_core::identity::{NameHint, ProfileData, Secret};
use encore_core::ports::{
    AccountSetupPort, IdentityProviderPort, KeypairAuthPort, LinkDirectoryPort, SessionPort,
};
use encore_core::signup::{SignupEvent, SignupOp, SignupState, SignupStep};

use crate::flows::{validate_email, validate_password};

pub struct SignupDeps {
    pub session: Arc<dyn SessionPort>,
    pub identity_provider: Arc<dyn IdentityProviderPort>,
    pub keypair_auth: Arc<dyn KeypairAuthPort>,
    pub link_directory: Arc<dyn LinkDirectoryPort>,
    pub account_setup: Arc<dyn AccountSetupPort>,
}

pub struct SignupFlow {
    handle: FlowHandle<SignupState>,
    deps: SignupDeps,
}

impl SignupFlow {
    pub fn new(deps: SignupDeps) -> Self {
        Self {
            handle: FlowHandle::new(),
            deps,
        }
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<SignupState> {
        self.handle.subscribe()
    }

    pub async fn state(&self) -> SignupState {
        self.handle.snapshot().await
    }

    pub async fn reset(&self) -> SignupState {
        self.handle.reset().await
    }

    pub async fn go_back(&self) -> SignupState {
        self.handle.go_back().await
    }

    /// Listener branch. The credential is generated eagerly since no
    /// further branch choice affects it.
    pub async fn choose_listener(&self) -> ActionResult<()> {
        self.handle
            .run_op(SignupOp::SetUserType, async {
                let credential = self
                    .deps
                    .session
                    .create_pending_credential(NameHint::Listener)
                    .await?;
                info!(name = %credential.generated_name, "listener credential created");
                self.handle
                    .dispatch(SignupEvent::UserTypeChosen {
                        is_artist: false,
                        credential: Some(credential),
                    })
                    .await;
                Ok(())
            })
            .await
    }

    /// Artist branch. Credential generation waits for the band/solo
    /// choice, which influences the generated identity.
    pub async fn choose_artist(&self) -> SignupState {
        self.handle
            .dispatch(SignupEvent::UserTypeChosen {
                is_artist: true,
                credential: None,
            })
            .await
    }

    pub async fn choose_artist_type(&self, is_solo: bool) -> ActionResult<()> {
        self.handle
            .run_op(SignupOp::SetArtistType, async {
                let hint = if is_solo {
                    NameHint::SoloArtist
                } else {
                    NameHint::Band
                };
                let credential = self.deps.session.create_pending_credential(hint).await?;
                self.handle
                    .dispatch(SignupEvent::ArtistTypeChosen {
                        is_solo,
                        credential,
                    })
                    .await;
                Ok(())
            })
            .await
    }

    /// Stage profile data. Publication happens at completion, not here.
    pub async fn complete_profile(&self, profile: ProfileData) -> ActionResult<()> {
        self.handle
            .run_op(SignupOp::CompleteProfile, async {
                if profile.name.trim().is_empty() {
                    return Err(FlowError::Validation("a name is required".into()));
                }
                self.handle
                    .dispatch(SignupEvent::ProfileStaged { profile })
                    .await;
                Ok(())
            })
            .await
    }

    /// Create a provider backup account and link it to the generated
    /// keypair. Artists only.
    pub async fn backup_account(&self, email: &str, password: &Secret) -> ActionResult<()> {
        self.handle
            .run_op(SignupOp::BackupAccount, async {
                validate_email(email)?;
                validate_password(password)?;

                let state = self.handle.snapshot().await;
                let credential = state
                    .created_login
                    .ok_or(FlowError::NotAllowed("backup"))?;

                let user = self
                    .deps
                    .identity_provider
                    .register(email.trim(), password)
                    .await?;
                let proof = self
                    .deps
                    .keypair_auth
                    .sign_linking_proof(&credential.pubkey, &user.uid)
                    .await?;
                self.deps.link_directory.link(&proof).await?;

                info!(uid = %user.uid, "backup account linked");
                self.handle.dispatch(SignupEvent::BackupLinked).await;
                Ok(())
            })
            .instrument(info_span!("signup_backup"))
            .await
    }

    pub async fn skip_backup(&self) -> SignupState {
        self.handle.dispatch(SignupEvent::BackupSkipped).await
    }

    /// Activate the pending credential, then run wallet and profile setup
    /// best-effort. Setup failures are logged and degraded to a minimal
    /// profile; they never fail the signup.
    pub async fn complete_login(&self) -> ActionResult<()> {
        self.handle
            .run_op(SignupOp::CompleteLogin, async {
                let state = self.handle.snapshot().await;
                if state.step != SignupStep::Complete || state.login_activated {
                    return Err(FlowError::NotAllowed("login activation"));
                }
                let credential = state
                    .created_login
                    .ok_or(FlowError::NotAllowed("login activation"))?;

                self.deps.session.activate(&credential).await?;
                self.handle.dispatch(SignupEvent::LoginActivated).await;

                let name = state
                    .generated_name
                    .as_deref()
                    .unwrap_or(&credential.generated_name);
                if let Err(err) = self
                    .deps
                    .account_setup
                    .setup_account(state.profile.as_ref(), name)
                    .await
                {
                    error!(error = %err, "account setup failed, falling back to minimal profile");
                    if let Err(err) = self.deps.account_setup.publish_minimal_profile(name).await {
                        warn!(error = %err, "minimal profile publication failed");
                    }
                }
                Ok(())
            })
            .instrument(info_span!("signup_complete_login"))
            .await
    }
}

/// UI copy for the signup steps.
pub fn step_title(step: SignupStep) -> &'static str {
    match step {
        SignupStep::UserType => "Join Encore",
        SignupStep::ArtistType => "Tell us about your act",
        SignupStep::ProfileSetup => "Set up your profile",
        SignupStep::BackupLink => "Back up your account",
        SignupStep::Complete => "You're in",
    }
}

pub fn step_description(step: SignupStep) -> &'static str {
    match step {
        SignupStep::UserType => "Are you here to listen, or to share your music?",
        SignupStep::ArtistType => "Solo artist or band?",
        SignupStep::ProfileSetup => "Pick a name and tell the community about yourself.",
        SignupStep::BackupLink => {
            "Add an email and password so you can recover this account later."
        }
        SignupStep::Complete => "Your account is ready.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;
    use uuid::Uuid;

    use encore_core::identity::{
        AuthCredentials, AuthMethod, ExternalUser, LinkedKeypair, LinkingProof, NostrAccount,
        PendingCredential, Pubkey,
    };
    use encore_core::ports::{
        IdentityProviderError, KeypairAuthError, LinkError, SessionError,
    };

    struct FakeSession {
        activations: AtomicUsize,
        fail_activation: bool,
    }

    impl FakeSession {
        fn new() -> Self {
            Self {
                activations: AtomicUsize::new(0),
                fail_activation: false,
            }
        }
    }

    #[async_trait::async_trait]
    impl SessionPort for FakeSession {
        async fn create_pending_credential(
            &self,
            hint: NameHint,
        ) -> Result<PendingCredential, SessionError> {
            let name = match hint {
                NameHint::Listener => "mellow-walrus",
                NameHint::SoloArtist => "velvet-finch",
                NameHint::Band => "neon-chorus",
                NameHint::Migrated => unreachable!("signup never uses the migration hint"),
            };
            Ok(PendingCredential {
                id: Uuid::new_v4(),
                pubkey: Pubkey::generate(),
                generated_name: name.to_string(),
            })
        }

        async fn activate(&self, _credential: &PendingCredential) -> Result<(), SessionError> {
            if self.fail_activation {
                return Err(SessionError::Activation("keychain locked".into()));
            }
            self.activations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FakeProvider {
        fail: bool,
    }

    #[async_trait::async_trait]
    impl IdentityProviderPort for FakeProvider {
        async fn authenticate(
            &self,
            _email: &str,
            _password: &Secret,
        ) -> Result<ExternalUser, IdentityProviderError> {
            unimplemented!("not used by signup")
        }

        async fn register(
            &self,
            email: &str,
            _password: &Secret,
        ) -> Result<ExternalUser, IdentityProviderError> {
            if self.fail {
                return Err(IdentityProviderError::Provider("email taken".into()));
            }
            Ok(ExternalUser {
                uid: "uid-new".into(),
                email: email.to_string(),
            })
        }
    }

    struct FakeAuth;

    #[async_trait::async_trait]
    impl KeypairAuthPort for FakeAuth {
        fn supported_methods(&self) -> Vec<AuthMethod> {
            vec![AuthMethod::Extension]
        }

        async fn authenticate(
            &self,
            _method: AuthMethod,
            _credentials: AuthCredentials,
        ) -> Result<NostrAccount, KeypairAuthError> {
            unimplemented!("not used by signup")
        }

        async fn sign_linking_proof(
            &self,
            pubkey: &Pubkey,
            external_account_id: &str,
        ) -> Result<LinkingProof, KeypairAuthError> {
            Ok(LinkingProof {
                pubkey: pubkey.clone(),
                external_account_id: external_account_id.to_string(),
                signature: "sig".into(),
                signed_at: Utc::now(),
            })
        }
    }

    struct FakeDirectory {
        links: AtomicUsize,
        fail_link: Option<LinkError>,
    }

    impl FakeDirectory {
        fn new() -> Self {
            Self {
                links: AtomicUsize::new(0),
                fail_link: None,
            }
        }
    }

    #[async_trait::async_trait]
    impl LinkDirectoryPort for FakeDirectory {
        async fn lookup(&self, _user: &ExternalUser) -> Result<Vec<LinkedKeypair>, LinkError> {
            Ok(Vec::new())
        }

        async fn link(&self, _proof: &LinkingProof) -> Result<(), LinkError> {
            if let Some(err) = &self.fail_link {
                return Err(err.clone());
            }
            self.links.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FakeSetup {
        fail_setup: bool,
        setups: AtomicUsize,
        minimal_publishes: AtomicUsize,
    }

    impl FakeSetup {
        fn new(fail_setup: bool) -> Self {
            Self {
                fail_setup,
                setups: AtomicUsize::new(0),
                minimal_publishes: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl AccountSetupPort for FakeSetup {
        async fn setup_account(
            &self,
            _profile: Option<&ProfileData>,
            _generated_name: &str,
        ) -> anyhow::Result<()> {
            if self.fail_setup {
                anyhow::bail!("wallet service unreachable");
            }
            self.setups.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn publish_minimal_profile(&self, _name: &str) -> anyhow::Result<()> {
            self.minimal_publishes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn sync_profile(&self, _pubkey: &Pubkey) -> anyhow::Result<Option<ProfileData>> {
            Ok(None)
        }
    }

    struct Harness {
        flow: SignupFlow,
        session: Arc<FakeSession>,
        directory: Arc<FakeDirectory>,
        setup: Arc<FakeSetup>,
    }

    fn harness_with(
        session: FakeSession,
        provider: FakeProvider,
        directory: FakeDirectory,
        setup: FakeSetup,
    ) -> Harness {
        let session = Arc::new(session);
        let directory = Arc::new(directory);
        let setup = Arc::new(setup);
        let flow = SignupFlow::new(SignupDeps {
            session: session.clone(),
            identity_provider: Arc::new(provider),
            keypair_auth: Arc::new(FakeAuth),
            link_directory: directory.clone(),
            account_setup: setup.clone(),
        });
        Harness {
            flow,
            session,
            directory,
            setup,
        }
    }

    fn harness() -> Harness {
        harness_with(
            FakeSession::new(),
            FakeProvider { fail: false },
            FakeDirectory::new(),
            FakeSetup::new(false),
        )
    }

    fn profile(name: &str) -> ProfileData {
        ProfileData {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn listener_path_runs_to_activation() {
        let h = harness();

        h.flow.choose_listener().await.unwrap();
        let state = h.flow.state().await;
        assert_eq!(state.step, SignupStep::ProfileSetup);
        assert_eq!(state.generated_name.as_deref(), Some("mellow-walrus"));

        h.flow.complete_profile(profile("Alice")).await.unwrap();
        assert_eq!(h.flow.state().await.step, SignupStep::Complete);

        h.flow.complete_login().await.unwrap();
        let state = h.flow.state().await;
        assert!(state.login_activated);
        assert_eq!(h.session.activations.load(Ordering::SeqCst), 1);
        assert_eq!(h.setup.setups.load(Ordering::SeqCst), 1);
        // Listeners never touch the link directory.
        assert_eq!(h.directory.links.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn artist_path_links_backup_before_completion() {
        let h = harness();

        h.flow.choose_artist().await;
        h.flow.choose_artist_type(true).await.unwrap();
        let state = h.flow.state().await;
        assert!(state.is_solo_artist);
        assert_eq!(state.generated_name.as_deref(), Some("velvet-finch"));

        h.flow.complete_profile(profile("Finch")).await.unwrap();
        assert_eq!(h.flow.state().await.step, SignupStep::BackupLink);

        h.flow
            .backup_account("finch@example.com", &Secret::new("hunter2"))
            .await
            .unwrap();
        assert_eq!(h.flow.state().await.step, SignupStep::Complete);
        assert_eq!(h.directory.links.load(Ordering::SeqCst), 1);
        // Activation has not run yet.
        assert_eq!(h.session.activations.load(Ordering::SeqCst), 0);

        h.flow.complete_login().await.unwrap();
        assert!(h.flow.state().await.login_activated);
    }

    #[tokio::test]
    async fn backup_can_be_skipped() {
        let h = harness();

        h.flow.choose_artist().await;
        h.flow.choose_artist_type(false).await.unwrap();
        h.flow.complete_profile(profile("The Chorus")).await.unwrap();

        h.flow.skip_backup().await;

        assert_eq!(h.flow.state().await.step, SignupStep::Complete);
        assert_eq!(h.directory.links.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_link_keeps_the_backup_step_and_session_untouched() {
        let mut directory = FakeDirectory::new();
        directory.fail_link = Some(LinkError::Network("offline".into()));
        let h = harness_with(
            FakeSession::new(),
            FakeProvider { fail: false },
            directory,
            FakeSetup::new(false),
        );

        h.flow.choose_artist().await;
        h.flow.choose_artist_type(true).await.unwrap();
        h.flow.complete_profile(profile("Finch")).await.unwrap();

        let result = h.flow
            .backup_account("finch@example.com", &Secret::new("hunter2"))
            .await;

        assert!(result.is_err());
        let state = h.flow.state().await;
        assert_eq!(state.step, SignupStep::BackupLink);
        assert!(state.tracker.error(SignupOp::BackupAccount).is_some());
        assert_eq!(h.session.activations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_backup_email_fails_before_the_provider_call() {
        let h = harness_with(
            FakeSession::new(),
            FakeProvider { fail: true },
            FakeDirectory::new(),
            FakeSetup::new(false),
        );

        h.flow.choose_artist().await;
        h.flow.choose_artist_type(true).await.unwrap();
        h.flow.complete_profile(profile("Finch")).await.unwrap();

        let result = h.flow.backup_account("nope", &Secret::new("x")).await;

        assert!(matches!(result, Err(FlowError::Validation(_))));
    }

    #[tokio::test]
    async fn empty_profile_name_is_rejected() {
        let h = harness();
        h.flow.choose_listener().await.unwrap();

        let result = h.flow.complete_profile(profile("   ")).await;

        assert!(matches!(result, Err(FlowError::Validation(_))));
        assert_eq!(h.flow.state().await.step, SignupStep::ProfileSetup);
    }

    #[tokio::test]
    async fn setup_failure_degrades_to_minimal_profile() {
        let h = harness_with(
            FakeSession::new(),
            FakeProvider { fail: false },
            FakeDirectory::new(),
            FakeSetup::new(true),
        );

        h.flow.choose_listener().await.unwrap();
        h.flow.complete_profile(profile("Alice")).await.unwrap();

        let result = h.flow.complete_login().await;

        assert!(result.is_ok());
        let state = h.flow.state().await;
        assert!(state.login_activated);
        assert_eq!(h.setup.minimal_publishes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn completion_before_the_final_step_is_not_allowed() {
        let h = harness();

        let result = h.flow.complete_login().await;

        assert!(matches!(result, Err(FlowError::NotAllowed(_))));
        assert_eq!(h.session.activations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn activation_is_single_shot() {
        let h = harness();

        h.flow.choose_listener().await.unwrap();
        h.flow.complete_profile(profile("Alice")).await.unwrap();
        h.flow.complete_login().await.unwrap();

        let result = h.flow.complete_login().await;

        assert!(matches!(result, Err(FlowError::NotAllowed(_))));
        assert_eq!(h.session.activations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn every_step_has_copy() {
        for step in [
            SignupStep::UserType,
            SignupStep::ArtistType,
            SignupStep::ProfileSetup,
            SignupStep::BackupLink,
            SignupStep::Complete,
        ] {
            assert!(!step_title(step).is_empty());
            assert!(!step_description(step).is_empty());
        }
    }

    #[tokio::test]
    async fn back_navigation_returns_to_the_branch_choice() {
        let h = harness();

        h.flow.choose_artist().await;
        h.flow.choose_artist_type(true).await.unwrap();
        assert_eq!(h.flow.state().await.step, SignupStep::ProfileSetup);

        let state = h.flow.go_back().await;
        assert_eq!(state.step, SignupStep::ArtistType);
    }
}
