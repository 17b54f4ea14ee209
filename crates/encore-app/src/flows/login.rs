//! Direct login orchestrator.
//!
//! One async operation: authenticate a keypair with whatever method the
//! authenticator supports. Profile sync afterwards is best-effort; the
//! login never fails because of it.

use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument};

use encore_core::flow::{ActionResult, FlowHandle};
use encore_core::identity::{AuthCredentials, AuthMethod};
use encore_core::login::{LoginEvent, LoginOp, LoginState, LoginStep};
use encore_core::ports::{AccountSetupPort, KeypairAuthPort};

pub struct LoginDeps {
    pub keypair_auth: Arc<dyn KeypairAuthPort>,
    pub account_setup: Arc<dyn AccountSetupPort>,
}

pub struct LoginFlow {
    handle: FlowHandle<LoginState>,
    deps: LoginDeps,
    /// Queried once at construction; the set does not change mid-flow.
    methods: Vec<AuthMethod>,
}

impl LoginFlow {
    pub fn new(deps: LoginDeps) -> Self {
        let methods = deps.keypair_auth.supported_methods();
        Self {
            handle: FlowHandle::new(),
            deps,
            methods,
        }
    }

    pub fn supported_methods(&self) -> &[AuthMethod] {
        &self.methods
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<LoginState> {
        self.handle.subscribe()
    }

    pub async fn state(&self) -> LoginState {
        self.handle.snapshot().await
    }

    pub async fn reset(&self) -> LoginState {
        self.handle.reset().await
    }

    /// Authenticate and complete the login.
    pub async fn authenticate(
        &self,
        method: AuthMethod,
        credentials: AuthCredentials,
    ) -> ActionResult<()> {
        self.handle
            .run_op(LoginOp::Authenticate, async {
                let mut account = self.deps.keypair_auth.authenticate(method, credentials).await?;

                // Freshen the profile if the network cooperates. A failure
                // here must not undo a valid authentication.
                match self.deps.account_setup.sync_profile(&account.pubkey).await {
                    Ok(Some(profile)) => account.profile = Some(profile),
                    Ok(None) => {}
                    Err(err) => {
                        warn!(error = %err, "profile sync failed after login, continuing");
                    }
                }

                info!(pubkey = %account.pubkey, "login complete");
                self.handle.dispatch(LoginEvent::Authenticated { account }).await;
                Ok(())
            })
            .instrument(info_span!("login_authenticate", ?method))
            .await
    }
}

/// UI copy for the login steps.
pub fn step_title(step: LoginStep) -> &'static str {
    match step {
        LoginStep::Auth => "Sign in",
        LoginStep::Complete => "Welcome back",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use encore_core::identity::{LinkingProof, NostrAccount, ProfileData, Pubkey};
    use encore_core::login::LoginStep;
    use encore_core::ports::KeypairAuthError;

    struct FakeAuth {
        result: Result<NostrAccount, KeypairAuthError>,
    }

    #[async_trait::async_trait]
    impl KeypairAuthPort for FakeAuth {
        fn supported_methods(&self) -> Vec<AuthMethod> {
            vec![AuthMethod::Extension, AuthMethod::RawKey]
        }

        async fn authenticate(
            &self,
            _method: AuthMethod,
            _credentials: AuthCredentials,
        ) -> Result<NostrAccount, KeypairAuthError> {
            self.result.clone()
        }

        async fn sign_linking_proof(
            &self,
            _pubkey: &Pubkey,
            _external_account_id: &str,
        ) -> Result<LinkingProof, KeypairAuthError> {
            unimplemented!("not used by login")
        }
    }

    struct FakeSetup {
        sync_result: Result<Option<ProfileData>, String>,
        sync_calls: AtomicUsize,
    }

    impl FakeSetup {
        fn new(sync_result: Result<Option<ProfileData>, String>) -> Self {
            Self {
                sync_result,
                sync_calls: AtomicUsize::new(0),
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
            Ok(())
        }

        async fn publish_minimal_profile(&self, _name: &str) -> anyhow::Result<()> {
            Ok(())
        }

        async fn sync_profile(&self, _pubkey: &Pubkey) -> anyhow::Result<Option<ProfileData>> {
            self.sync_calls.fetch_add(1, Ordering::SeqCst);
            self.sync_result
                .clone()
                .map_err(|message| anyhow::anyhow!(message))
        }
    }

    fn account() -> NostrAccount {
        NostrAccount {
            pubkey: Pubkey::new("aa"),
            profile: None,
        }
    }

    fn flow(
        auth: Result<NostrAccount, KeypairAuthError>,
        sync: Result<Option<ProfileData>, String>,
    ) -> LoginFlow {
        LoginFlow::new(LoginDeps {
            keypair_auth: Arc::new(FakeAuth { result: auth }),
            account_setup: Arc::new(FakeSetup::new(sync)),
        })
    }

    #[tokio::test]
    async fn successful_auth_completes_with_synced_profile() {
        let profile = ProfileData {
            name: "alice".into(),
            ..Default::default()
        };
        let flow = flow(Ok(account()), Ok(Some(profile.clone())));

        let result = flow
            .authenticate(AuthMethod::Extension, AuthCredentials::Extension)
            .await;

        assert!(result.is_ok());
        let state = flow.state().await;
        assert_eq!(state.step, LoginStep::Complete);
        assert_eq!(
            state.account.and_then(|account| account.profile),
            Some(profile)
        );
        assert!(!state.tracker.is_loading(LoginOp::Authenticate));
    }

    #[tokio::test]
    async fn failed_auth_stays_at_auth_with_an_error() {
        let flow = flow(
            Err(KeypairAuthError::Rejected("bad signature".into())),
            Ok(None),
        );

        let result = flow
            .authenticate(AuthMethod::Extension, AuthCredentials::Extension)
            .await;

        assert!(result.is_err());
        let state = flow.state().await;
        assert_eq!(state.step, LoginStep::Auth);
        assert!(state.tracker.error(LoginOp::Authenticate).is_some());
        assert!(!state.tracker.is_loading(LoginOp::Authenticate));
    }

    #[tokio::test]
    async fn sync_failure_does_not_block_login() {
        let flow = flow(Ok(account()), Err("relay timeout".into()));

        let result = flow
            .authenticate(AuthMethod::Extension, AuthCredentials::Extension)
            .await;

        assert!(result.is_ok());
        let state = flow.state().await;
        assert_eq!(state.step, LoginStep::Complete);
        assert!(state.tracker.error(LoginOp::Authenticate).is_none());
    }

    #[tokio::test]
    async fn methods_are_cached_at_construction() {
        let flow = flow(Ok(account()), Ok(None));
        assert_eq!(
            flow.supported_methods(),
            &[AuthMethod::Extension, AuthMethod::RawKey]
        );
    }
}
