//! Legacy migration state machine.
//!
//! Step graph:
//! ```text
//! ProviderAuth ──► CheckingLinks ──┬─ links found ──► LinkedKeypairAuth
//!                                  └─ no links ─────► AccountChoice
//!
//! LinkedKeypairAuth ──┬─ match ────────────────────► Complete
//!                     └─ mismatch ─► PubkeyMismatch ─┬─ retry ──► LinkedKeypairAuth
//!                                                    └─ accept ─► Complete
//!
//! LinkedKeypairAuth | AccountChoice ─┬─► AccountGeneration ─► ProfileSetup ─► Complete
//!                                    └─► BringOwnKeypair ──────────────────► Complete
//! ```
//! A matching linked-keypair authentication completes without a new
//! linking call: the link already exists. A mismatch is never resolved
//! automatically; the user chooses between retry and accept.

use crate::flow::{FlowSignal, FlowState};
use crate::identity::{
    ExternalUser, LinkedKeypair, NostrAccount, PendingCredential, ProfileData,
};
use crate::migration::{MigrationOp, MigrationState, MigrationStep};

#[derive(Debug)]
pub enum MigrationEvent {
    Signal(FlowSignal<MigrationOp>),
    /// Provider credentials accepted; the link lookup is next.
    ProviderAuthenticated { user: ExternalUser },
    /// Link lookup finished; branches on whether any links exist.
    LinksChecked { linked: Vec<LinkedKeypair> },
    LinkedAuthMatched { account: NostrAccount },
    LinkedAuthMismatched { account: NostrAccount },
    MismatchRetried,
    /// The divergent identity was accepted and linked.
    NewPubkeyAccepted,
    GenerateChosen,
    BringOwnChosen,
    /// Credential created and linked, not yet activated.
    AccountGenerated { credential: PendingCredential },
    /// External keypair authenticated, linked and activated.
    OwnKeypairLinked { account: NostrAccount },
    /// Profile staged and the pending login activated.
    ProfileCompleted { profile: ProfileData },
    /// Fallback activation without separately staged profile data.
    LoginActivated,
}

impl From<FlowSignal<MigrationOp>> for MigrationEvent {
    fn from(signal: FlowSignal<MigrationOp>) -> Self {
        MigrationEvent::Signal(signal)
    }
}

impl FlowState for MigrationState {
    type Op = MigrationOp;
    type Event = MigrationEvent;

    fn initial() -> Self {
        Self {
            step: MigrationStep::ProviderAuth,
            tracker: Default::default(),
            provider_user: None,
            linked_keypairs: Vec::new(),
            expected_pubkey: None,
            actual_pubkey: None,
            mismatched_account: None,
            generated_account: None,
            created_login: None,
            generated_name: None,
            profile: None,
            login_activated: false,
        }
    }

    fn apply(self, event: MigrationEvent) -> Self {
        MigrationMachine::transition(self, event)
    }
}

pub struct MigrationMachine;

impl MigrationMachine {
    pub fn transition(mut state: MigrationState, event: MigrationEvent) -> MigrationState {
        if let MigrationEvent::Signal(signal) = &event {
            if state.tracker.apply(signal) {
                return state;
            }
        }

        match (state.step, event) {
            (_, MigrationEvent::Signal(FlowSignal::Reset)) => MigrationState::initial(),
            (_, MigrationEvent::Signal(FlowSignal::Back)) => {
                if let Some(previous) = Self::previous_step(&state) {
                    state.step = previous;
                }
                state
            }
            (MigrationStep::ProviderAuth, MigrationEvent::ProviderAuthenticated { user }) => {
                state.provider_user = Some(user);
                state.step = MigrationStep::CheckingLinks;
                state
            }
            (MigrationStep::CheckingLinks, MigrationEvent::LinksChecked { linked }) => {
                state.expected_pubkey =
                    LinkedKeypair::most_recently_linked(&linked).map(|key| key.pubkey.clone());
                state.linked_keypairs = linked;
                state.step = if state.linked_keypairs.is_empty() {
                    MigrationStep::AccountChoice
                } else {
                    MigrationStep::LinkedKeypairAuth
                };
                state
            }
            (MigrationStep::LinkedKeypairAuth, MigrationEvent::LinkedAuthMatched { account }) => {
                // The link already exists; completing without a linking
                // call is the idempotent path.
                state.actual_pubkey = None;
                state.mismatched_account = None;
                state.login_activated = true;
                state.profile = account.profile.clone();
                state.step = MigrationStep::Complete;
                state
            }
            (
                MigrationStep::LinkedKeypairAuth,
                MigrationEvent::LinkedAuthMismatched { account },
            ) => {
                // expected_pubkey stays untouched; the user must choose.
                state.actual_pubkey = Some(account.pubkey.clone());
                state.mismatched_account = Some(account);
                state.step = MigrationStep::PubkeyMismatch;
                state
            }
            (MigrationStep::PubkeyMismatch, MigrationEvent::MismatchRetried) => {
                state.actual_pubkey = None;
                state.mismatched_account = None;
                state.step = MigrationStep::LinkedKeypairAuth;
                state
            }
            (MigrationStep::PubkeyMismatch, MigrationEvent::NewPubkeyAccepted) => {
                // The divergence is resolved either way; mismatch fields
                // never outlive it.
                state.actual_pubkey = None;
                state.mismatched_account = None;
                state.login_activated = true;
                state.step = MigrationStep::Complete;
                state
            }
            (MigrationStep::LinkedKeypairAuth, MigrationEvent::GenerateChosen)
            | (MigrationStep::AccountChoice, MigrationEvent::GenerateChosen) => {
                state.step = MigrationStep::AccountGeneration;
                state
            }
            (MigrationStep::LinkedKeypairAuth, MigrationEvent::BringOwnChosen)
            | (MigrationStep::AccountChoice, MigrationEvent::BringOwnChosen) => {
                state.step = MigrationStep::BringOwnKeypair;
                state
            }
            (MigrationStep::AccountGeneration, MigrationEvent::AccountGenerated { credential }) => {
                state.generated_name = Some(credential.generated_name.clone());
                state.generated_account = Some(credential.clone());
                state.created_login = Some(credential);
                state.step = MigrationStep::ProfileSetup;
                state
            }
            (MigrationStep::BringOwnKeypair, MigrationEvent::OwnKeypairLinked { account }) => {
                state.profile = account.profile.clone();
                state.login_activated = true;
                state.step = MigrationStep::Complete;
                state
            }
            (MigrationStep::ProfileSetup, MigrationEvent::ProfileCompleted { profile }) => {
                state.profile = Some(profile);
                state.login_activated = true;
                state.step = MigrationStep::Complete;
                state
            }
            (MigrationStep::ProfileSetup, MigrationEvent::LoginActivated) => {
                state.login_activated = true;
                state.step = MigrationStep::Complete;
                state
            }
            (_step, _event) => state,
        }
    }

    /// Backward navigation table. `CheckingLinks` is skipped on the way
    /// back from `LinkedKeypairAuth` since its result is cached; nothing
    /// leads back out of `Complete`.
    pub fn previous_step(state: &MigrationState) -> Option<MigrationStep> {
        match state.step {
            MigrationStep::ProviderAuth | MigrationStep::Complete => None,
            MigrationStep::CheckingLinks => Some(MigrationStep::ProviderAuth),
            MigrationStep::LinkedKeypairAuth => Some(MigrationStep::ProviderAuth),
            MigrationStep::PubkeyMismatch => Some(MigrationStep::LinkedKeypairAuth),
            MigrationStep::AccountChoice => Some(MigrationStep::ProviderAuth),
            MigrationStep::AccountGeneration | MigrationStep::BringOwnKeypair => {
                Some(if state.has_linked_keypairs() {
                    MigrationStep::LinkedKeypairAuth
                } else {
                    MigrationStep::AccountChoice
                })
            }
            MigrationStep::ProfileSetup => Some(MigrationStep::AccountGeneration),
        }
    }
}
