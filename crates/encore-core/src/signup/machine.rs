//! Signup state machine.
//!
//! Pure transition function for the new-account signup flow.
//!
//! Step graph:
//! ```text
//! UserType
//!  ├── listener ──────────────► ProfileSetup ──► Complete
//!  └── artist ──► ArtistType ─► ProfileSetup ──► BackupLink ──► Complete
//! ```
//! Listeners get a pending credential eagerly at the user-type choice;
//! artists get it only after the band/solo choice, since that choice
//! affects the generated identity. Listeners skip the backup step.

use serde::Serialize;

use crate::flow::{FlowSignal, FlowState, OpTracker};
use crate::identity::{PendingCredential, ProfileData};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignupStep {
    UserType,
    ArtistType,
    ProfileSetup,
    /// Optional external backup identity for artists.
    BackupLink,
    Complete,
}

/// Named async operations tracked independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignupOp {
    SetUserType,
    SetArtistType,
    CompleteProfile,
    BackupAccount,
    CompleteLogin,
}

#[derive(Debug)]
pub enum SignupEvent {
    Signal(FlowSignal<SignupOp>),
    UserTypeChosen {
        is_artist: bool,
        credential: Option<PendingCredential>,
    },
    ArtistTypeChosen {
        is_solo: bool,
        credential: PendingCredential,
    },
    ProfileStaged {
        profile: ProfileData,
    },
    BackupLinked,
    BackupSkipped,
    LoginActivated,
}

impl From<FlowSignal<SignupOp>> for SignupEvent {
    fn from(signal: FlowSignal<SignupOp>) -> Self {
        SignupEvent::Signal(signal)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignupState {
    pub step: SignupStep,
    pub tracker: OpTracker<SignupOp>,
    pub is_artist: bool,
    pub is_solo_artist: bool,
    /// Created but not yet activated; not an authenticated session.
    pub created_login: Option<PendingCredential>,
    pub generated_name: Option<String>,
    pub profile: Option<ProfileData>,
    pub login_activated: bool,
}

impl SignupState {
    pub fn can_go_back(&self) -> bool {
        SignupMachine::previous_step(self).is_some()
    }
}

impl FlowState for SignupState {
    type Op = SignupOp;
    type Event = SignupEvent;

    fn initial() -> Self {
        Self {
            step: SignupStep::UserType,
            tracker: OpTracker::default(),
            is_artist: false,
            is_solo_artist: false,
            created_login: None,
            generated_name: None,
            profile: None,
            login_activated: false,
        }
    }

    fn apply(self, event: SignupEvent) -> Self {
        SignupMachine::transition(self, event)
    }
}

pub struct SignupMachine;

impl SignupMachine {
    pub fn transition(mut state: SignupState, event: SignupEvent) -> SignupState {
        if let SignupEvent::Signal(signal) = &event {
            if state.tracker.apply(signal) {
                return state;
            }
        }

        match (state.step, event) {
            (_, SignupEvent::Signal(FlowSignal::Reset)) => SignupState::initial(),
            (_, SignupEvent::Signal(FlowSignal::Back)) => {
                if let Some(previous) = Self::previous_step(&state) {
                    state.step = previous;
                }
                state
            }
            (
                SignupStep::UserType,
                SignupEvent::UserTypeChosen {
                    is_artist,
                    credential,
                },
            ) => {
                state.is_artist = is_artist;
                state.generated_name = credential
                    .as_ref()
                    .map(|pending| pending.generated_name.clone());
                state.created_login = credential;
                state.step = if is_artist {
                    SignupStep::ArtistType
                } else {
                    SignupStep::ProfileSetup
                };
                state
            }
            (
                SignupStep::ArtistType,
                SignupEvent::ArtistTypeChosen {
                    is_solo,
                    credential,
                },
            ) => {
                state.is_solo_artist = is_solo;
                state.generated_name = Some(credential.generated_name.clone());
                state.created_login = Some(credential);
                state.step = SignupStep::ProfileSetup;
                state
            }
            (SignupStep::ProfileSetup, SignupEvent::ProfileStaged { profile }) => {
                state.profile = Some(profile);
                // Listeners skip backup entirely.
                state.step = if state.is_artist {
                    SignupStep::BackupLink
                } else {
                    SignupStep::Complete
                };
                state
            }
            (SignupStep::BackupLink, SignupEvent::BackupLinked)
            | (SignupStep::BackupLink, SignupEvent::BackupSkipped) => {
                state.step = SignupStep::Complete;
                state
            }
            (SignupStep::Complete, SignupEvent::LoginActivated) => {
                state.login_activated = true;
                state
            }
            (_step, _event) => state,
        }
    }

    /// Backward navigation table. Listeners have no intermediate step
    /// between user-type and profile-setup; `Complete` is terminal.
    pub fn previous_step(state: &SignupState) -> Option<SignupStep> {
        match state.step {
            SignupStep::UserType | SignupStep::Complete => None,
            SignupStep::ArtistType => Some(SignupStep::UserType),
            SignupStep::ProfileSetup => Some(if state.is_artist {
                SignupStep::ArtistType
            } else {
                SignupStep::UserType
            }),
            SignupStep::BackupLink => Some(SignupStep::ProfileSetup),
        }
    }
}
