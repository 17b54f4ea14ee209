//! Direct protocol-native login state machine.
//!
//! Two steps only: authenticate a keypair, done. Credential methods are
//! advertised by the authenticator port, not sensed from the environment.

use serde::Serialize;

use crate::flow::{FlowSignal, FlowState, OpTracker};
use crate::identity::NostrAccount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoginStep {
    Auth,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoginOp {
    Authenticate,
}

#[derive(Debug)]
pub enum LoginEvent {
    Signal(FlowSignal<LoginOp>),
    Authenticated { account: NostrAccount },
}

impl From<FlowSignal<LoginOp>> for LoginEvent {
    fn from(signal: FlowSignal<LoginOp>) -> Self {
        LoginEvent::Signal(signal)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoginState {
    pub step: LoginStep,
    pub tracker: OpTracker<LoginOp>,
    pub account: Option<NostrAccount>,
}

impl FlowState for LoginState {
    type Op = LoginOp;
    type Event = LoginEvent;

    fn initial() -> Self {
        Self {
            step: LoginStep::Auth,
            tracker: OpTracker::default(),
            account: None,
        }
    }

    fn apply(self, event: LoginEvent) -> Self {
        LoginMachine::transition(self, event)
    }
}

pub struct LoginMachine;

impl LoginMachine {
    pub fn transition(mut state: LoginState, event: LoginEvent) -> LoginState {
        if let LoginEvent::Signal(signal) = &event {
            if state.tracker.apply(signal) {
                return state;
            }
        }

        match (state.step, event) {
            (_, LoginEvent::Signal(FlowSignal::Reset)) => LoginState::initial(),
            // Auth is the first step; there is nowhere to go back to.
            (_, LoginEvent::Signal(FlowSignal::Back)) => state,
            (LoginStep::Auth, LoginEvent::Authenticated { account }) => {
                state.account = Some(account);
                state.step = LoginStep::Complete;
                state
            }
            (_step, _event) => state,
        }
    }
}
