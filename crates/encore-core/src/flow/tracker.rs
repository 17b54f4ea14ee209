use std::collections::HashMap;
use std::hash::Hash;

use crate::flow::FlowError;

/// Signals shared by every flow.
///
/// `Started`/`Succeeded`/`Failed` are emitted by the async action runner
/// around each named operation; `Reset` and `Back` come straight from the
/// caller.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowSignal<Op> {
    Started(Op),
    Succeeded(Op),
    Failed(Op, FlowError),
    Reset,
    Back,
}

/// Per-operation loading and error bookkeeping.
///
/// Loading is tracked per operation name, not globally, so independent
/// actions can each show their own pending state. The tracker is the shared
/// half of every flow's transition function: flows offer signals to
/// [`OpTracker::apply`] first and only handle what it declines.
#[derive(Debug, Clone, PartialEq)]
pub struct OpTracker<Op: Copy + Eq + Hash> {
    loading: HashMap<Op, bool>,
    errors: HashMap<Op, FlowError>,
}

impl<Op: Copy + Eq + Hash> Default for OpTracker<Op> {
    fn default() -> Self {
        Self {
            loading: HashMap::new(),
            errors: HashMap::new(),
        }
    }
}

impl<Op: Copy + Eq + Hash> OpTracker<Op> {
    /// Mark an operation as in flight and clear its previous error.
    pub fn begin(&mut self, op: Op) {
        self.loading.insert(op, true);
        self.errors.remove(&op);
    }

    pub fn succeed(&mut self, op: Op) {
        self.loading.insert(op, false);
    }

    /// A new failure overwrites the previous one for the same operation.
    pub fn fail(&mut self, op: Op, err: FlowError) {
        self.loading.insert(op, false);
        self.errors.insert(op, err);
    }

    pub fn is_loading(&self, op: Op) -> bool {
        self.loading.get(&op).copied().unwrap_or(false)
    }

    pub fn any_loading(&self) -> bool {
        self.loading.values().any(|loading| *loading)
    }

    pub fn error(&self, op: Op) -> Option<&FlowError> {
        self.errors.get(&op)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Handle the shared signals; returns `false` for `Reset`/`Back` so the
    /// flow-specific transition supplies the real move.
    pub fn apply(&mut self, signal: &FlowSignal<Op>) -> bool {
        match signal {
            FlowSignal::Started(op) => {
                self.begin(*op);
                true
            }
            FlowSignal::Succeeded(op) => {
                self.succeed(*op);
                true
            }
            FlowSignal::Failed(op, err) => {
                self.fail(*op, err.clone());
                true
            }
            FlowSignal::Reset | FlowSignal::Back => false,
        }
    }
}
