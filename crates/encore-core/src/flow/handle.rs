use std::fmt;
use std::future::Future;
use std::hash::Hash;

use tokio::sync::{watch, Mutex};
use tracing::debug;

use crate::flow::{ActionResult, FlowSignal};

/// A flow's state: a pure transition function over a closed event enum.
///
/// Implementations must offer [`FlowSignal`] events to their operation
/// tracker before handling anything flow-specific, and must leave the state
/// unchanged for (step, event) pairs they do not define.
pub trait FlowState: Clone + Send + Sync + fmt::Debug + 'static {
    type Op: Copy + Eq + Hash + Send + Sync + fmt::Debug;
    type Event: Send + fmt::Debug + From<FlowSignal<Self::Op>>;

    fn initial() -> Self;

    fn apply(self, event: Self::Event) -> Self;
}

/// Owns one flow instance's state and drives it.
///
/// Dispatches are serialized behind the mutex: one flow instance is only
/// ever advanced by one caller at a time. Observers (the view layer)
/// subscribe to the watch channel instead of sensing state ambiently.
pub struct FlowHandle<S: FlowState> {
    state: Mutex<S>,
    tx: watch::Sender<S>,
}

impl<S: FlowState> FlowHandle<S> {
    pub fn new() -> Self {
        let initial = S::initial();
        let (tx, _rx) = watch::channel(initial.clone());
        Self {
            state: Mutex::new(initial),
            tx,
        }
    }

    /// Subscribe to state changes. The receiver always holds the latest
    /// state; intermediate states may be skipped under load.
    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.tx.subscribe()
    }

    pub async fn snapshot(&self) -> S {
        self.state.lock().await.clone()
    }

    /// Apply one event and notify observers.
    pub async fn dispatch(&self, event: S::Event) -> S {
        let mut guard = self.state.lock().await;
        debug!(?event, "flow event dispatched");
        let next = guard.clone().apply(event);
        *guard = next.clone();
        // Send fails only when no observer is subscribed, which is fine.
        let _ = self.tx.send(next.clone());
        next
    }

    /// Discard the flow state and rebuild the initial one.
    pub async fn reset(&self) -> S {
        self.dispatch(FlowSignal::Reset.into()).await
    }

    pub async fn go_back(&self) -> S {
        self.dispatch(FlowSignal::Back.into()).await
    }

    /// Run one named async operation with uniform bookkeeping.
    ///
    /// Dispatches `Started(op)` (loading true, previous error cleared),
    /// awaits the future to completion, then dispatches `Succeeded`/`Failed`
    /// before returning. The state lock is not held across the await; the
    /// future may itself dispatch intermediate events.
    pub async fn run_op<T, F>(&self, op: S::Op, fut: F) -> ActionResult<T>
    where
        F: Future<Output = ActionResult<T>>,
    {
        self.dispatch(FlowSignal::Started(op).into()).await;
        match fut.await {
            Ok(value) => {
                self.dispatch(FlowSignal::Succeeded(op).into()).await;
                Ok(value)
            }
            Err(err) => {
                self.dispatch(FlowSignal::Failed(op, err.clone()).into()).await;
                Err(err)
            }
        }
    }
}

impl<S: FlowState> Default for FlowHandle<S> {
    fn default() -> Self {
        Self::new()
    }
}
