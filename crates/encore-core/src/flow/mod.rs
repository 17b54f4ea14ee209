//! Shared flow plumbing.
//!
//! Every authentication flow is a pure state machine advanced by a closed
//! event enum. The pieces here are common to all of them: per-operation
//! loading/error bookkeeping, the signal set produced by async actions, and
//! the handle that owns a flow's state and runs its async actions.

pub mod error;
pub mod handle;
pub mod tracker;

pub use error::{ActionResult, FlowError};
pub use handle::{FlowHandle, FlowState};
pub use tracker::{FlowSignal, OpTracker};
