//! Signup domain module.
//!
//! New-account signup state machine: listener and artist branches.

pub mod machine;

pub use machine::{SignupEvent, SignupMachine, SignupOp, SignupState, SignupStep};
