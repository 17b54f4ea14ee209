//! # encore-core
//!
//! Core domain models and authentication flow state machines for Encore.
//!
//! This crate contains pure orchestration logic without any infrastructure
//! dependencies. External systems (identity provider, protocol signer,
//! link directory, wallet/profile setup) are consumed through ports.

// Public module exports
pub mod flow;
pub mod identity;
pub mod login;
pub mod migration;
pub mod ports;
pub mod signup;

// Re-export commonly used types at the crate root
pub use flow::{ActionResult, FlowError, FlowHandle, FlowSignal, FlowState, OpTracker};
pub use identity::{
    AuthCredentials, AuthMethod, ExternalUser, LinkedKeypair, LinkingProof, NameHint,
    NostrAccount, PendingCredential, ProfileData, Pubkey, Secret,
};
