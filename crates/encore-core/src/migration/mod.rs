//! Legacy migration domain module.
//!
//! Migrates a centralized email/password identity into a decentralized
//! keypair identity, including pubkey-mismatch conflict resolution.

pub mod machine;
pub mod state;

pub use machine::{MigrationEvent, MigrationMachine};
pub use state::{MigrationOp, MigrationState, MigrationStep};
