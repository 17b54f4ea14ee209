//! Application layer: flow orchestrators over the core state machines.
//!
//! Each flow owns a [`encore_core::flow::FlowHandle`] and a bundle of
//! injected ports, and exposes one async method per user intent. The
//! view layer observes state through the handle's watch channel.

pub mod flows;

pub use flows::login::{LoginDeps, LoginFlow};
pub use flows::migration::{MigrationConfig, MigrationDeps, MigrationFlow};
pub use flows::signup::{SignupDeps, SignupFlow};
