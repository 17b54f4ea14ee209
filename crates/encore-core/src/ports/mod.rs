//! Port interfaces for the application layer.
//!
//! Ports define the contract between the flow orchestration logic and
//! infrastructure implementations (identity provider, protocol signer,
//! link directory, session store, wallet/profile setup). This follows
//! Hexagonal Architecture principles: the flows never touch a concrete
//! backend, they are parameterized by these traits.

pub mod account_setup;
pub mod identity_provider;
pub mod keypair_auth;
pub mod link_directory;
pub mod session;

pub use account_setup::AccountSetupPort;
pub use identity_provider::{IdentityProviderError, IdentityProviderPort};
pub use keypair_auth::{KeypairAuthError, KeypairAuthPort};
pub use link_directory::{LinkDirectoryPort, LinkError};
pub use session::{SessionError, SessionPort};
