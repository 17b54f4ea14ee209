use crate::ports::{IdentityProviderError, KeypairAuthError, LinkError, SessionError};

/// Uniform contract every async flow action returns to its caller.
///
/// Failures never escape an action as a panic or a raw dependency error;
/// they are converted to [`FlowError`] and also recorded in the flow state's
/// operation tracker.
pub type ActionResult<T> = Result<T, FlowError>;

/// Errors produced by flow actions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    /// Invalid or missing input, caught before any dependency is called.
    #[error("invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    IdentityProvider(#[from] IdentityProviderError),

    #[error(transparent)]
    KeypairAuth(#[from] KeypairAuthError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// The action is not defined for the flow's current step.
    #[error("{0} is not allowed at the current step")]
    NotAllowed(&'static str),
}

impl FlowError {
    /// Message suitable for direct display to an end user.
    ///
    /// Link failures in particular must not surface raw transport errors:
    /// the user is choosing between retry/continue options and needs an
    /// actionable description.
    pub fn user_message(&self) -> String {
        match self {
            FlowError::Validation(msg) => msg.clone(),
            FlowError::Link(err) => err.user_message().to_string(),
            other => other.to_string(),
        }
    }
}
