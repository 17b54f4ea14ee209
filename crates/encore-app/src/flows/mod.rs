//! Flow orchestrators.

pub mod login;
pub mod migration;
pub mod signup;

use encore_core::flow::FlowError;
use encore_core::identity::Secret;

/// Minimal shape check before the provider sees the address.
pub(crate) fn validate_email(email: &str) -> Result<(), FlowError> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err(FlowError::Validation("email is required".into()));
    }
    if !trimmed.contains('@') {
        return Err(FlowError::Validation("enter a valid email address".into()));
    }
    Ok(())
}

pub(crate) fn validate_password(password: &Secret) -> Result<(), FlowError> {
    if password.is_empty() {
        return Err(FlowError::Validation("password is required".into()));
    }
    Ok(())
}
