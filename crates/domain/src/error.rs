//! Domain error types.

use thiserror::Error;

/// Errors raised synchronously by aggregate methods.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A required argument was unset or out of range.
    #[error("Invalid argument `{argument}`: {reason}")]
    InvalidArgument {
        argument: &'static str,
        reason: &'static str,
    },
}

impl DomainError {
    /// Error for an argument that must be set.
    pub fn required(argument: &'static str) -> Self {
        DomainError::InvalidArgument {
            argument,
            reason: "value is required",
        }
    }
}
