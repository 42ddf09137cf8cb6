//! Application error types.

use domain::{DomainError, ValidationErrorDetail};
use store::StoreError;
use thiserror::Error;

/// Errors returned by the application services.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// The requested entity does not exist (or is soft-deleted).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The write clashes with existing data.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Input failed the entity's field rules.
    #[error("Validation failed with {} error(s)", .0.len())]
    Validation(Vec<ValidationErrorDetail>),

    /// An aggregate rejected the operation.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The repository failed.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl ApplicationError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ApplicationError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<StoreError> for ApplicationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => ApplicationError::NotFound { entity, id },
            StoreError::Duplicate { entity, key } => {
                ApplicationError::Conflict(format!("{entity} already exists: {key}"))
            }
            StoreError::Constraint(msg) => ApplicationError::Conflict(msg),
            other => ApplicationError::Store(other),
        }
    }
}

/// Result type for application services.
pub type Result<T> = std::result::Result<T, ApplicationError>;
