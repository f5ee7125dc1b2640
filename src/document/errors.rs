//! Resource operation errors

use thiserror::Error;

use super::hooks::HookError;
use crate::schema::{SchemaError, ValidationError};
use crate::store::StoreError;

/// Result type for resource operations
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Errors of resource operations
#[derive(Debug, Error)]
pub enum ResourceError {
    /// Document failed schema validation
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// No document with the id
    #[error("{resource} '{id}' not found")]
    NotFound { resource: String, id: String },

    /// A lifecycle hook failed
    #[error("{0}")]
    Hook(#[from] HookError),

    /// Store failure
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Schema lookup or compilation failure
    #[error("{0}")]
    Schema(#[from] SchemaError),
}

impl ResourceError {
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// HTTP status code a transport layer reports for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ResourceError::NotFound { .. } => 404,
            ResourceError::Schema(SchemaError::UnknownResource(_)) => 404,
            ResourceError::Validation(_) => 422,
            ResourceError::Hook(_) | ResourceError::Store(_) | ResourceError::Schema(_) => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ResourceError::NotFound { .. })
    }

    /// The validation error, if this is one
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            ResourceError::Validation(e) => Some(e),
            _ => None,
        }
    }
}
