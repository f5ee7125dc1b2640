//! Migration errors

use thiserror::Error;

use crate::store::StoreError;

/// Result type for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Migration errors
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Another process holds the migration mutex
    #[error("mutex locked (held by {holder})")]
    MutexLocked { holder: String },

    /// No migration with the name
    #[error("could not find the migration '{0}'")]
    UnknownMigration(String),

    /// The migration was never applied
    #[error("migration '{0}' was never applied")]
    NotApplied(String),

    /// The migration cannot be rolled back
    #[error("migration '{0}' does not have a down step")]
    NoDownStep(String),

    /// A migration step failed
    #[error("migration '{name}' failed: {reason}")]
    Failed { name: String, reason: String },

    /// Store failure
    #[error("{0}")]
    Store(#[from] StoreError),
}
