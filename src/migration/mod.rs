//! Data migrations
//!
//! Ordered, named migrations applied against the document store. Applied
//! migrations are recorded in the `migrations` table; a mutex record in the
//! same table keeps two processes from migrating at once.

mod errors;
mod migrator;
mod mutex;

pub use errors::{MigrationError, MigrationResult};
pub use migrator::{Migration, MigrationStatus, Migrator};
pub use mutex::{MigrationMutex, MUTEX_NAME};

/// Table holding migration records and the mutex record
pub const MIGRATIONS_TABLE: &str = "migrations";
