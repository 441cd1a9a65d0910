//! Adapter contract
//!
//! An adapter runs migration commands against a concrete store and keeps the
//! history of applied migrations. The engine depends on this trait only.

use async_trait::async_trait;

use crate::error::AdapterError;
use crate::migrations::{AppliedMigration, Migration};

/// Result type for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Storage backend driven by the migration engine
#[async_trait]
pub trait MigrationAdapter: Send + Sync {
    /// Run one migration command (an up or down payload) against the store
    async fn execute(&self, command: &str) -> AdapterResult<()>;

    /// Full applied history, in any order
    async fn list_applied(&self) -> AdapterResult<Vec<AppliedMigration>>;

    /// Persist `migration` as applied at [`Migration::applied_at`]
    async fn record_applied(&self, migration: &Migration) -> AdapterResult<()>;

    /// Remove `migration` from the history.
    ///
    /// Called after the down command of the bootstrap migration too, which
    /// usually destroyed the history store already; check
    /// [`Migration::is_initial`] to skip it.
    async fn record_rolled_back(&self, migration: &Migration) -> AdapterResult<()>;

    /// Up and down commands of the migration that creates this adapter's
    /// history store
    fn bootstrap_migration(&self, name: &str) -> (String, String);
}
