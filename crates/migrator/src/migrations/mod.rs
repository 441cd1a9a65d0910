//! Migration System
//!
//! The engine is split by concern: entity definitions, the file format, range
//! resolution, reconciliation with the adapter history, the runner that
//! applies state transitions, and the [`Migrator`] facade on top of them.

pub mod definitions;
pub mod format;
pub mod manager;
pub mod range;
pub mod reconcile;
pub mod runner;

pub use definitions::*;
pub use format::MigrationFormat;
pub use manager::Migrator;
pub use range::MigrationRange;
pub use reconcile::reconcile;
pub use runner::MigrationRunner;
