//! # elif-migrator
//!
//! A file-based migration engine for the elif.rs framework.
//!
//! Migrations live as text files named `<sequence>_<name><extension>`, each
//! holding an up and a down command between marker lines. A
//! [`MigrationAdapter`] runs those commands against a store and keeps the
//! applied history; the [`Migrator`] reconciles the files with that history
//! on every call and applies or rolls back ordered ranges of migrations.
//!
//! ## Quick Start
//!
//! ```rust
//! use elif_migrator::{MemoryAdapter, MemoryFilesystem, Migrator, MigratorConfig};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let adapter = Arc::new(MemoryAdapter::new());
//! let migrator = Migrator::new(
//!     adapter.clone(),
//!     Arc::new(MemoryFilesystem::new()),
//!     MigratorConfig::default(),
//! )
//! .unwrap();
//!
//! migrator.create("create_users").await.unwrap();
//! let applied = migrator.migrate_to_latest().await.unwrap();
//! assert_eq!(applied.len(), 1);
//!
//! // Ranges are matched by name fragment
//! let rolled_back = migrator.rollback("create_users").await.unwrap();
//! assert_eq!(rolled_back.len(), 1);
//! # });
//! ```

pub mod adapter;
pub mod adapters;
pub mod config;
pub mod error;
pub mod filesystem;
pub mod migrations;
pub mod sequence;

pub use adapter::{AdapterResult, MigrationAdapter};
pub use adapters::*;
pub use config::MigratorConfig;
pub use error::{AdapterError, FormatError, MigratorError, MigratorResult, Section};
pub use filesystem::{LocalFilesystem, MemoryFilesystem, MigrationFilesystem};
pub use migrations::{
    AppliedMigration, Migration, MigrationDirection, MigrationFormat, MigrationRange,
    MigrationStatus, Migrator,
};
pub use sequence::{SequenceGenerator, TimestampSequence};
