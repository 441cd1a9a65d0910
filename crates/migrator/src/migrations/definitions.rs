//! Migration Definitions - Core types for the migration engine
//!
//! Defines the [`Migration`] entity, the history record reported by adapters
//! and the traversal direction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::format::MigrationFormat;
use crate::error::{MigratorError, MigratorResult};

/// A named, reversible schema change
///
/// `name` is the file name of the migration, sequence prefix and extension
/// included, so ordering by name is ordering by creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    name: String,
    up: String,
    down: String,
    applied_at: Option<DateTime<Utc>>,
    initial: bool,
}

impl Migration {
    /// Create a pending migration
    pub fn new(name: impl Into<String>, up: impl Into<String>, down: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            up: up.into(),
            down: down.into(),
            applied_at: None,
            initial: false,
        }
    }

    /// Build a pending migration from the content of its file
    pub fn deserialize(
        name: impl Into<String>,
        data: &[u8],
        format: &MigrationFormat,
    ) -> MigratorResult<Self> {
        let name = name.into();
        match format.parse(data) {
            Ok((up, down)) => Ok(Self::new(name, up, down)),
            Err(source) => Err(MigratorError::Format { name, source }),
        }
    }

    /// Render this migration in the marker-delimited file format
    pub fn serialize(&self, format: &MigrationFormat) -> Vec<u8> {
        format.render(&self.up, &self.down).into_bytes()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Command run when applying
    pub fn up(&self) -> &str {
        &self.up
    }

    /// Command run when rolling back
    pub fn down(&self) -> &str {
        &self.down
    }

    /// Command for the given direction
    pub fn command(&self, direction: MigrationDirection) -> &str {
        match direction {
            MigrationDirection::Up => &self.up,
            MigrationDirection::Down => &self.down,
        }
    }

    pub fn applied_at(&self) -> Option<DateTime<Utc>> {
        self.applied_at
    }

    /// Checks if the migration has already been applied to the store
    pub fn has_been_applied(&self) -> bool {
        self.applied_at.is_some()
    }

    /// True for the bootstrap migration of the current reconciled set
    pub fn is_initial(&self) -> bool {
        self.initial
    }

    /// Current lifecycle state
    pub fn status(&self) -> MigrationStatus {
        match self.applied_at {
            Some(applied_at) => MigrationStatus::Applied { applied_at },
            None => MigrationStatus::Pending,
        }
    }

    /// True when running this migration in `direction` would change nothing
    pub fn is_in_target_state(&self, direction: MigrationDirection) -> bool {
        match direction {
            MigrationDirection::Up => self.has_been_applied(),
            MigrationDirection::Down => !self.has_been_applied(),
        }
    }

    pub(crate) fn mark_applied(&mut self, at: DateTime<Utc>) {
        self.applied_at = Some(at);
    }

    pub(crate) fn mark_rolled_back(&mut self) {
        self.applied_at = None;
    }

    pub(crate) fn mark_as_initial(&mut self) {
        self.initial = true;
    }
}

impl fmt::Display for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ticked = if self.has_been_applied() { "✓" } else { " " };
        write!(f, "[{}]\t{}", ticked, self.name)
    }
}

/// History entry reported by an adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedMigration {
    /// Migration name, exactly as written on disk
    pub name: String,
    /// When the migration was applied
    pub applied_at: DateTime<Utc>,
}

impl AppliedMigration {
    pub fn new(name: impl Into<String>, applied_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            applied_at,
        }
    }
}

/// Migration direction for execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    /// Apply the migration (run UP commands), ascending name order
    Up,
    /// Rollback the migration (run DOWN commands), descending name order
    Down,
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationDirection::Up => write!(f, "up"),
            MigrationDirection::Down => write!(f, "down"),
        }
    }
}

/// Migration status in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStatus {
    /// Migration is pending (not yet applied)
    Pending,
    /// Migration has been applied
    Applied {
        /// When it was applied
        applied_at: DateTime<Utc>,
    },
}

/// Sort migrations by name, ascending for `Up` and descending for `Down`
pub fn sort_migrations(migrations: &mut [Migration], direction: MigrationDirection) {
    match direction {
        MigrationDirection::Up => migrations.sort_by(|a, b| a.name.cmp(&b.name)),
        MigrationDirection::Down => migrations.sort_by(|a, b| b.name.cmp(&a.name)),
    }
}
