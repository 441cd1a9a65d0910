//! Error types for the migration engine
//!
//! Every failure is returned to the immediate caller. Nothing is retried and
//! nothing is swallowed, except a missing migrations directory which the
//! filesystem capability reports as an empty listing.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for migrator operations
pub type MigratorResult<T> = Result<T, MigratorError>;

/// Errors surfaced by the migration engine
#[derive(Error, Debug)]
pub enum MigratorError {
    /// A range boundary matched no migration. Raised before any side effect.
    #[error("no migration matches '{name}'")]
    NotFound { name: String },

    /// The adapter history references a migration missing from the directory.
    /// Raised before any side effect.
    #[error("the migration {name} was not found in the migrations directory")]
    HistoryMismatch { name: String },

    /// The adapter failed to run a migration's command. Migrations listed in
    /// `completed` changed state before the failure and keep that state.
    #[error("failed to execute migration {name}: {source}")]
    Execution {
        name: String,
        completed: Vec<String>,
        #[source]
        source: AdapterError,
    },

    /// The command ran but the history could not be updated. The store now
    /// disagrees with the history for `name` and must be reconciled by hand.
    #[error("migration {name} was executed but its history could not be recorded: {source}")]
    Record {
        name: String,
        completed: Vec<String>,
        #[source]
        source: AdapterError,
    },

    /// The adapter could not list its applied history
    #[error("failed to read migration history: {0}")]
    History(#[source] AdapterError),

    /// A migration file could not be parsed
    #[error("malformed migration {name}: {source}")]
    Format {
        name: String,
        #[source]
        source: FormatError,
    },

    /// Filesystem capability error
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid migration name given to `create`
    #[error("invalid migration name: {0}")]
    InvalidName(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl MigratorError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MigratorError::Io {
            path: path.into(),
            source,
        }
    }

    /// Names of the migrations that changed state before a halting failure.
    ///
    /// Empty for every error raised before the first side effect.
    pub fn completed(&self) -> &[String] {
        match self {
            MigratorError::Execution { completed, .. } | MigratorError::Record { completed, .. } => {
                completed
            }
            _ => &[],
        }
    }

    /// True when a command ran but its history entry was not written
    pub fn is_unrecorded(&self) -> bool {
        matches!(self, MigratorError::Record { .. })
    }
}

/// Errors raised by a [`MigrationAdapter`](crate::MigrationAdapter)
#[derive(Error, Debug)]
pub enum AdapterError {
    #[cfg(feature = "postgres")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl AdapterError {
    pub fn backend(message: impl Into<String>) -> Self {
        AdapterError::Backend(message.into())
    }
}

/// Sections of a migration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Up,
    Down,
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Section::Up => write!(f, "up"),
            Section::Down => write!(f, "down"),
        }
    }
}

/// Errors raised while parsing the marker-delimited migration format
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("content is not valid UTF-8")]
    InvalidUtf8,

    #[error("missing {0} section")]
    MissingSection(Section),

    #[error("{0} section is never closed")]
    UnterminatedSection(Section),

    #[error("unexpected marker '{marker}' on line {line}")]
    UnexpectedMarker { line: usize, marker: String },
}
