//! Migrator - public migration operations
//!
//! Every operation reads the migration directory and the adapter history
//! afresh, so nothing is cached between calls.

use std::path::PathBuf;
use std::sync::Arc;

use super::definitions::{Migration, MigrationDirection};
use super::range::MigrationRange;
use super::reconcile::reconcile;
use super::runner::MigrationRunner;
use crate::adapter::MigrationAdapter;
use crate::config::MigratorConfig;
use crate::error::{MigratorError, MigratorResult};
use crate::filesystem::{LocalFilesystem, MigrationFilesystem};
use crate::sequence::{SequenceGenerator, TimestampSequence};

/// Migration engine bound to one adapter and one migration directory
pub struct Migrator {
    adapter: Arc<dyn MigrationAdapter>,
    filesystem: Arc<dyn MigrationFilesystem>,
    sequence: Arc<dyn SequenceGenerator>,
    config: MigratorConfig,
}

impl Migrator {
    /// Create a migrator reading and writing files through `filesystem`
    pub fn new(
        adapter: Arc<dyn MigrationAdapter>,
        filesystem: Arc<dyn MigrationFilesystem>,
        config: MigratorConfig,
    ) -> MigratorResult<Self> {
        Ok(Self {
            adapter,
            filesystem,
            sequence: Arc::new(TimestampSequence),
            config: config.validated()?,
        })
    }

    /// Create a migrator on the local filesystem
    pub fn local(adapter: Arc<dyn MigrationAdapter>, config: MigratorConfig) -> MigratorResult<Self> {
        Self::new(adapter, Arc::new(LocalFilesystem::new()), config)
    }

    /// Replace the generator of name prefixes
    pub fn with_sequence(mut self, sequence: impl SequenceGenerator + 'static) -> Self {
        self.sequence = Arc::new(sequence);
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &MigratorConfig {
        &self.config
    }

    /// All migrations, applied and pending, in ascending order
    #[tracing::instrument(skip(self), fields(directory = %self.config.directory.display()))]
    pub async fn list(&self) -> MigratorResult<Vec<Migration>> {
        tracing::info!("Fetching migrations");
        self.load(MigrationDirection::Up).await
    }

    /// Write the adapter's bootstrap migration, which creates the history store
    #[tracing::instrument(skip(self))]
    pub async fn init(&self) -> MigratorResult<Migration> {
        tracing::info!("Initializing migrations");
        let file_name = self.new_file_name(&self.config.initial_migration_name);
        let (up, down) = self.adapter.bootstrap_migration(&file_name);
        self.write(Migration::new(file_name, up, down)).await
    }

    /// Create an empty migration called `<sequence>_<name><extension>`
    #[tracing::instrument(skip(self))]
    pub async fn create(&self, name: &str) -> MigratorResult<Migration> {
        validate_name(name)?;
        tracing::info!("Creating {}", name);
        let file_name = self.new_file_name(name);
        self.write(Migration::new(file_name, "", "")).await
    }

    /// Apply the migrations selected by `range`, returning those that were pending
    #[tracing::instrument(skip(self))]
    pub async fn migrate(&self, range: &str) -> MigratorResult<Vec<Migration>> {
        tracing::info!("Applying {}", range);
        self.run_range(range, MigrationDirection::Up).await
    }

    /// Apply every pending migration
    #[tracing::instrument(skip(self))]
    pub async fn migrate_to_latest(&self) -> MigratorResult<Vec<Migration>> {
        tracing::info!("Applying all pending migrations");
        self.run_all(MigrationDirection::Up).await
    }

    /// Roll back the migrations selected by `range`, returning those that were
    /// applied. Name the most recent boundary first, e.g. `"04..02"`.
    #[tracing::instrument(skip(self))]
    pub async fn rollback(&self, range: &str) -> MigratorResult<Vec<Migration>> {
        tracing::info!("Rolling back {}", range);
        self.run_range(range, MigrationDirection::Down).await
    }

    /// Roll back every applied migration
    #[tracing::instrument(skip(self))]
    pub async fn reset(&self) -> MigratorResult<Vec<Migration>> {
        tracing::info!("Resetting database");
        self.run_all(MigrationDirection::Down).await
    }

    /// Roll back the migrations selected by `range` when needed, then delete
    /// their files. Returns every removed migration, most recent first.
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, range: &str) -> MigratorResult<Vec<Migration>> {
        tracing::info!("Removing {}", range);
        let selected = self.resolve(range, MigrationDirection::Down).await?;

        let rolled_back = MigrationRunner::new(self.adapter.as_ref())
            .run(selected.clone(), MigrationDirection::Down)
            .await?;

        let mut removed = Vec::with_capacity(selected.len());
        for mut migration in selected {
            if rolled_back.iter().any(|m| m.name() == migration.name()) {
                migration.mark_rolled_back();
            }
            let path = self.config.migration_path(migration.name());
            self.filesystem
                .delete_file(&path)
                .await
                .map_err(|e| MigratorError::io(&path, e))?;
            tracing::debug!(migration = migration.name(), "Deleted {}", path.display());
            removed.push(migration);
        }

        Ok(removed)
    }

    async fn run_all(&self, direction: MigrationDirection) -> MigratorResult<Vec<Migration>> {
        let migrations = self.load(direction).await?;
        MigrationRunner::new(self.adapter.as_ref())
            .run(migrations, direction)
            .await
    }

    async fn run_range(
        &self,
        range: &str,
        direction: MigrationDirection,
    ) -> MigratorResult<Vec<Migration>> {
        let migrations = self.resolve(range, direction).await?;
        MigrationRunner::new(self.adapter.as_ref())
            .run(migrations, direction)
            .await
    }

    async fn resolve(
        &self,
        range: &str,
        direction: MigrationDirection,
    ) -> MigratorResult<Vec<Migration>> {
        let migrations = self.load(direction).await?;
        MigrationRange::parse(range).resolve(migrations)
    }

    /// Reconciled migration set for `direction`
    async fn load(&self, direction: MigrationDirection) -> MigratorResult<Vec<Migration>> {
        let declared = self.read_directory().await?;
        let history = self
            .adapter
            .list_applied()
            .await
            .map_err(MigratorError::History)?;
        reconcile(declared, history, direction)
    }

    /// Parse every migration file of the configured directory
    async fn read_directory(&self) -> MigratorResult<Vec<Migration>> {
        let directory = &self.config.directory;
        let entries = self
            .filesystem
            .list_entries(directory)
            .await
            .map_err(|e| MigratorError::io(directory, e))?;

        let mut migrations = Vec::with_capacity(entries.len());
        for name in entries {
            if !self.config.is_migration_file(&name) {
                continue;
            }
            let path = self.config.migration_path(&name);
            let data = self
                .filesystem
                .read_file(&path)
                .await
                .map_err(|e| MigratorError::io(&path, e))?;
            migrations.push(Migration::deserialize(name, &data, &self.config.format)?);
        }

        Ok(migrations)
    }

    async fn write(&self, migration: Migration) -> MigratorResult<Migration> {
        let path = self.config.migration_path(migration.name());
        self.filesystem
            .write_file(&path, &migration.serialize(&self.config.format))
            .await
            .map_err(|e| MigratorError::io(&path, e))?;
        tracing::info!(path = %path.display(), "{} created", migration.name());
        Ok(migration)
    }

    fn new_file_name(&self, name: &str) -> String {
        self.config
            .migration_file_name(&self.sequence.next_token(), name)
    }

    /// Path of the file backing `migration`
    pub fn path_of(&self, migration: &Migration) -> PathBuf {
        self.config.migration_path(migration.name())
    }
}

fn validate_name(name: &str) -> MigratorResult<()> {
    if name.trim().is_empty() {
        return Err(MigratorError::InvalidName(
            "migration name cannot be empty".to_string(),
        ));
    }

    if name.contains(['/', '\\']) {
        return Err(MigratorError::InvalidName(format!(
            "'{}' cannot contain path separators",
            name
        )));
    }

    Ok(())
}
