//! Migration Runner - Applies or rolls back an ordered slice of migrations
//!
//! Each migration moves between two states, pending and applied. Running a
//! migration that is already in the target state is a no-op. The first
//! failure halts the batch; migrations handled before it keep their new state.

use chrono::Utc;

use super::definitions::{Migration, MigrationDirection};
use crate::adapter::MigrationAdapter;
use crate::error::{MigratorError, MigratorResult};

/// Drives state transitions through an adapter
pub struct MigrationRunner<'a> {
    adapter: &'a dyn MigrationAdapter,
}

impl<'a> MigrationRunner<'a> {
    /// Create a new migration runner
    pub fn new(adapter: &'a dyn MigrationAdapter) -> Self {
        Self { adapter }
    }

    /// Run `migrations` in order, returning the ones whose state changed.
    ///
    /// An empty result means there was nothing to do.
    pub async fn run(
        &self,
        migrations: Vec<Migration>,
        direction: MigrationDirection,
    ) -> MigratorResult<Vec<Migration>> {
        let mut changed = Vec::new();

        for mut migration in migrations {
            if migration.is_in_target_state(direction) {
                tracing::debug!(migration = migration.name(), %direction, "Skipping migration");
                continue;
            }

            if let Err(source) = self.adapter.execute(migration.command(direction)).await {
                tracing::error!(migration = migration.name(), %direction, error = %source, "✗ Migration failed");
                return Err(MigratorError::Execution {
                    name: migration.name().to_string(),
                    completed: names(&changed),
                    source,
                });
            }

            let recorded = match direction {
                MigrationDirection::Up => {
                    migration.mark_applied(Utc::now());
                    self.adapter.record_applied(&migration).await
                }
                MigrationDirection::Down => {
                    migration.mark_rolled_back();
                    self.adapter.record_rolled_back(&migration).await
                }
            };

            if let Err(source) = recorded {
                tracing::error!(
                    migration = migration.name(),
                    %direction,
                    error = %source,
                    "✗ Migration executed but history was not updated"
                );
                return Err(MigratorError::Record {
                    name: migration.name().to_string(),
                    completed: names(&changed),
                    source,
                });
            }

            tracing::info!(migration = migration.name(), %direction, "✓ {}", migration.name());
            changed.push(migration);
        }

        if changed.is_empty() {
            tracing::info!("All clear, nothing done");
        }

        Ok(changed)
    }
}

fn names(migrations: &[Migration]) -> Vec<String> {
    migrations.iter().map(|m| m.name().to_string()).collect()
}
