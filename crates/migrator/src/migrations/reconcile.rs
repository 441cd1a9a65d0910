//! Reconciliation of declared migrations with the adapter history
//!
//! Produces the canonical ordered migration set of one operation. The set is
//! rebuilt on every call and never cached.

use std::collections::HashMap;

use super::definitions::{sort_migrations, AppliedMigration, Migration, MigrationDirection};
use crate::error::{MigratorError, MigratorResult};

/// Merge the migrations found on disk with the applied history.
///
/// Every history entry must name a declared migration exactly, otherwise the
/// whole set is rejected with [`MigratorError::HistoryMismatch`]. The result
/// is ordered for `direction` and its bootstrap migration, the earliest by
/// name, is flagged with [`Migration::is_initial`].
pub fn reconcile(
    declared: Vec<Migration>,
    history: Vec<AppliedMigration>,
    direction: MigrationDirection,
) -> MigratorResult<Vec<Migration>> {
    let mut migrations = declared;

    let positions: HashMap<String, usize> = migrations
        .iter()
        .enumerate()
        .map(|(index, migration)| (migration.name().to_string(), index))
        .collect();

    for entry in history {
        let index = positions
            .get(&entry.name)
            .copied()
            .ok_or(MigratorError::HistoryMismatch { name: entry.name })?;
        migrations[index].mark_applied(entry.applied_at);
    }

    sort_migrations(&mut migrations, direction);

    let initial = match direction {
        MigrationDirection::Up => migrations.first_mut(),
        MigrationDirection::Down => migrations.last_mut(),
    };
    if let Some(migration) = initial {
        migration.mark_as_initial();
    }

    tracing::debug!(
        count = migrations.len(),
        applied = migrations.iter().filter(|m| m.has_been_applied()).count(),
        %direction,
        "Reconciled migrations"
    );

    Ok(migrations)
}
