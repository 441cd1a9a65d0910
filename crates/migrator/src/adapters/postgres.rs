//! PostgreSQL adapter
//!
//! Stores the history in a `name, applied_at` table created by the bootstrap
//! migration. Commands are sent with the simple query protocol so a migration
//! may hold several statements; no transaction is opened around them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Executor, PgPool, Row};

use crate::adapter::{AdapterResult, MigrationAdapter};
use crate::error::AdapterError;
use crate::migrations::{AppliedMigration, Migration};

/// Default name of the history table
pub const DEFAULT_HISTORY_TABLE: &str = "elif_migrations";

/// SQLSTATE raised when querying a table that does not exist
const UNDEFINED_TABLE: &str = "42P01";

/// Adapter for PostgreSQL databases
#[derive(Debug, Clone)]
pub struct PostgresAdapter {
    pool: PgPool,
    table: String,
}

impl PostgresAdapter {
    /// Create an adapter using the default history table
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            table: DEFAULT_HISTORY_TABLE.to_string(),
        }
    }

    /// Create an adapter from a database URL
    pub async fn connect(database_url: &str) -> AdapterResult<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Create an adapter whose pool only connects on first use.
    ///
    /// Without a URL the connection settings come from the `PG*` environment
    /// variables. Enough for commands that never reach the database, such as
    /// writing the bootstrap migration.
    pub fn connect_lazy(database_url: Option<&str>) -> AdapterResult<Self> {
        let pool = match database_url {
            Some(url) => PgPool::connect_lazy(url)?,
            None => PgPoolOptions::new().connect_lazy_with(PgConnectOptions::new()),
        };
        Ok(Self::new(pool))
    }

    /// Use another history table
    pub fn with_table(mut self, table: impl Into<String>) -> AdapterResult<Self> {
        let table = table.into();
        validate_table_name(&table)?;
        self.table = table;
        Ok(self)
    }

    /// Get the database pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

fn validate_table_name(table: &str) -> AdapterResult<()> {
    let valid = !table.is_empty()
        && !table.starts_with(|c: char| c.is_ascii_digit())
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(AdapterError::backend(format!(
            "invalid history table name '{}'",
            table
        )))
    }
}

/// SQL to create the history table
fn create_table_sql(table: &str) -> String {
    format!(
        "-- Do not edit this migration unless you know what you're doing!\n\
         CREATE TABLE {} (\n    \
             name VARCHAR(250) PRIMARY KEY,\n    \
             applied_at TIMESTAMPTZ NOT NULL\n\
         );",
        table
    )
}

/// SQL to drop the history table
fn drop_table_sql(table: &str) -> String {
    format!(
        "-- Warning: this drops the whole migration history\n\
         DROP TABLE {};",
        table
    )
}

/// SQL to get applied migrations
fn select_applied_sql(table: &str) -> String {
    format!("SELECT name, applied_at FROM {} ORDER BY name", table)
}

/// SQL to record a migration as applied
fn record_applied_sql(table: &str) -> String {
    format!("INSERT INTO {} (name, applied_at) VALUES ($1, $2)", table)
}

/// SQL to remove a migration record
fn remove_applied_sql(table: &str) -> String {
    format!("DELETE FROM {} WHERE name = $1", table)
}

#[async_trait]
impl MigrationAdapter for PostgresAdapter {
    async fn execute(&self, command: &str) -> AdapterResult<()> {
        if command.trim().is_empty() {
            return Ok(());
        }
        self.pool.execute(command).await?;
        Ok(())
    }

    async fn list_applied(&self) -> AdapterResult<Vec<AppliedMigration>> {
        let sql = select_applied_sql(&self.table);
        let rows = match sqlx::query(&sql).fetch_all(&self.pool).await {
            Ok(rows) => rows,
            // Not initialized yet, so nothing was ever applied
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some(UNDEFINED_TABLE) => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get("name")?;
            let applied_at: DateTime<Utc> = row.try_get("applied_at")?;
            records.push(AppliedMigration { name, applied_at });
        }

        Ok(records)
    }

    async fn record_applied(&self, migration: &Migration) -> AdapterResult<()> {
        let applied_at = migration.applied_at().ok_or_else(|| {
            AdapterError::backend(format!("{} has no applied date", migration.name()))
        })?;

        let sql = record_applied_sql(&self.table);
        sqlx::query(&sql)
            .bind(migration.name())
            .bind(applied_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_rolled_back(&self, migration: &Migration) -> AdapterResult<()> {
        // The bootstrap down command dropped the table
        if migration.is_initial() {
            return Ok(());
        }

        let sql = remove_applied_sql(&self.table);
        sqlx::query(&sql)
            .bind(migration.name())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn bootstrap_migration(&self, _name: &str) -> (String, String) {
        (create_table_sql(&self.table), drop_table_sql(&self.table))
    }
}
