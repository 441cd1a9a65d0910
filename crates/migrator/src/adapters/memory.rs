//! In-memory adapter
//!
//! Keeps the applied history in a map and logs every executed command.
//! Useful for tests and dry runs; failures can be injected per command or
//! per migration name.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::adapter::{AdapterResult, MigrationAdapter};
use crate::error::AdapterError;
use crate::migrations::{AppliedMigration, Migration};

/// Bare in-memory adapter
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    history: Mutex<BTreeMap<String, DateTime<Utc>>>,
    executed: Mutex<Vec<String>>,
    record_calls: AtomicUsize,
    fail_execute_on: Option<String>,
    fail_record_on: Option<String>,
    fail_list: bool,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `entries` already recorded as applied
    pub fn with_history<I, S>(self, entries: I) -> Self
    where
        I: IntoIterator<Item = (S, DateTime<Utc>)>,
        S: Into<String>,
    {
        {
            let mut history = self.history.lock();
            for (name, applied_at) in entries {
                history.insert(name.into(), applied_at);
            }
        }
        self
    }

    /// Fail `execute` for every command containing `fragment`
    pub fn fail_execute_on(mut self, fragment: impl Into<String>) -> Self {
        self.fail_execute_on = Some(fragment.into());
        self
    }

    /// Fail history writes for every migration whose name contains `fragment`
    pub fn fail_record_on(mut self, fragment: impl Into<String>) -> Self {
        self.fail_record_on = Some(fragment.into());
        self
    }

    /// Fail every history read
    pub fn fail_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    /// Commands executed so far, in order
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }

    /// Names currently recorded as applied, sorted
    pub fn applied_names(&self) -> Vec<String> {
        self.history.lock().keys().cloned().collect()
    }

    /// Number of `record_applied` and `record_rolled_back` calls
    pub fn record_calls(&self) -> usize {
        self.record_calls.load(Ordering::SeqCst)
    }

    /// Forget executed commands and call counts, keeping the history
    pub fn clear_log(&self) {
        self.executed.lock().clear();
        self.record_calls.store(0, Ordering::SeqCst);
    }

    fn check_record(&self, migration: &Migration) -> AdapterResult<()> {
        self.record_calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_record_on {
            Some(fragment) if migration.name().contains(fragment.as_str()) => Err(
                AdapterError::backend(format!("cannot record {}", migration.name())),
            ),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl MigrationAdapter for MemoryAdapter {
    async fn execute(&self, command: &str) -> AdapterResult<()> {
        if let Some(fragment) = &self.fail_execute_on {
            if command.contains(fragment.as_str()) {
                return Err(AdapterError::backend(format!(
                    "cannot execute '{}'",
                    command
                )));
            }
        }
        self.executed.lock().push(command.to_string());
        Ok(())
    }

    async fn list_applied(&self) -> AdapterResult<Vec<AppliedMigration>> {
        if self.fail_list {
            return Err(AdapterError::backend("cannot read the history"));
        }
        Ok(self
            .history
            .lock()
            .iter()
            .map(|(name, applied_at)| AppliedMigration::new(name.clone(), *applied_at))
            .collect())
    }

    async fn record_applied(&self, migration: &Migration) -> AdapterResult<()> {
        self.check_record(migration)?;
        let applied_at = migration
            .applied_at()
            .ok_or_else(|| AdapterError::backend(format!("{} has no applied date", migration.name())))?;
        self.history
            .lock()
            .insert(migration.name().to_string(), applied_at);
        Ok(())
    }

    async fn record_rolled_back(&self, migration: &Migration) -> AdapterResult<()> {
        self.check_record(migration)?;
        self.history.lock().remove(migration.name());
        Ok(())
    }

    fn bootstrap_migration(&self, name: &str) -> (String, String) {
        (
            format!("-- create history store for {}", name),
            format!("-- drop history store for {}", name),
        )
    }
}
