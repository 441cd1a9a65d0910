use anyhow::Context;
use elif_migrator::{MemoryAdapter, Migration, Migrator, PostgresAdapter};
use std::sync::Arc;

use crate::settings::Settings;

/// Migrator talking to the configured database
async fn connect(settings: &Settings) -> anyhow::Result<Migrator> {
    let url = settings.require_database_url()?;
    let mut adapter = PostgresAdapter::connect(url)
        .await
        .context("cannot connect to the database")?;
    if let Some(table) = &settings.history_table {
        adapter = adapter.with_table(table.as_str())?;
    }
    Ok(Migrator::local(Arc::new(adapter), settings.migrator.clone())?)
}

/// Migrator for commands that only touch files
fn offline(settings: &Settings) -> anyhow::Result<Migrator> {
    Ok(Migrator::local(
        Arc::new(MemoryAdapter::new()),
        settings.migrator.clone(),
    )?)
}

/// Migrator writing the Postgres bootstrap migration without connecting
fn bootstrap(settings: &Settings) -> anyhow::Result<Migrator> {
    let mut adapter = PostgresAdapter::connect_lazy(settings.database_url.as_deref())?;
    if let Some(table) = &settings.history_table {
        adapter = adapter.with_table(table.as_str())?;
    }
    Ok(Migrator::local(Arc::new(adapter), settings.migrator.clone())?)
}

fn report(verb: &str, migrations: &[Migration]) {
    if migrations.is_empty() {
        println!("All clear, nothing done");
        return;
    }
    for migration in migrations {
        println!("✓ {} {}", verb, migration.name());
    }
    println!("{} migration(s) {}", migrations.len(), verb);
}

pub async fn list(settings: &Settings) -> anyhow::Result<()> {
    let migrations = connect(settings).await?.list().await?;
    if migrations.is_empty() {
        println!(
            "No migrations found in {}",
            settings.migrator.directory.display()
        );
        return Ok(());
    }
    for migration in &migrations {
        println!("{}", migration);
    }
    Ok(())
}

pub async fn init(settings: &Settings) -> anyhow::Result<()> {
    let migrator = bootstrap(settings)?;
    let migration = migrator.init().await?;
    println!("Created {}", migrator.path_of(&migration).display());
    Ok(())
}

pub async fn create(settings: &Settings, name: &str) -> anyhow::Result<()> {
    let migrator = offline(settings)?;
    let migration = migrator.create(name).await?;
    println!("Created {}", migrator.path_of(&migration).display());
    Ok(())
}

pub async fn migrate(settings: &Settings, range: Option<&str>) -> anyhow::Result<()> {
    let migrator = connect(settings).await?;
    let applied = match range {
        Some(range) => migrator.migrate(range).await?,
        None => migrator.migrate_to_latest().await?,
    };
    report("applied", &applied);
    Ok(())
}

pub async fn rollback(settings: &Settings, range: &str) -> anyhow::Result<()> {
    let rolled_back = connect(settings).await?.rollback(range).await?;
    report("rolled back", &rolled_back);
    Ok(())
}

pub async fn reset(settings: &Settings) -> anyhow::Result<()> {
    let rolled_back = connect(settings).await?.reset().await?;
    report("rolled back", &rolled_back);
    Ok(())
}

pub async fn remove(settings: &Settings, range: &str) -> anyhow::Result<()> {
    let removed = connect(settings).await?.remove(range).await?;
    report("removed", &removed);
    Ok(())
}
