use chrono::Utc;
use elif_migrator::{
    MemoryAdapter, MemoryFilesystem, Migration, MigrationFilesystem, MigrationFormat, Migrator,
    MigratorConfig, MigratorError,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Fixture {
    adapter: Arc<MemoryAdapter>,
    fs: Arc<MemoryFilesystem>,
    migrator: Migrator,
}

/// Sequence tokens `0001`, `0002`, ... so several migrations created within
/// the same second still sort in creation order
fn counter() -> impl Fn() -> String + Send + Sync {
    let counter = AtomicUsize::new(0);
    move || format!("{:04}", counter.fetch_add(1, Ordering::SeqCst) + 1)
}

fn fixture_with(adapter: MemoryAdapter) -> Fixture {
    let adapter = Arc::new(adapter);
    let fs = Arc::new(MemoryFilesystem::new());
    let migrator = Migrator::new(adapter.clone(), fs.clone(), MigratorConfig::default())
        .unwrap()
        .with_sequence(counter());
    Fixture { adapter, fs, migrator }
}

fn fixture() -> Fixture {
    fixture_with(MemoryAdapter::new())
}

/// Write `migration01.sql`-style files holding distinct commands
async fn seed(fs: &MemoryFilesystem, names: &[&str]) {
    let format = MigrationFormat::default();
    for name in names {
        let content = format.render(&format!("create {name}"), &format!("drop {name}"));
        fs.write_file(&Path::new("migrations").join(name), content.as_bytes())
            .await
            .unwrap();
    }
}

fn names(migrations: &[Migration]) -> Vec<&str> {
    migrations.iter().map(Migration::name).collect()
}

async fn applied(migrator: &Migrator) -> Vec<String> {
    migrator
        .list()
        .await
        .unwrap()
        .into_iter()
        .filter(Migration::has_been_applied)
        .map(|m| m.name().to_string())
        .collect()
}

const FOUR: [&str; 4] = [
    "0001_migration01.sql",
    "0002_migration02.sql",
    "0003_migration03.sql",
    "0004_migration04.sql",
];

#[tokio::test]
async fn test_create_writes_prefixed_files() {
    let Fixture { fs, migrator, .. } = fixture();

    let migration = migrator.create("migration01").await.unwrap();
    assert_eq!(migration.name(), "0001_migration01.sql");
    assert!(!migration.has_been_applied());
    assert!(fs.exists("migrations/0001_migration01.sql"));

    let content = fs.contents("migrations/0001_migration01.sql").unwrap();
    let content = String::from_utf8(content).unwrap();
    assert!(content.starts_with("-- +migrataur up\n"));
    assert!(content.contains("-- +migrataur down\n"));

    let err = migrator.create("").await.unwrap_err();
    assert!(matches!(err, MigratorError::InvalidName(_)));
}

#[tokio::test]
async fn test_init_writes_the_bootstrap_migration() {
    let Fixture { adapter, migrator, .. } = fixture();

    let initial = migrator.init().await.unwrap();
    assert!(initial.name().ends_with("init_migrator.sql"));
    assert!(!initial.has_been_applied());
    assert!(initial.up().contains("create history store"));

    migrator.create("migration01").await.unwrap();

    let listed = migrator.list().await.unwrap();
    assert_eq!(names(&listed), ["0001_init_migrator.sql", "0002_migration01.sql"]);
    assert!(listed[0].is_initial());

    migrator.migrate_to_latest().await.unwrap();
    assert_eq!(adapter.executed()[0], initial.up());
}

// Scenario A
#[tokio::test]
async fn test_migrate_to_latest() {
    let Fixture { adapter, migrator, .. } = fixture();
    for name in ["migration01", "migration02", "migration03", "migration04"] {
        migrator.create(name).await.unwrap();
    }

    let migrated = migrator.migrate_to_latest().await.unwrap();

    assert_eq!(names(&migrated), FOUR);
    assert!(migrated.iter().all(Migration::has_been_applied));
    assert!(migrated[0].is_initial());
    assert!(migrated[1..].iter().all(|m| !m.is_initial()));
    assert_eq!(adapter.applied_names(), FOUR);
}

#[tokio::test]
async fn test_migrate_to_latest_is_idempotent() {
    let Fixture { adapter, fs, migrator } = fixture();
    seed(&fs, &FOUR).await;

    assert_eq!(migrator.migrate_to_latest().await.unwrap().len(), 4);
    adapter.clear_log();

    let again = migrator.migrate_to_latest().await.unwrap();
    assert!(again.is_empty());
    assert!(adapter.executed().is_empty());
    assert_eq!(adapter.record_calls(), 0);
}

#[tokio::test]
async fn test_apply_and_rollback_order() {
    let Fixture { adapter, fs, migrator } = fixture();
    // Written out of order on purpose
    seed(&fs, &["0003_migration03.sql", "0001_migration01.sql", "0002_migration02.sql"]).await;

    migrator.migrate_to_latest().await.unwrap();
    migrator.reset().await.unwrap();

    assert_eq!(
        adapter.executed(),
        [
            "create 0001_migration01.sql",
            "create 0002_migration02.sql",
            "create 0003_migration03.sql",
            "drop 0003_migration03.sql",
            "drop 0002_migration02.sql",
            "drop 0001_migration01.sql",
        ]
    );
    assert!(adapter.applied_names().is_empty());
}

#[tokio::test]
async fn test_migrate_range() {
    let Fixture { adapter, fs, migrator } = fixture();
    seed(
        &fs,
        &[
            "0001_migration01.sql",
            "0002_migration02.sql",
            "0003_migration03.sql",
            "0004_migration04.sql",
            "0005_migration05.sql",
            "0006_migration06.sql",
        ],
    )
    .await;

    let migrated = migrator.migrate("migration02..migration04").await.unwrap();
    assert_eq!(
        names(&migrated),
        ["0002_migration02.sql", "0003_migration03.sql", "0004_migration04.sql"]
    );

    let migrated = migrator.migrate("migration05").await.unwrap();
    assert_eq!(names(&migrated), ["0005_migration05.sql"]);
    assert_eq!(adapter.applied_names().len(), 4);

    // Count should not change
    assert!(migrator.migrate("migration05").await.unwrap().is_empty());
    assert_eq!(adapter.applied_names().len(), 4);
}

// Scenario B
#[tokio::test]
async fn test_rollback_range() {
    let Fixture { fs, migrator, .. } = fixture();
    seed(&fs, &FOUR).await;
    migrator.migrate_to_latest().await.unwrap();

    let rolled_back = migrator.rollback("migration04..migration02").await.unwrap();

    assert_eq!(
        names(&rolled_back),
        ["0004_migration04.sql", "0003_migration03.sql", "0002_migration02.sql"]
    );
    assert!(rolled_back.iter().all(|m| !m.has_been_applied()));
    assert_eq!(applied(&migrator).await, ["0001_migration01.sql"]);
}

#[tokio::test]
async fn test_rollback_twice_does_nothing() {
    let Fixture { adapter, fs, migrator } = fixture();
    seed(&fs, &FOUR).await;
    migrator.migrate_to_latest().await.unwrap();

    assert_eq!(migrator.rollback("migration02").await.unwrap().len(), 1);
    adapter.clear_log();

    assert!(migrator.rollback("migration02").await.unwrap().is_empty());
    assert!(adapter.executed().is_empty());
    assert_eq!(adapter.applied_names().len(), 3);
}

// Scenario C
#[tokio::test]
async fn test_migrate_single_with_partial_history() {
    let adapter = MemoryAdapter::new().with_history([
        ("0001_migration01.sql", Utc::now()),
        ("0002_migration02.sql", Utc::now()),
    ]);
    let Fixture { fs, migrator, .. } = fixture_with(adapter);
    seed(&fs, &FOUR).await;

    let migrated = migrator.migrate("migration03").await.unwrap();
    assert_eq!(names(&migrated), ["0003_migration03.sql"]);

    assert!(migrator.migrate("migration03").await.unwrap().is_empty());
    assert_eq!(
        applied(&migrator).await,
        ["0001_migration01.sql", "0002_migration02.sql", "0003_migration03.sql"]
    );
}

#[tokio::test]
async fn test_list_reports_state() {
    let Fixture { fs, migrator, .. } = fixture();
    seed(&fs, &FOUR).await;

    migrator.migrate("migration01..migration02").await.unwrap();
    migrator.migrate("migration04").await.unwrap();

    let listed = migrator.list().await.unwrap();
    assert_eq!(names(&listed), FOUR);
    for migration in &listed {
        let expected = !migration.name().contains("migration03");
        assert_eq!(migration.has_been_applied(), expected, "{}", migration.name());
    }
    assert_eq!(listed[2].to_string(), "[ ]\t0003_migration03.sql");
    assert_eq!(listed[3].to_string(), "[✓]\t0004_migration04.sql");
}

#[tokio::test]
async fn test_reset() {
    let Fixture { adapter, fs, migrator } = fixture();
    seed(&fs, &FOUR).await;
    migrator.migrate_to_latest().await.unwrap();

    let reset = migrator.reset().await.unwrap();
    assert_eq!(
        names(&reset),
        [
            "0004_migration04.sql",
            "0003_migration03.sql",
            "0002_migration02.sql",
            "0001_migration01.sql",
        ]
    );
    assert!(reset[3].is_initial());
    assert!(adapter.applied_names().is_empty());
}

// Scenario D
#[tokio::test]
async fn test_remove_applied_migration() {
    let Fixture { adapter, fs, migrator } = fixture();
    seed(&fs, &FOUR).await;
    migrator.migrate_to_latest().await.unwrap();
    adapter.clear_log();

    let removed = migrator.remove("migration02").await.unwrap();

    assert_eq!(names(&removed), ["0002_migration02.sql"]);
    assert!(!removed[0].has_been_applied());
    assert_eq!(adapter.executed(), ["drop 0002_migration02.sql"]);
    assert!(!fs.exists("migrations/0002_migration02.sql"));

    let listed = migrator.list().await.unwrap();
    assert_eq!(
        names(&listed),
        ["0001_migration01.sql", "0003_migration03.sql", "0004_migration04.sql"]
    );
    assert!(listed.iter().all(Migration::has_been_applied));
}

#[tokio::test]
async fn test_remove_pending_range() {
    let Fixture { adapter, fs, migrator } = fixture();
    seed(&fs, &FOUR).await;
    migrator.migrate("migration01..migration02").await.unwrap();
    adapter.clear_log();

    let removed = migrator.remove("migration04..migration02").await.unwrap();

    assert_eq!(
        names(&removed),
        ["0004_migration04.sql", "0003_migration03.sql", "0002_migration02.sql"]
    );
    // Only 02 was applied, but every file in the range is gone
    assert_eq!(adapter.executed(), ["drop 0002_migration02.sql"]);
    assert_eq!(fs.len(), 1);
    assert_eq!(applied(&migrator).await, ["0001_migration01.sql"]);
}

#[tokio::test]
async fn test_empty_range_does_nothing() {
    let Fixture { adapter, fs, migrator } = fixture();
    seed(&fs, &FOUR).await;

    assert!(migrator.migrate("").await.unwrap().is_empty());
    assert!(migrator.rollback("").await.unwrap().is_empty());
    assert!(migrator.remove("").await.unwrap().is_empty());
    assert!(adapter.executed().is_empty());
    assert_eq!(fs.len(), 4);
}

#[tokio::test]
async fn test_unknown_range_aborts_before_side_effects() {
    let Fixture { adapter, fs, migrator } = fixture();
    seed(&fs, &FOUR).await;

    let err = migrator.migrate("ghost").await.unwrap_err();
    assert!(matches!(err, MigratorError::NotFound { ref name } if name == "ghost"));

    let err = migrator.migrate("migration02..ghost").await.unwrap_err();
    assert!(matches!(err, MigratorError::NotFound { ref name } if name == "ghost"));

    let err = migrator.remove("ghost").await.unwrap_err();
    assert!(matches!(err, MigratorError::NotFound { .. }));

    assert!(adapter.executed().is_empty());
    assert_eq!(fs.len(), 4);
}

#[tokio::test]
async fn test_history_mismatch() {
    let adapter = MemoryAdapter::new().with_history([("ghost", Utc::now())]);
    let Fixture { adapter, fs, migrator } = fixture_with(adapter);
    seed(&fs, &FOUR).await;

    let err = migrator.list().await.unwrap_err();
    assert!(matches!(err, MigratorError::HistoryMismatch { ref name } if name == "ghost"));

    let err = migrator.migrate_to_latest().await.unwrap_err();
    assert!(matches!(err, MigratorError::HistoryMismatch { .. }));
    assert!(err.completed().is_empty());

    assert!(adapter.executed().is_empty());
    assert_eq!(adapter.record_calls(), 0);
    assert_eq!(adapter.applied_names(), ["ghost"]);
}

#[tokio::test]
async fn test_unreadable_history_aborts() {
    let Fixture { adapter, fs, migrator } = fixture_with(MemoryAdapter::new().fail_list());
    seed(&fs, &FOUR).await;

    let err = migrator.migrate_to_latest().await.unwrap_err();
    assert!(matches!(err, MigratorError::History(_)));
    assert!(err.completed().is_empty());

    assert!(matches!(migrator.list().await, Err(MigratorError::History(_))));
    assert!(matches!(migrator.remove("migration02").await, Err(MigratorError::History(_))));

    assert!(adapter.executed().is_empty());
    assert_eq!(adapter.record_calls(), 0);
    assert_eq!(fs.len(), 4);
}

#[tokio::test]
async fn test_execution_failure_keeps_earlier_migrations() {
    let adapter = MemoryAdapter::new().fail_execute_on("create 0003");
    let Fixture { adapter, fs, migrator } = fixture_with(adapter);
    seed(&fs, &FOUR).await;

    let err = migrator.migrate_to_latest().await.unwrap_err();
    match &err {
        MigratorError::Execution { name, .. } => assert_eq!(name, "0003_migration03.sql"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.completed(), ["0001_migration01.sql", "0002_migration02.sql"]);
    assert_eq!(
        applied(&migrator).await,
        ["0001_migration01.sql", "0002_migration02.sql"]
    );
}

#[tokio::test]
async fn test_record_failure_during_remove_keeps_the_files() {
    let history = FOUR.map(|name| (name, Utc::now()));
    let adapter = MemoryAdapter::new()
        .with_history(history)
        .fail_record_on("migration03");
    let Fixture { adapter, fs, migrator } = fixture_with(adapter);
    seed(&fs, &FOUR).await;

    let err = migrator.remove("migration04..migration02").await.unwrap_err();

    assert!(err.is_unrecorded());
    assert_eq!(err.completed(), ["0004_migration04.sql"]);
    assert_eq!(
        adapter.executed(),
        ["drop 0004_migration04.sql", "drop 0003_migration03.sql"]
    );
    assert_eq!(fs.len(), 4);
}

#[tokio::test]
async fn test_ignores_foreign_files_and_rejects_malformed_ones() {
    let Fixture { fs, migrator, .. } = fixture();
    seed(&fs, &["0001_migration01.sql"]).await;
    fs.write_file(Path::new("migrations/README.md"), b"# notes")
        .await
        .unwrap();

    assert_eq!(migrator.list().await.unwrap().len(), 1);

    fs.write_file(Path::new("migrations/0002_broken.sql"), b"select 1;")
        .await
        .unwrap();
    let err = migrator.list().await.unwrap_err();
    assert!(matches!(err, MigratorError::Format { ref name, .. } if name == "0002_broken.sql"));
}

#[tokio::test]
async fn test_custom_extension_and_markers() {
    let adapter = Arc::new(MemoryAdapter::new());
    let fs = Arc::new(MemoryFilesystem::new());
    let config = MigratorConfig::new()
        .with_directory("db")
        .with_extension("myext")
        .with_format(MigrationFormat::new("-- up", "-- /up", "-- down", "-- /down"));
    let migrator = Migrator::new(adapter.clone(), fs.clone(), config)
        .unwrap()
        .with_sequence(counter());

    let migration = migrator.create("users").await.unwrap();
    assert_eq!(migration.name(), "0001_users.myext");

    let content = String::from_utf8(fs.contents("db/0001_users.myext").unwrap()).unwrap();
    assert!(content.starts_with("-- up\n"));

    assert_eq!(migrator.migrate_to_latest().await.unwrap().len(), 1);
    assert_eq!(adapter.applied_names(), ["0001_users.myext"]);
}

#[tokio::test]
async fn test_local_filesystem_end_to_end() {
    let dir = tempfile::TempDir::new().unwrap();
    let directory = dir.path().join("migrations");
    let adapter = Arc::new(MemoryAdapter::new());
    let migrator = Migrator::local(
        adapter.clone(),
        MigratorConfig::new().with_directory(&directory),
    )
    .unwrap()
    .with_sequence(counter());

    // Nothing written yet, the directory does not exist
    assert!(migrator.list().await.unwrap().is_empty());

    migrator.init().await.unwrap();
    let users = migrator.create("users").await.unwrap();
    assert!(migrator.path_of(&users).is_file());

    let migrated = migrator.migrate_to_latest().await.unwrap();
    assert_eq!(names(&migrated), ["0001_init_migrator.sql", "0002_users.sql"]);

    let removed = migrator.remove("users").await.unwrap();
    assert_eq!(names(&removed), ["0002_users.sql"]);
    assert!(!directory.join("0002_users.sql").exists());
    assert_eq!(adapter.applied_names(), ["0001_init_migrator.sql"]);
}
