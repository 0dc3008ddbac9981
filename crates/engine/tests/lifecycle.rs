use assert_matches::assert_matches;
use configuration::{ProbeSettings, Settings};
use core_types::{ObjectKind, OutcomeStatus, ProbeStatus, StoreErrorKind};
use engine::{Driver, DriverOptions, EngineError, TeardownStatus, plan_script};
use std::path::Path;
use std::time::Duration;
use store::{MemoryStore, StoreError};

const SCHEMA_SCRIPT: &str = r#"
-- Biogas plant schema
CREATE TABLE IF NOT EXISTS user_details (
    id SERIAL PRIMARY KEY,
    name VARCHAR(100) NOT NULL,
    note TEXT DEFAULT 'first; second'
);
CREATE TABLE IF NOT EXISTS device (
    id SERIAL PRIMARY KEY,
    owner_id INT REFERENCES user_details(id)
);
CREATE TABLE IF NOT EXISTS sensor_parameters (
    id SERIAL PRIMARY KEY,
    device_id INT REFERENCES device(id)
);
CREATE TABLE IF NOT EXISTS sensor_value (
    id SERIAL PRIMARY KEY,
    device_id INT REFERENCES device(id),
    reading NUMERIC(10, 2)
);
-- Dashboard view over the latest readings
CREATE OR REPLACE VIEW dashboard_data AS
    SELECT d.id, sv.reading FROM device d JOIN sensor_value sv ON sv.device_id = d.id;
INSERT INTO user_details (name) VALUES ('admin'), ('operator');
INSERT INTO device (owner_id) VALUES (1);
"#;

fn write_script(dir: &Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("db.sql");
    std::fs::write(&path, contents).unwrap();
    path
}

fn options(script: &Path) -> DriverOptions {
    DriverOptions::from_settings(&Settings::default())
        .unwrap()
        .with_script_path(script)
}

#[tokio::test]
async fn apply_reports_outcomes_and_verification() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "CREATE TABLE t (id INT);\nINSERT INTO t VALUES (1);\nDROP TABLE nonexistent;\n",
    );
    let mut settings = Settings::default();
    settings.verification.expected_tables = vec!["t".to_string()];
    settings.verification.probes.clear();
    let options = DriverOptions::from_settings(&settings)
        .unwrap()
        .with_script_path(&script);
    let memory = MemoryStore::new();

    let report = Driver::new(memory.clone(), options).apply().await.unwrap();

    let statuses: Vec<_> = report.outcomes.iter().map(|o| o.status).collect();
    assert_eq!(
        statuses,
        vec![
            OutcomeStatus::Succeeded,
            OutcomeStatus::Succeeded,
            OutcomeStatus::ExpectedFailure
        ]
    );
    assert_eq!(report.counts.succeeded, 2);
    assert_eq!(report.counts.expected_failures, 1);
    assert!(report.store_ready);
    assert!(report.verification.table_names.contains("t"));
    assert_eq!(report.verification.row_count("t"), Some(1));
    assert_eq!(memory.open_connections(), 0);
}

#[tokio::test]
async fn apply_builds_the_schema_and_probes_the_view() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), SCHEMA_SCRIPT);
    let memory = MemoryStore::new();

    let report = Driver::new(memory.clone(), options(&script))
        .apply()
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 7);
    assert_eq!(report.counts.unexpected_failures, 0);
    assert_eq!(report.outcomes[4].line, 22);
    let verification = &report.verification;
    assert_eq!(
        verification.table_names.iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["device", "sensor_parameters", "sensor_value", "user_details"]
    );
    assert_eq!(verification.row_count("user_details"), Some(2));
    assert_eq!(verification.row_count("device"), Some(1));
    assert_eq!(verification.row_count("sensor_parameters"), Some(0));
    assert_eq!(verification.probe("dashboard_data"), Some(ProbeStatus::Success));
}

#[tokio::test]
async fn unexpected_failures_are_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "CREATE TABLE a (id INT);\nCREATE TABLE a (id INT);\nCREATE TABLE b (id INT);\n",
    );
    let memory = MemoryStore::new();

    let report = Driver::new(memory.clone(), options(&script))
        .apply()
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 3);
    let unexpected: Vec<_> = report.unexpected_failures().collect();
    assert_eq!(unexpected.len(), 1);
    assert_eq!(unexpected[0].index, 2);
    assert_matches!(
        &unexpected[0].error,
        Some(StoreError { kind: StoreErrorKind::DuplicateTable, .. })
    );
    assert_eq!(memory.table_names(), vec!["a", "b"]);
}

#[tokio::test]
async fn progress_callback_runs_once_per_statement() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), SCHEMA_SCRIPT);
    let mut ticks = Vec::new();

    Driver::new(MemoryStore::new(), options(&script))
        .apply_with(|outcome, total| ticks.push((outcome.index, total)))
        .await
        .unwrap();

    assert_eq!(ticks.len(), 7);
    assert_eq!(ticks.first(), Some(&(1, 7)));
    assert_eq!(ticks.last(), Some(&(7, 7)));
}

#[tokio::test]
async fn missing_script_is_fatal_and_releases_the_connection() {
    let dir = tempfile::tempdir().unwrap();
    let memory = MemoryStore::new();

    let result = Driver::new(memory.clone(), options(&dir.path().join("absent.sql")))
        .apply()
        .await;

    assert_matches!(result, Err(EngineError::ScriptNotFound(_)));
    assert!(memory.executed().is_empty());
    assert_eq!(memory.open_connections(), 0);
}

#[tokio::test]
async fn unreachable_store_is_fatal_for_both_operations() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), SCHEMA_SCRIPT);
    let memory = MemoryStore::new();
    memory.set_offline(true);
    let driver = Driver::new(memory.clone(), options(&script));

    assert_matches!(
        driver.apply().await,
        Err(EngineError::Connection(StoreError { kind: StoreErrorKind::Connection, .. }))
    );
    assert_matches!(driver.teardown().await, Err(EngineError::Connection(_)));
    assert!(memory.executed().is_empty());
}

#[tokio::test]
async fn teardown_drops_in_plan_order_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), SCHEMA_SCRIPT);
    let memory = MemoryStore::new();
    let driver = Driver::new(memory.clone(), options(&script));
    driver.apply().await.unwrap();

    let first = driver.teardown().await.unwrap();
    assert_eq!(first.steps.len(), 8);
    assert_eq!(first.steps[0].target.kind, ObjectKind::View);
    assert_eq!(first.steps[0].target.name, "dashboard_data");
    assert!(memory.table_names().is_empty());
    assert!(memory.view_names().is_empty());

    // The script creates five of the eight configured objects.
    assert_eq!(first.count(TeardownStatus::Dropped), 5);
    assert_eq!(first.count(TeardownStatus::AlreadyAbsent), 3);
    assert_eq!(first.steps[3].target.name, "device_management");
    assert_eq!(first.steps[3].status, TeardownStatus::AlreadyAbsent);

    let executed = memory.executed();
    let drops: Vec<_> = executed.iter().filter(|sql| sql.starts_with("DROP")).collect();
    assert_eq!(drops[0], "DROP VIEW dashboard_data CASCADE");
    assert_eq!(drops[1], "DROP TABLE sensor_value CASCADE");
    assert_eq!(drops[7], "DROP TABLE todo CASCADE");

    let second = driver.teardown().await.unwrap();
    assert_eq!(second.steps.len(), 8);
    assert_eq!(second.count(TeardownStatus::AlreadyAbsent), 8);
    assert_eq!(second.count(TeardownStatus::Dropped), 0);
    assert_eq!(memory.open_connections(), 0);
}

#[tokio::test]
async fn teardown_of_an_empty_store_reports_everything_absent() {
    let dir = tempfile::tempdir().unwrap();
    let memory = MemoryStore::new();

    let report = Driver::new(memory.clone(), options(&dir.path().join("unused.sql")))
        .teardown()
        .await
        .unwrap();

    assert_eq!(report.count(TeardownStatus::AlreadyAbsent), 8);
    assert_eq!(memory.executed().len(), 8);
}

#[tokio::test]
async fn undefined_object_errors_count_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    let memory = MemoryStore::new()
        .with_table("sensor_value", 0)
        .with_table("todo", 0);
    memory.fail_when(
        "todo",
        StoreError::new(StoreErrorKind::UndefinedObject, "object \"todo\" does not exist")
            .with_code("42704"),
    );

    let report = Driver::new(memory.clone(), options(&dir.path().join("unused.sql")))
        .teardown()
        .await
        .unwrap();

    assert_eq!(report.steps[1].status, TeardownStatus::Dropped);
    assert_eq!(report.steps[7].status, TeardownStatus::AlreadyAbsent);
    assert_eq!(report.count(TeardownStatus::Dropped), 1);
    assert_eq!(report.count(TeardownStatus::AlreadyAbsent), 7);
}

#[tokio::test]
async fn other_drop_failures_stop_the_teardown() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), SCHEMA_SCRIPT);
    let memory = MemoryStore::new();
    let driver = Driver::new(memory.clone(), options(&script));
    driver.apply().await.unwrap();
    memory.fail_when(
        "device_management",
        StoreError::new(StoreErrorKind::InsufficientPrivilege, "must be owner of table")
            .with_code("42501"),
    );

    let result = driver.teardown().await;

    assert_matches!(
        result,
        Err(EngineError::Teardown { target, completed: 3, source }) => {
            assert_eq!(target.name, "device_management");
            assert_eq!(source.kind, StoreErrorKind::InsufficientPrivilege);
        }
    );
    assert!(memory.table_names().contains(&"device".to_string()));
    assert!(!memory.table_names().contains(&"sensor_value".to_string()));
    assert_eq!(memory.open_connections(), 0);
}

#[tokio::test]
async fn probe_requiring_rows_is_unavailable_on_an_empty_view() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), SCHEMA_SCRIPT);
    let mut settings = Settings::default();
    settings.verification.probes = vec![ProbeSettings {
        name: "dashboard_data".to_string(),
        query: "SELECT * FROM dashboard_data LIMIT 1".to_string(),
        require_rows: true,
    }];
    let options = DriverOptions::from_settings(&settings)
        .unwrap()
        .with_script_path(&script);

    let report = Driver::new(MemoryStore::new(), options).apply().await.unwrap();

    assert_eq!(
        report.verification.probe("dashboard_data"),
        Some(ProbeStatus::Unavailable)
    );
}

#[tokio::test(start_paused = true)]
async fn settle_delay_runs_before_verification() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "CREATE TABLE device (id INT);\n");
    let mut options = options(&script);
    options.settle_delay = Duration::from_secs(3);
    let started = tokio::time::Instant::now();

    let report = Driver::new(MemoryStore::new(), options).apply().await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(3));
    assert!(report.store_ready);
    assert_eq!(report.verification.row_count("device"), Some(0));
}

#[tokio::test(start_paused = true)]
async fn hung_readiness_check_does_not_block_verification() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "CREATE TABLE device (id INT);\n");
    let memory = MemoryStore::new();
    memory.stall_when("ping", Duration::from_secs(3600));

    let report = Driver::new(memory.clone(), options(&script)).apply().await.unwrap();

    assert!(!report.store_ready);
    assert_eq!(report.verification.row_count("device"), Some(0));
    assert_eq!(memory.open_connections(), 0);
}

#[tokio::test]
async fn plan_splits_without_a_store() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), SCHEMA_SCRIPT);

    let statements = plan_script(&script).await.unwrap();

    assert_eq!(statements.len(), 7);
    assert!(statements[0].text.starts_with("CREATE TABLE IF NOT EXISTS user_details"));
    assert!(statements[0].text.contains("'first; second'"));
    assert!(statements[4].text.starts_with("CREATE OR REPLACE VIEW"));
}
