// ABOUTME: End-to-end export tests against the in-memory session
// ABOUTME: Checks archive contents, failure cleanup and overwrite behaviour

use mysql_dump::commands::{ExportState, Exporter};
use mysql_dump::config::ExportConfig;
use mysql_dump::dump::{parse_literal, split_row, SqlValue, SCHEMA_FILE};
use mysql_dump::error::{ExportError, Phase};
use mysql_dump::progress::{Progress, QuietProgress};
use mysql_dump::testing::MemorySession;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Mutex;
use tempfile::tempdir;

fn read_archive(path: &Path) -> BTreeMap<String, String> {
    let mut archive = zip::ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
    let mut entries = BTreeMap::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        entries.insert(entry.name().to_string(), content);
    }
    entries
}

fn catalog() -> MemorySession {
    MemorySession::new("app")
        .table(
            "T1",
            &[("id", "int(11)", true), ("name", "varchar(64)", false)],
            vec![
                vec![SqlValue::Integer(1), SqlValue::text("O'Brien")],
                vec![SqlValue::Integer(2), SqlValue::Null],
            ],
        )
        .table(
            "T2",
            &[
                ("id", "int(11)", true),
                ("t1_id", "int(11)", false),
                ("value", "double", false),
            ],
            vec![vec![
                SqlValue::Integer(1),
                SqlValue::Integer(1),
                SqlValue::Float(2.5),
            ]],
        )
}

fn config(dir: &Path) -> ExportConfig {
    let mut config = ExportConfig::new("app", dir.join("app.zip"));
    config.staging_dir = Some(dir.join("staging"));
    config
}

#[derive(Default)]
struct RecordingProgress {
    reports: Mutex<Vec<(Phase, usize, usize, String)>>,
    abandoned: Mutex<bool>,
}

impl Progress for RecordingProgress {
    fn report(&self, phase: Phase, completed: usize, total: usize, label: &str) {
        self.reports
            .lock()
            .unwrap()
            .push((phase, completed, total, label.to_string()));
    }

    fn line(&self, _text: &str) {}

    fn abandon(&self) {
        *self.abandoned.lock().unwrap() = true;
    }
}

#[tokio::test]
async fn test_archive_contains_schema_and_data() {
    let dir = tempdir().unwrap();
    let mut exporter = Exporter::with_session(config(dir.path()), &QuietProgress, catalog());
    exporter.run().await.unwrap();

    let entries = read_archive(&dir.path().join("app.zip"));
    let names: Vec<&str> = entries.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["T1.dmp", "T2.dmp", SCHEMA_FILE]);

    let schema = &entries[SCHEMA_FILE];
    assert_eq!(
        schema,
        "create table T1 (\n    id int(11),\n    name varchar(64),\n    primary key(id)\n);\n\
         create table T2 (\n    id int(11),\n    t1_id int(11),\n    value double,\n    primary key(id)\n);\n"
    );

    assert_eq!(entries["T1.dmp"], "1,'O''Brien'\n2,null\n");
    assert_eq!(entries["T2.dmp"], "1,1,2.5\n");
}

#[tokio::test]
async fn test_data_files_read_back() {
    let dir = tempdir().unwrap();
    let mut exporter = Exporter::with_session(config(dir.path()), &QuietProgress, catalog());
    exporter.run().await.unwrap();

    let entries = read_archive(&dir.path().join("app.zip"));
    let rows: Vec<Vec<SqlValue>> = entries["T1.dmp"]
        .lines()
        .map(|line| split_row(line).into_iter().map(parse_literal).collect())
        .collect();
    assert_eq!(
        rows,
        vec![
            vec![SqlValue::Integer(1), SqlValue::text("O'Brien")],
            vec![SqlValue::Integer(2), SqlValue::Null],
        ]
    );
}

#[tokio::test]
async fn test_progress_reports_each_table_per_phase() {
    let dir = tempdir().unwrap();
    let progress = RecordingProgress::default();
    let mut exporter = Exporter::with_session(config(dir.path()), &progress, catalog());
    exporter.run().await.unwrap();

    let reports = progress.reports.lock().unwrap();
    assert_eq!(
        *reports,
        vec![
            (Phase::Schema, 1, 2, "T1".to_string()),
            (Phase::Schema, 2, 2, "T2".to_string()),
            (Phase::Data, 1, 2, "T1".to_string()),
            (Phase::Data, 2, 2, "T2".to_string()),
        ]
    );
    assert!(!*progress.abandoned.lock().unwrap());
}

#[tokio::test]
async fn test_failure_on_second_of_three_tables_leaves_nothing() {
    let dir = tempdir().unwrap();
    let session = catalog()
        .table("T3", &[("id", "int(11)", true)], vec![vec![SqlValue::Integer(9)]])
        .fail_on("from `T2`");
    let closed = session.closed_flag();
    let progress = RecordingProgress::default();

    let mut exporter = Exporter::with_session(config(dir.path()), &progress, session);
    let err = exporter.run().await.unwrap_err();

    match err {
        ExportError::Table { phase, table, .. } => {
            assert_eq!(phase, Phase::Data);
            assert_eq!(table, "T2");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(exporter.state(), ExportState::CleanedUp);
    assert!(!dir.path().join("app.zip").exists());
    assert_eq!(
        std::fs::read_dir(dir.path().join("staging")).unwrap().count(),
        0
    );
    assert!(closed.load(Ordering::SeqCst));
    assert!(*progress.abandoned.lock().unwrap());
}

#[tokio::test]
async fn test_failed_run_keeps_previous_archive() {
    let dir = tempdir().unwrap();
    Exporter::with_session(config(dir.path()), &QuietProgress, catalog())
        .run()
        .await
        .unwrap();
    let before = std::fs::read(dir.path().join("app.zip")).unwrap();

    let failing = catalog().fail_on("from `T1`");
    let result = Exporter::with_session(config(dir.path()), &QuietProgress, failing)
        .run()
        .await;
    assert!(result.is_err());

    let after = std::fs::read(dir.path().join("app.zip")).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_second_run_replaces_archive() {
    let dir = tempdir().unwrap();
    Exporter::with_session(config(dir.path()), &QuietProgress, catalog())
        .run()
        .await
        .unwrap();

    let smaller = MemorySession::new("app").table(
        "only",
        &[("id", "int(11)", true)],
        vec![vec![SqlValue::Integer(5)]],
    );
    Exporter::with_session(config(dir.path()), &QuietProgress, smaller)
        .run()
        .await
        .unwrap();

    let entries = read_archive(&dir.path().join("app.zip"));
    let names: Vec<&str> = entries.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["only.dmp", SCHEMA_FILE]);
    assert_eq!(entries["only.dmp"], "5\n");
}

#[tokio::test]
async fn test_table_without_primary_key_keeps_empty_clause() {
    let dir = tempdir().unwrap();
    let session = MemorySession::new("app").table(
        "events",
        &[("at", "datetime", false), ("kind", "varchar(16)", false)],
        vec![vec![
            SqlValue::Other("2013-03-01 10:00:00".to_string()),
            SqlValue::text("login"),
        ]],
    );
    Exporter::with_session(config(dir.path()), &QuietProgress, session)
        .run()
        .await
        .unwrap();

    let entries = read_archive(&dir.path().join("app.zip"));
    assert!(entries[SCHEMA_FILE].contains("    primary key()\n);\n"));
    assert_eq!(entries["events.dmp"], "2013-03-01 10:00:00,'login'\n");
}
