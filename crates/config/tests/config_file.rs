//! File-backed configuration: reload on change, keep last good document.

use std::io::Write;
use std::time::Duration;

use relink_config::{ConfigError, ConfigFile, Configuration};
use tempfile::NamedTempFile;

fn write(file: &NamedTempFile, contents: &str) {
    let mut handle = std::fs::File::create(file.path()).expect("temp file should open");
    handle
        .write_all(contents.as_bytes())
        .expect("temp file should be writable");
    handle.sync_all().expect("temp file should sync");
}

#[tokio::test]
async fn open_loads_document() {
    let file = NamedTempFile::new().unwrap();
    write(&file, r#"{"resources": {"db": {"port": 5432}}}"#);

    let config = ConfigFile::open(file.path()).await.unwrap();
    assert_eq!(config.snapshot().i64_or("resources.db.port", 0), 5432);
    assert!(!config.refresh().unwrap(), "unchanged file is not re-read");
}

#[tokio::test]
async fn open_reports_missing_and_invalid_files() {
    let err = ConfigFile::open("/definitely/not/here.json")
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));

    let file = NamedTempFile::new().unwrap();
    write(&file, "{ broken");
    let err = ConfigFile::open(file.path()).await.unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[tokio::test]
async fn edits_are_picked_up_by_snapshot() {
    let file = NamedTempFile::new().unwrap();
    write(&file, r#"{"host": "a.local"}"#);
    let config = ConfigFile::open(file.path()).await.unwrap();
    assert_eq!(config.snapshot().string_or("host", ""), "a.local");

    write(&file, r#"{"host": "bb.local", "port": 1}"#);
    assert_eq!(config.snapshot().string_or("host", ""), "bb.local");
    assert_eq!(config.current().i64_or("port", 0), 1);
}

#[tokio::test]
async fn broken_edit_keeps_last_good_document() {
    let file = NamedTempFile::new().unwrap();
    write(&file, r#"{"host": "a.local"}"#);
    let config = ConfigFile::open(file.path()).await.unwrap();

    write(&file, r#"{"host": "#);
    assert!(matches!(config.refresh(), Err(ConfigError::Parse { .. })));
    assert_eq!(config.snapshot().string_or("host", ""), "a.local");

    write(&file, r#"{"host": "fixed.local"}"#);
    assert_eq!(config.snapshot().string_or("host", ""), "fixed.local");
}

#[tokio::test]
async fn removed_file_keeps_last_good_document() {
    let file = NamedTempFile::new().unwrap();
    write(&file, r#"{"timeout": "5s"}"#);
    let config = ConfigFile::open(file.path()).await.unwrap();

    let path = file.path().to_path_buf();
    file.close().unwrap();
    assert!(!path.exists());

    assert!(matches!(config.refresh(), Err(ConfigError::Io { .. })));
    assert_eq!(
        config.snapshot().duration_or("timeout", Duration::ZERO),
        Duration::from_secs(5)
    );
}

#[tokio::test]
async fn from_path_reads_json() {
    let file = NamedTempFile::new().unwrap();
    write(&file, r#"{"list": [1, 2, 3]}"#);

    let doc = Configuration::from_path(file.path()).await.unwrap();
    assert_eq!(doc.get("list").unwrap().as_array().unwrap().len(), 3);
}
