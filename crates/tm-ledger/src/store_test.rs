use super::*;
use chrono::{TimeZone, Utc};
use tempfile::TempDir;
use tm_core::{Changeset, Column, ColumnType, Operation, Table};

fn pets_step() -> MigrationStep {
    let table = Table::new(
        "pets",
        vec![Column::new("id", ColumnType::Integer).primary_key()],
    );
    MigrationStep::with_timestamp(
        None,
        "Create pets!",
        Changeset::from_forward(vec![Operation::CreateTable { table }]),
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    )
    .unwrap()
}

#[test]
fn test_step_file_name() {
    let step = pets_step();
    assert_eq!(step_file_name(&step), format!("{}_create_pets.json", step.id));
}

#[test]
fn test_write_then_read() {
    let dir = TempDir::new().unwrap();
    let step = pets_step();
    let path = write_step(dir.path(), &step).unwrap();
    assert!(path.exists());

    let stored = read_steps(dir.path()).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].step, step);
    assert_eq!(stored[0].path, path);

    // No temporary file left behind.
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_written_file_is_pretty_json() {
    let dir = TempDir::new().unwrap();
    let path = write_step(dir.path(), &pets_step()).unwrap();
    let content = fs::read_to_string(path).unwrap();
    assert!(content.starts_with("{\n  \"id\""));
    assert!(content.contains("\"forward_ops\""));
}

#[test]
fn test_ignores_hidden_and_foreign_files() {
    let dir = TempDir::new().unwrap();
    write_step(dir.path(), &pets_step()).unwrap();
    fs::write(dir.path().join(".tidemark.lock"), "pid=1").unwrap();
    fs::write(dir.path().join(".abc.json.tmp"), "{").unwrap();
    fs::write(dir.path().join("README.md"), "notes").unwrap();
    assert_eq!(read_steps(dir.path()).unwrap().len(), 1);
}

#[test]
fn test_renamed_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_step(dir.path(), &pets_step()).unwrap();
    fs::rename(&path, dir.path().join("000000000000_pets.json")).unwrap();
    let err = read_steps(dir.path()).unwrap_err();
    assert!(matches!(err, LedgerError::Tampered { .. }));
}

#[test]
fn test_invalid_json() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("abc_broken.json"), "{ not json").unwrap();
    let err = read_steps(dir.path()).unwrap_err();
    assert!(matches!(err, LedgerError::Json { .. }));
}

#[test]
fn test_missing_directory() {
    let dir = TempDir::new().unwrap();
    let err = read_steps(&dir.path().join("nope")).unwrap_err();
    assert!(matches!(err, LedgerError::IoWithPath { .. }));
}
