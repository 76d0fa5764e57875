//! Integration tests for the tidemark CLI

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;
use tm_core::{Config, SchemaRegistry};
use tm_ledger::Ledger;

/// Path to the compiled tidemark binary
fn tidemark_bin() -> String {
    env!("CARGO_BIN_EXE_tidemark").to_string()
}

/// Run a `tidemark` CLI command in `project` and return (stdout, stderr, success).
fn run_tidemark(project: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(tidemark_bin())
        .arg("--project-dir")
        .arg(project)
        .args(args)
        .env_remove("TIDEMARK_TARGET")
        .env_remove("TIDEMARK_DATABASE")
        .output()
        .unwrap_or_else(|e| panic!("Failed to execute tidemark with args {:?}: {}", args, e));
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

fn copy_dir(from: &Path, to: &Path) {
    fs::create_dir_all(to).unwrap();
    for entry in fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.path().is_dir() {
            copy_dir(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
}

/// A scratch copy of the petstore fixture with an initialized ledger.
fn petstore() -> TempDir {
    let dir = TempDir::new().unwrap();
    copy_dir(Path::new("tests/fixtures/petstore"), dir.path());
    let (stdout, stderr, ok) = run_tidemark(dir.path(), &["init"]);
    assert!(ok, "init failed: {stderr}");
    assert!(stdout.contains("Using existing"));
    dir
}

#[test]
fn test_fixture_declarations_load() {
    let root = Path::new("tests/fixtures/petstore");
    let config = Config::load_from_dir(root).unwrap();
    assert_eq!(config.name, "petstore");

    let mut registry = SchemaRegistry::new();
    let loaded = registry
        .load_dirs(&config.schema_paths_absolute(root))
        .unwrap();
    assert_eq!(loaded, 2);

    let snapshot = registry.snapshot().unwrap();
    let users = snapshot.table("users").unwrap();
    let username = users.column("username").unwrap();
    assert!(username.unique && username.index && !username.nullable);
    assert!(users.column("email").unwrap().nullable);
}

#[test]
fn test_init_scaffolds_new_project() {
    let dir = TempDir::new().unwrap();
    let project = dir.path().join("shop");
    let (_, stderr, ok) = run_tidemark(&project, &["init", "--name", "shop"]);
    assert!(ok, "init failed: {stderr}");

    let config = Config::load_from_dir(&project).unwrap();
    assert_eq!(config.name, "shop");
    assert_eq!(config.database.path, "app.duckdb");
    assert!(project.join("schema").is_dir());
    assert!(Ledger::open(&project.join("migrations")).unwrap().is_empty());

    // Re-running init is fine while the ledger is empty.
    let (_, _, ok) = run_tidemark(&project, &["init"]);
    assert!(ok);
}

#[test]
fn test_full_workflow() {
    let dir = petstore();
    let project = dir.path();

    let (stdout, _, ok) = run_tidemark(project, &["check"]);
    assert!(!ok, "check should fail before anything is recorded");
    assert!(stdout.contains("create table pets"));

    let (stdout, stderr, ok) = run_tidemark(project, &["migrate", "-m", "initial schema"]);
    assert!(ok, "migrate failed: {stderr}");
    assert!(stdout.contains("Recorded step"));
    let ledger = Ledger::open(&project.join("migrations")).unwrap();
    let head = ledger.head_id().unwrap().to_string();

    let (stdout, _, ok) = run_tidemark(project, &["migrate", "-m", "again"]);
    assert!(ok);
    assert!(stdout.contains("No changes detected"));

    let (stdout, _, ok) = run_tidemark(project, &["current"]);
    assert!(ok);
    assert!(stdout.starts_with("base"));

    let (stdout, stderr, ok) = run_tidemark(project, &["upgrade"]);
    assert!(ok, "upgrade failed: {stderr}");
    assert!(stdout.contains(&head));
    assert!(project.join("petstore.duckdb").exists());

    let (stdout, _, ok) = run_tidemark(project, &["current"]);
    assert!(ok);
    assert!(stdout.starts_with(&format!("{} (head)", head)));

    let (stdout, _, ok) = run_tidemark(project, &["check"]);
    assert!(ok);
    assert!(stdout.contains("No unrecorded changes"));

    let (stdout, _, ok) = run_tidemark(project, &["history"]);
    assert!(ok);
    assert!(stdout.contains("applied"));
    assert!(stdout.contains("initial schema"));

    let (stdout, _, ok) = run_tidemark(project, &["show", &head[..6]]);
    assert!(ok);
    assert!(stdout.contains("Forward:"));
    assert!(stdout.contains("drop table users"));

    let (stdout, stderr, ok) = run_tidemark(project, &["downgrade", "base"]);
    assert!(ok, "downgrade failed: {stderr}");
    assert!(stdout.contains("to base"));

    let (stdout, _, ok) = run_tidemark(project, &["history", "--log"]);
    assert!(ok);
    assert!(stdout.contains("up"));
    assert!(stdout.contains("down"));
}

#[test]
fn test_offline_sql_does_not_migrate() {
    let dir = petstore();
    let project = dir.path();
    run_tidemark(project, &["migrate", "-m", "initial schema"]);

    let (stdout, stderr, ok) = run_tidemark(project, &["upgrade", "--sql"]);
    assert!(ok, "upgrade --sql failed: {stderr}");
    assert!(stdout.contains("CREATE TABLE \"pets\""));
    assert!(stdout.contains("CREATE UNIQUE INDEX"));
    assert!(stdout.contains("COMMIT;"));

    let (stdout, _, _) = run_tidemark(project, &["current"]);
    assert!(stdout.starts_with("base"));
}

#[test]
fn test_stamp_and_wrong_direction() {
    let dir = petstore();
    let project = dir.path();
    run_tidemark(project, &["migrate", "-m", "initial schema"]);

    // At base, downgrading towards head is the wrong direction.
    let (_, stderr, ok) = run_tidemark(project, &["downgrade", "head"]);
    assert!(!ok);
    assert!(stderr.contains("L012"), "unexpected error: {stderr}");

    let (_, stderr, ok) = run_tidemark(project, &["stamp", "head"]);
    assert!(ok, "stamp failed: {stderr}");
    let (stdout, _, _) = run_tidemark(project, &["current"]);
    assert!(stdout.contains("(head)"));
    // Stamping never creates tables.
    let db = tm_db::DuckDbBackend::from_path(&project.join("petstore.duckdb")).unwrap();
    assert!(tm_db::Database::introspect(&db).unwrap().is_empty());
    drop(db);

    let (_, _, ok) = run_tidemark(project, &["stamp", "base"]);
    assert!(ok);
    let (stdout, _, _) = run_tidemark(project, &["current"]);
    assert!(stdout.starts_with("base"));
}

#[test]
fn test_memory_target() {
    let dir = petstore();
    let project = dir.path();
    run_tidemark(project, &["migrate", "-m", "initial schema"]);

    let (stdout, stderr, ok) = run_tidemark(project, &["--target", "test", "upgrade"]);
    assert!(ok, "upgrade failed: {stderr}");
    assert!(stdout.contains("operation(s)"));
    assert!(!project.join("petstore.duckdb").exists());

    let (_, stderr, ok) = run_tidemark(project, &["--target", "nope", "current"]);
    assert!(!ok);
    assert!(stderr.contains("E003"), "unexpected error: {stderr}");
}

#[test]
fn test_missing_ledger() {
    let dir = TempDir::new().unwrap();
    copy_dir(Path::new("tests/fixtures/petstore"), dir.path());
    let (_, stderr, ok) = run_tidemark(dir.path(), &["heads"]);
    assert!(!ok);
    assert!(stderr.contains("L003"), "unexpected error: {stderr}");
}
