use super::*;
use crate::ledger::RecordOptions;
use tempfile::TempDir;
use tm_core::{Column, ColumnType, DefaultValue, Operation, Table};
use tm_db::{DbError, MemoryBackend};

fn pets() -> Table {
    Table::new(
        "pets",
        vec![
            Column::new("id", ColumnType::Integer).primary_key(),
            Column::new("name", ColumnType::String { max_length: None }),
            Column::new("species", ColumnType::String { max_length: None }),
        ],
    )
}

fn users(email_unique: bool) -> Table {
    let email = Column::new("email", ColumnType::String {
        max_length: Some(120),
    });
    let email = if email_unique {
        email.unique()
    } else {
        email.not_null()
    };
    Table::new(
        "users",
        vec![
            Column::new("id", ColumnType::Integer).primary_key(),
            Column::new("username", ColumnType::String {
                max_length: Some(80),
            })
            .unique()
            .not_null()
            .indexed(),
            email,
            Column::new("verified", ColumnType::Boolean).with_default(DefaultValue::Bool(false)),
        ],
    )
}

/// Ledger with three steps: pets, users, users.email relaxed.
fn petstore() -> (TempDir, Ledger) {
    let dir = TempDir::new().unwrap();
    let mut ledger = Ledger::init(dir.path()).unwrap();
    let schemas = [
        ("create pets", vec![pets()]),
        ("add users", vec![pets(), users(true)]),
        ("email not unique", vec![pets(), users(false)]),
    ];
    for (message, tables) in schemas {
        ledger
            .record(
                &SchemaSnapshot::new(tables),
                message,
                RecordOptions::default(),
            )
            .unwrap()
            .unwrap();
    }
    (dir, ledger)
}

fn ids(ledger: &Ledger) -> Vec<StepId> {
    ledger.steps().iter().map(|s| s.id.clone()).collect()
}

#[test]
fn test_upgrade_head_then_downgrade_base() {
    let (_dir, ledger) = petstore();
    let db = MemoryBackend::new();
    let migrator = Migrator::new(&ledger, &db);
    assert_eq!(migrator.current().unwrap(), None);

    let report = migrator.upgrade(&Target::Head).unwrap();
    assert_eq!(report.steps, ids(&ledger));
    assert_eq!(report.to, ledger.head_id().cloned());
    assert_eq!(report.operations, 3);
    assert_eq!(db.introspect().unwrap(), ledger.head_snapshot().unwrap());
    assert_eq!(migrator.current().unwrap(), ledger.head_id().cloned());

    let report = migrator.downgrade(&Target::Base).unwrap();
    assert_eq!(report.to, None);
    assert_eq!(report.steps.len(), 3);
    assert_eq!(report.steps[0], ids(&ledger)[2]);
    assert!(db.introspect().unwrap().is_empty());
    assert_eq!(migrator.current().unwrap(), None);
}

#[test]
fn test_stepwise_positions_match_recorded_schema() {
    let (_dir, ledger) = petstore();
    let db = MemoryBackend::new();
    let migrator = Migrator::new(&ledger, &db);

    for expected in ids(&ledger) {
        migrator.upgrade(&Target::Relative(1)).unwrap();
        assert_eq!(migrator.current().unwrap(), Some(expected.clone()));
        assert_eq!(
            db.introspect().unwrap(),
            ledger.snapshot_at(Some(&expected)).unwrap()
        );
    }

    migrator.downgrade(&Target::Relative(-1)).unwrap();
    let second = ids(&ledger)[1].clone();
    assert_eq!(migrator.current().unwrap(), Some(second.clone()));
    let users = db.introspect().unwrap().table("users").unwrap().clone();
    let email = users.column("email").unwrap();
    assert!(email.unique);
    assert!(email.nullable);
}

#[test]
fn test_upgrade_to_prefix() {
    let (_dir, ledger) = petstore();
    let db = MemoryBackend::new();
    let migrator = Migrator::new(&ledger, &db);
    let first = ids(&ledger)[0].clone();

    let report = migrator
        .upgrade(&Target::Id(first.as_str().to_string()))
        .unwrap();
    assert_eq!(report.steps, vec![first.clone()]);
    assert!(db.introspect().unwrap().has_table("pets"));
    assert!(!db.introspect().unwrap().has_table("users"));
}

#[test]
fn test_wrong_direction_is_rejected() {
    let (_dir, ledger) = petstore();
    let db = MemoryBackend::new();
    let migrator = Migrator::new(&ledger, &db);
    migrator.upgrade(&Target::Relative(2)).unwrap();

    let first = Target::Id(ids(&ledger)[0].to_string());
    assert!(matches!(
        migrator.upgrade(&first),
        Err(LedgerError::InvalidTarget { .. })
    ));
    assert!(matches!(
        migrator.downgrade(&Target::Head),
        Err(LedgerError::InvalidTarget { .. })
    ));
    assert_eq!(migrator.current().unwrap(), Some(ids(&ledger)[1].clone()));
}

#[test]
fn test_noop_upgrade() {
    let (_dir, ledger) = petstore();
    let db = MemoryBackend::new();
    let migrator = Migrator::new(&ledger, &db);
    migrator.upgrade(&Target::Head).unwrap();

    let report = migrator.upgrade(&Target::Head).unwrap();
    assert!(report.is_noop());
    assert!(report.steps.is_empty());
}

#[test]
fn test_unknown_database_version() {
    let (_dir, ledger) = petstore();
    let db = MemoryBackend::new();
    db.set_version(Some(&StepId::new("feedface0000"))).unwrap();
    let migrator = Migrator::new(&ledger, &db);

    assert!(matches!(
        migrator.current(),
        Err(LedgerError::UnknownDatabaseVersion { .. })
    ));
    assert!(matches!(
        migrator.upgrade(&Target::Head),
        Err(LedgerError::UnknownDatabaseVersion { .. })
    ));

    // Stamping repairs the pointer without touching the schema.
    migrator.stamp(&Target::Base).unwrap();
    assert_eq!(migrator.current().unwrap(), None);
}

#[test]
fn test_failed_run_leaves_position_unchanged() {
    let (_dir, ledger) = petstore();
    // A users table already exists, so the second step cannot create it.
    let db = MemoryBackend::with_schema(SchemaSnapshot::new(vec![users(true)]));
    let migrator = Migrator::new(&ledger, &db);

    let err = migrator.upgrade(&Target::Head).unwrap_err();
    match err {
        LedgerError::Apply(apply) => {
            assert_eq!(apply.step, ids(&ledger)[1]);
            assert_eq!(apply.direction, Direction::Up);
            assert_eq!(apply.index, 0);
            assert!(apply.operation.starts_with("create table users"));
            assert!(matches!(apply.source, DbError::Conflict(_)));
        }
        other => panic!("expected apply error, got {other}"),
    }

    assert_eq!(migrator.current().unwrap(), None);
    assert!(!db.introspect().unwrap().has_table("pets"));
    assert!(db.transitions().unwrap().is_empty());
}

#[test]
fn test_transaction_per_step_keeps_committed_steps() {
    let (_dir, ledger) = petstore();
    let db = MemoryBackend::with_schema(SchemaSnapshot::new(vec![users(true)]));
    let migrator = Migrator::new(&ledger, &db).with_transaction_per_step(true);

    assert!(migrator.upgrade(&Target::Head).is_err());
    assert_eq!(migrator.current().unwrap(), Some(ids(&ledger)[0].clone()));
    assert!(db.introspect().unwrap().has_table("pets"));
    assert_eq!(db.transitions().unwrap().len(), 1);
}

#[test]
fn test_transitions_are_recorded() {
    let (_dir, ledger) = petstore();
    let db = MemoryBackend::new();
    let migrator = Migrator::new(&ledger, &db);
    migrator.upgrade(&Target::Relative(1)).unwrap();
    migrator.downgrade(&Target::Base).unwrap();
    migrator.stamp(&Target::Head).unwrap();

    let directions: Vec<Direction> = db
        .transitions()
        .unwrap()
        .into_iter()
        .map(|t| t.direction)
        .collect();
    assert_eq!(
        directions,
        vec![Direction::Up, Direction::Down, Direction::Stamp]
    );
}

#[test]
fn test_stamp_runs_no_ddl() {
    let (_dir, ledger) = petstore();
    let db = MemoryBackend::new();
    let migrator = Migrator::new(&ledger, &db);

    let report = migrator.stamp(&Target::Head).unwrap();
    assert_eq!(report.to, ledger.head_id().cloned());
    assert_eq!(report.operations, 0);
    assert!(db.introspect().unwrap().is_empty());
    assert!(migrator.pending().unwrap().is_empty());
}

#[test]
fn test_pending() {
    let (_dir, ledger) = petstore();
    let db = MemoryBackend::new();
    let migrator = Migrator::new(&ledger, &db);
    assert_eq!(migrator.pending().unwrap().len(), 3);
    migrator.upgrade(&Target::Relative(1)).unwrap();
    let pending = migrator.pending().unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].message, "add users");
}

#[test]
fn test_check_reports_unrecorded_changes() {
    let (_dir, ledger) = petstore();
    let db = MemoryBackend::new();
    let migrator = Migrator::new(&ledger, &db);

    let recorded = ledger.head_snapshot().unwrap();
    assert!(migrator
        .check(&recorded, DiffOptions::default())
        .unwrap()
        .is_empty());

    let declared = SchemaSnapshot::new(vec![users(false)]);
    let changes = migrator.check(&declared, DiffOptions::default()).unwrap();
    assert_eq!(
        changes.forward,
        vec![Operation::DropTable { table: pets() }]
    );
}

#[test]
fn test_upgrade_blocked_by_lock() {
    let (_dir, ledger) = petstore();
    let db = MemoryBackend::new();
    let _held = ledger.lock().unwrap();
    let migrator = Migrator::new(&ledger, &db);
    assert!(matches!(
        migrator.upgrade(&Target::Head),
        Err(LedgerError::Locked { .. })
    ));
    assert!(db.introspect().unwrap().is_empty());
}

#[test]
fn test_offline_script() {
    let (_dir, ledger) = petstore();
    let db = MemoryBackend::new();
    let migrator = Migrator::new(&ledger, &db);

    let script = migrator.upgrade_sql(&Target::Head).unwrap();
    assert!(script.starts_with("-- tidemark up base -> "));
    assert!(script.contains("BEGIN TRANSACTION;"));
    assert!(script.contains("-- create table pets"));
    assert!(script.contains("-- alter column users.email: unique=false, nullable=false"));
    assert!(script.trim_end().ends_with("COMMIT;"));
    // Rendering never touches the database.
    assert!(db.introspect().unwrap().is_empty());
    assert_eq!(migrator.current().unwrap(), None);

    assert!(migrator.downgrade_sql(&Target::Base).unwrap().is_empty());
}

#[test]
fn test_migrators_sharing_a_ledger_are_serialized_by_the_lock() {
    let (_dir, ledger) = petstore();
    let db = MemoryBackend::new();
    let first = Migrator::new(&ledger, &db);
    let second = Migrator::new(&ledger, &db);

    // Stands in for `first` being mid-run in another thread.
    let held = ledger.lock().unwrap();
    assert!(matches!(
        second.upgrade(&Target::Head),
        Err(LedgerError::Locked { .. })
    ));
    assert!(matches!(
        second.stamp(&Target::Head),
        Err(LedgerError::Locked { .. })
    ));
    drop(held);

    first.upgrade(&Target::Relative(1)).unwrap();
    let report = second.upgrade(&Target::Head).unwrap();
    assert_eq!(report.from, Some(ids(&ledger)[0].clone()));
    assert_eq!(report.steps.len(), 2);
    assert!(first.pending().unwrap().is_empty());
}
