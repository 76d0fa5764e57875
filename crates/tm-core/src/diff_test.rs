use super::*;
use crate::column_type::ColumnType;
use crate::operation::Phase;
use crate::schema::{DefaultValue, TableName};

fn string(n: Option<u32>) -> ColumnType {
    ColumnType::String { max_length: n }
}

fn pets() -> Table {
    Table::new(
        "pets",
        vec![
            Column::new("id", ColumnType::Integer).primary_key(),
            Column::new("name", string(None)),
            Column::new("species", string(None)),
        ],
    )
}

fn users() -> Table {
    Table::new(
        "users",
        vec![
            Column::new("id", ColumnType::Integer).primary_key(),
            Column::new("username", string(Some(80)))
                .unique()
                .not_null()
                .indexed(),
            Column::new("email", string(Some(120))).unique(),
            Column::new("verified", ColumnType::Boolean).with_default(DefaultValue::Bool(false)),
        ],
    )
}

#[test]
fn test_diff_identical_is_empty() {
    let a = SchemaSnapshot::new(vec![pets(), users()]);
    let b = SchemaSnapshot::new(vec![users(), pets()]);
    let changes = diff(&a, &b).unwrap();
    assert!(changes.is_empty());
    assert!(changes.reverse.is_empty());
}

#[test]
fn test_empty_to_pets() {
    let a = SchemaSnapshot::empty();
    let b = SchemaSnapshot::new(vec![pets()]);
    let changes = diff(&a, &b).unwrap();

    assert_eq!(changes.forward, vec![Operation::CreateTable { table: pets() }]);
    assert_eq!(changes.reverse, vec![Operation::DropTable { table: pets() }]);
    match &changes.forward[0] {
        Operation::CreateTable { table } => assert_eq!(table.columns.len(), 3),
        other => panic!("unexpected operation: {}", other),
    }
}

#[test]
fn test_adding_users_leaves_pets_untouched() {
    let b = SchemaSnapshot::new(vec![pets()]);
    let c = SchemaSnapshot::new(vec![pets(), users()]);
    let changes = diff(&b, &c).unwrap();

    assert_eq!(changes.forward, vec![Operation::CreateTable { table: users() }]);
    assert_eq!(changes.reverse, vec![Operation::DropTable { table: users() }]);
    assert!(changes.forward.iter().all(|op| op.table_name() != "pets"));
}

#[test]
fn test_email_alter() {
    let c = SchemaSnapshot::new(vec![pets(), users()]);
    let mut changed = users();
    let email = changed.columns.iter_mut().find(|c| c.name == "email").unwrap();
    email.unique = false;
    email.nullable = false;
    let d = SchemaSnapshot::new(vec![pets(), changed]);

    let changes = diff(&c, &d).unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(
        changes.forward[0].to_string(),
        "alter column users.email: unique=false, nullable=false"
    );
    assert_eq!(
        changes.reverse[0].to_string(),
        "alter column users.email: unique=true, nullable=true"
    );
}

#[test]
fn test_dropped_table_keeps_definition_for_reverse() {
    let a = SchemaSnapshot::new(vec![pets(), users()]);
    let b = SchemaSnapshot::new(vec![users()]);
    let changes = diff(&a, &b).unwrap();
    assert_eq!(changes.forward, vec![Operation::DropTable { table: pets() }]);
    assert_eq!(changes.reverse, vec![Operation::CreateTable { table: pets() }]);
}

#[test]
fn test_column_add_and_drop() {
    let a = SchemaSnapshot::new(vec![pets()]);
    let mut table = pets();
    table.columns.retain(|c| c.name != "species");
    table.columns.push(Column::new("age", ColumnType::SmallInteger));
    let b = SchemaSnapshot::new(vec![table]);

    let changes = diff(&a, &b).unwrap();
    assert_eq!(
        changes.forward,
        vec![
            Operation::AddColumn {
                table: TableName::new("pets"),
                column: Column::new("age", ColumnType::SmallInteger),
            },
            Operation::DropColumn {
                table: TableName::new("pets"),
                column: Column::new("species", string(None)),
            },
        ]
    );
    assert_eq!(changes.reverse, invert_all(&changes.forward));
}

#[test]
fn test_phase_ordering_across_tables() {
    let a = SchemaSnapshot::new(vec![
        pets(),
        Table::new(
            "legacy",
            vec![
                Column::new("id", ColumnType::Integer).primary_key(),
                Column::new("payload", ColumnType::Binary),
            ],
        ),
    ]);
    let mut altered_pets = pets();
    altered_pets.columns[1].nullable = false;
    altered_pets
        .columns
        .push(Column::new("born", ColumnType::Date));
    let b = SchemaSnapshot::new(vec![altered_pets, users()]);

    let changes = diff(&a, &b).unwrap();
    let phases: Vec<Phase> = changes.forward.iter().map(Operation::phase).collect();
    assert_eq!(
        phases,
        vec![
            Phase::CreateTable,
            Phase::AddColumn,
            Phase::AlterColumn,
            Phase::DropTable
        ]
    );
    let reverse_phases: Vec<Phase> = changes.reverse.iter().map(Operation::phase).collect();
    assert_eq!(
        reverse_phases,
        vec![
            Phase::CreateTable,
            Phase::AlterColumn,
            Phase::DropColumn,
            Phase::DropTable
        ]
    );
}

#[test]
fn test_ambiguous_table_rename() {
    let a = SchemaSnapshot::new(vec![pets()]);
    let mut animals = pets();
    animals.name = TableName::new("animals");
    let b = SchemaSnapshot::new(vec![animals]);

    let err = diff(&a, &b).unwrap_err();
    assert!(matches!(err, DiffError::AmbiguousTableRename { .. }));
    assert!(err.to_string().contains("[DF001]"));

    let changes = Differ::new(DiffOptions {
        assume_drop_create: true,
    })
    .diff(&a, &b)
    .unwrap();
    assert_eq!(changes.len(), 2);
    assert_eq!(changes.forward[0].phase(), Phase::CreateTable);
    assert_eq!(changes.forward[1].phase(), Phase::DropTable);
}

#[test]
fn test_ambiguous_column_rename() {
    let a = SchemaSnapshot::new(vec![pets()]);
    let mut table = pets();
    table.columns[2].name = crate::schema::ColumnName::new("kind");
    let b = SchemaSnapshot::new(vec![table]);

    match diff(&a, &b).unwrap_err() {
        DiffError::AmbiguousColumnRename { table, from, to } => {
            assert_eq!(table, "pets");
            assert_eq!(from, "species");
            assert_eq!(to, "kind");
        }
        other => panic!("unexpected error: {}", other),
    }

    let changes = Differ::new(DiffOptions {
        assume_drop_create: true,
    })
    .diff(&a, &b)
    .unwrap();
    assert_eq!(changes.len(), 2);
}

#[test]
fn test_different_definitions_are_not_a_rename() {
    let a = SchemaSnapshot::new(vec![pets()]);
    let mut table = pets();
    table.columns[2] = Column::new("kind", string(Some(40)));
    let b = SchemaSnapshot::new(vec![table]);
    assert_eq!(diff(&a, &b).unwrap().len(), 2);
}

#[test]
fn test_primary_key_change_is_rejected() {
    let a = SchemaSnapshot::new(vec![pets()]);
    let table = Table::new(
        "pets",
        vec![
            Column::new("id", ColumnType::Integer).not_null(),
            Column::new("name", string(None)).primary_key(),
            Column::new("species", string(None)),
        ],
    );
    let b = SchemaSnapshot::new(vec![table]);
    let err = diff(&a, &b).unwrap_err();
    assert!(matches!(err, DiffError::PrimaryKeyChanged { .. }));
}

#[test]
fn test_forward_then_reverse_restores_schema() {
    let a = SchemaSnapshot::new(vec![pets()]);
    let mut altered = pets();
    altered.columns[1].column_type = ColumnType::Text;
    let b = SchemaSnapshot::new(vec![altered, users()]);

    let changes = diff(&a, &b).unwrap();
    let applied = a.apply(&changes.forward).unwrap();
    assert_eq!(applied, b);
    assert_eq!(applied.apply(&changes.reverse).unwrap(), a);
}

#[test]
fn test_step_chains_to_parent() {
    let a = SchemaSnapshot::empty();
    let b = SchemaSnapshot::new(vec![pets()]);
    let first = Differ::default().step(&a, &b, None, "add pets").unwrap();
    assert!(first.parent_id.is_none());
    assert_eq!(first.forward_ops.len(), 1);

    let c = SchemaSnapshot::new(vec![pets(), users()]);
    let second = Differ::default()
        .step(&b, &c, Some(first.id.clone()), "add users")
        .unwrap();
    assert_eq!(second.parent_id, Some(first.id));
    assert!(second.reverse_is_inverse());
}
