//! Property tests for the differ's round-trip laws.

use proptest::prelude::*;
use tm_core::{
    Column, ColumnType, DefaultValue, DiffOptions, Differ, Operation, SchemaSnapshot, Table,
};

const TABLE_NAMES: [&str; 3] = ["accounts", "orders", "pets"];
const COLUMN_NAMES: [&str; 4] = ["alpha", "beta", "gamma", "delta"];

fn column_type() -> impl Strategy<Value = ColumnType> {
    prop_oneof![
        Just(ColumnType::Integer),
        Just(ColumnType::BigInteger),
        Just(ColumnType::Boolean),
        Just(ColumnType::Text),
        Just(ColumnType::Date),
        Just(ColumnType::String { max_length: None }),
        (1u32..255).prop_map(|n| ColumnType::String {
            max_length: Some(n)
        }),
    ]
}

type ColumnParts = (ColumnType, bool, bool, bool, Option<bool>);

fn column_parts() -> impl Strategy<Value = ColumnParts> {
    (
        column_type(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        proptest::option::of(any::<bool>()),
    )
}

fn table(name: &'static str) -> impl Strategy<Value = Table> {
    (
        prop_oneof![Just(ColumnType::Integer), Just(ColumnType::BigInteger)],
        proptest::collection::vec(proptest::option::of(column_parts()), COLUMN_NAMES.len()),
    )
        .prop_map(move |(key_type, parts)| {
            let mut columns = vec![Column::new("id", key_type).primary_key()];
            for (column_name, part) in COLUMN_NAMES.iter().zip(parts) {
                if let Some((ty, nullable, unique, index, default)) = part {
                    columns.push(Column {
                        nullable,
                        unique,
                        index,
                        default: default.map(DefaultValue::Bool),
                        ..Column::new(*column_name, ty)
                    });
                }
            }
            Table::new(name, columns)
        })
}

fn snapshot() -> impl Strategy<Value = SchemaSnapshot> {
    (
        proptest::option::of(table(TABLE_NAMES[0])),
        proptest::option::of(table(TABLE_NAMES[1])),
        proptest::option::of(table(TABLE_NAMES[2])),
    )
        .prop_map(|(a, b, c)| SchemaSnapshot::new([a, b, c].into_iter().flatten()))
}

fn differ() -> Differ {
    Differ::new(DiffOptions {
        assume_drop_create: true,
    })
}

proptest! {
    #[test]
    fn diff_of_identical_snapshots_is_empty(a in snapshot()) {
        let changes = Differ::default().diff(&a, &a).unwrap();
        prop_assert!(changes.is_empty());
    }

    #[test]
    fn forward_ops_reach_the_new_schema(a in snapshot(), b in snapshot()) {
        let changes = differ().diff(&a, &b).unwrap();
        let applied = a.apply(&changes.forward).unwrap();
        prop_assert_eq!(applied, b);
    }

    #[test]
    fn forward_then_reverse_restores_the_old_schema(a in snapshot(), b in snapshot()) {
        let changes = differ().diff(&a, &b).unwrap();
        let forward = a.apply(&changes.forward).unwrap();
        let back = forward.apply(&changes.reverse).unwrap();
        prop_assert_eq!(back, a);
    }

    #[test]
    fn operations_are_phase_ordered(a in snapshot(), b in snapshot()) {
        let changes = differ().diff(&a, &b).unwrap();
        for ops in [&changes.forward, &changes.reverse] {
            let phases: Vec<_> = ops.iter().map(Operation::phase).collect();
            prop_assert!(phases.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn diff_is_empty_after_applying(a in snapshot(), b in snapshot()) {
        let changes = differ().diff(&a, &b).unwrap();
        let applied = a.apply(&changes.forward).unwrap();
        prop_assert!(differ().diff(&applied, &b).unwrap().is_empty());
    }
}
