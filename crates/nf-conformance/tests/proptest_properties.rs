#![forbid(unsafe_code)]

//! Property-based tests for the structural invariants of `DataFrame`.
//!
//! Strategy generators produce arbitrary frames and arbitrary sequences of
//! mutations (including ones that must fail); properties verify behavior that
//! has to hold for ALL inputs, not just hand-picked fixtures.

use proptest::prelude::*;

use nf_conformance::{FrameOperation, check_frame_invariants, run_operations};
use nf_frame::DataFrame;
use nf_types::{ColumnType, ErrorKind};

// ---------------------------------------------------------------------------
// Strategy generators
// ---------------------------------------------------------------------------

fn arb_column_type() -> impl Strategy<Value = ColumnType> {
    prop_oneof![
        Just(ColumnType::Int),
        Just(ColumnType::Float),
        Just(ColumnType::Double),
    ]
}

fn arb_values(len: usize) -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec(-1_000_000.0_f64..1_000_000.0_f64, len)
}

/// Frame with unique column names `c0, c1, …` and default row names.
fn arb_frame(max_rows: usize, max_cols: usize) -> impl Strategy<Value = DataFrame> {
    (0..=max_rows, 1..=max_cols).prop_flat_map(|(rows, cols)| {
        proptest::collection::vec((arb_column_type(), arb_values(rows)), cols).prop_map(
            |columns| {
                let names = (0..columns.len()).map(|i| format!("c{i}"));
                let (types, data): (Vec<_>, Vec<_>) = names
                    .zip(columns)
                    .map(|(name, (ty, values))| (ty, (name, values)))
                    .unzip();
                DataFrame::from_values(data, None, Some(types)).expect("generated frame")
            },
        )
    })
}

/// Pair of frames whose row counts differ.
fn arb_mismatched_pair() -> impl Strategy<Value = (DataFrame, DataFrame)> {
    (arb_frame(6, 4), arb_frame(6, 4)).prop_filter("row counts must differ", |(a, b)| {
        a.n_rows() != b.n_rows()
    })
}

/// Names drawn from a small pool so operations collide with each other.
fn arb_name() -> impl Strategy<Value = String> {
    "[a-d]|c[0-3]|R[0-3]"
}

fn arb_operation() -> impl Strategy<Value = FrameOperation> {
    prop_oneof![
        3 => (arb_name(), 0_usize..6, arb_column_type()).prop_flat_map(|(name, len, ty)| {
            arb_values(len).prop_map(move |values| FrameOperation::AddColumn {
                name: name.clone(),
                values,
                column_type: ty,
            })
        }),
        3 => (0_usize..6, proptest::option::of(arb_name())).prop_flat_map(|(len, name)| {
            arb_values(len).prop_map(move |values| FrameOperation::AddRow {
                values,
                name: name.clone(),
            })
        }),
        2 => arb_name().prop_map(|name| FrameOperation::DropColumnByName { name }),
        2 => (0_usize..6).prop_map(|position| FrameOperation::DropColumnAt { position }),
        1 => arb_name().prop_map(|name| FrameOperation::DropRowByName { name }),
        2 => (0_usize..6).prop_map(|position| FrameOperation::DropRowAt { position }),
        2 => (0_usize..6, 0_usize..6, -100.0_f64..100.0).prop_map(|(row, column, value)| {
            FrameOperation::Set { row, column, value }
        }),
        1 => proptest::collection::vec(arb_name(), 0..5)
            .prop_map(|names| FrameOperation::SetColumnNames { names }),
        1 => proptest::collection::vec(arb_name(), 0..5)
            .prop_map(|names| FrameOperation::SetRowNames { names }),
        1 => (arb_frame(5, 3), any::<bool>()).prop_map(|(other, keep_first_only)| {
            FrameOperation::Concatenate { other, keep_first_only }
        }),
    ]
}

// ---------------------------------------------------------------------------
// Property: invariants survive arbitrary mutation sequences
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Every step keeps the frame consistent; failed steps change nothing.
    #[test]
    fn prop_operations_preserve_invariants(
        frame in arb_frame(5, 4),
        operations in proptest::collection::vec(arb_operation(), 0..20),
    ) {
        let mut frame = frame;
        let result = run_operations(&mut frame, &operations);
        prop_assert!(result.is_ok(), "invariant violated: {:?}", result.err());
    }

    /// Operations starting from an empty frame never leave rows without columns.
    #[test]
    fn prop_operations_from_empty_frame(
        operations in proptest::collection::vec(arb_operation(), 0..20),
    ) {
        let mut frame = DataFrame::new();
        let reports = run_operations(&mut frame, &operations).expect("invariants hold");
        prop_assert_eq!(reports.len(), operations.len());
        for report in reports {
            prop_assert!(report.dim.1 > 0 || report.dim.0 == 0);
            if let Some(kind) = report.error {
                prop_assert!(matches!(kind, ErrorKind::InvalidArgument | ErrorKind::OutOfRange));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Property: slicing, dropping and concatenation
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Slicing with every row and column in order reproduces the frame.
    #[test]
    fn prop_full_slice_round_trips(frame in arb_frame(8, 5)) {
        let copy = frame
            .slice(0..frame.n_rows(), 0..frame.n_cols())
            .expect("full slice");
        check_frame_invariants(&copy).expect("slice invariants");
        prop_assert_eq!(copy, frame);
    }

    /// Dropping a column and re-adding one of equal length restores the count.
    #[test]
    fn prop_drop_then_readd_restores_column_count(
        (frame, pick) in arb_frame(6, 5).prop_flat_map(|f| {
            let cols = f.n_cols();
            (Just(f), 0..cols)
        }),
    ) {
        let mut frame = frame;
        let n_cols = frame.n_cols();
        let name = frame.col_names()[pick].clone();
        let column = frame.get_column(pick).expect("column");

        frame.drop_column(name.as_str()).expect("drop");
        prop_assert_eq!(frame.n_cols(), n_cols - 1);
        frame
            .add_column(name.clone(), &column.to_f64_vec(), column.column_type())
            .expect("re-add");

        prop_assert_eq!(frame.n_cols(), n_cols);
        prop_assert_eq!(frame.get_column(name.as_str()).expect("column"), column);
        check_frame_invariants(&frame).expect("invariants");
    }

    /// Dropping by position and by the name at that position agree.
    #[test]
    fn prop_drop_by_name_matches_drop_by_position(
        (frame, pick) in arb_frame(6, 5).prop_flat_map(|f| {
            let cols = f.n_cols();
            (Just(f), 0..cols)
        }),
    ) {
        let mut by_position = frame.clone();
        let mut by_name = frame.clone();
        let name = frame.col_names()[pick].clone();

        by_position.drop_column(pick).expect("drop by position");
        by_name.drop_column(name.as_str()).expect("drop by name");
        prop_assert_eq!(by_position.col_names(), by_name.col_names());
        prop_assert_eq!(by_position, by_name);
    }

    /// Row-count mismatch is rejected without touching either frame.
    #[test]
    fn prop_concat_rejects_row_mismatch((left, right) in arb_mismatched_pair()) {
        let mut target = left.clone();
        let err = target.concatenate(&right, false).expect_err("mismatch");
        prop_assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        prop_assert_eq!(target, left);
    }

    /// Self-concatenation either keeps the frame or appends `_2` copies.
    #[test]
    fn prop_concat_collision_policy(frame in arb_frame(6, 4)) {
        let mut kept = frame.clone();
        kept.concatenate(&frame, true).expect("keep first");
        prop_assert_eq!(&kept, &frame);

        let mut renamed = frame.clone();
        renamed.concatenate(&frame, false).expect("rename");
        let n_cols = frame.n_cols();
        prop_assert_eq!(renamed.n_cols(), 2 * n_cols);
        for (i, name) in frame.col_names().iter().enumerate() {
            let suffixed = format!("{name}_2");
            prop_assert_eq!(&renamed.col_names()[n_cols + i], &suffixed);
            prop_assert_eq!(
                renamed.get_column(suffixed.as_str()).expect("copy"),
                frame.get_column(i).expect("original")
            );
        }
        check_frame_invariants(&renamed).expect("invariants");
    }
}

// ---------------------------------------------------------------------------
// Concrete scenarios
// ---------------------------------------------------------------------------

#[test]
fn concat_collision_example() {
    let left = DataFrame::from_dict([("X", vec![10.0, 20.0])]).expect("left");
    let right = DataFrame::from_dict([("X", vec![30.0, 40.0])]).expect("right");

    let mut kept = left.clone();
    kept.concatenate(&right, true).expect("keep first");
    assert_eq!(kept.col_names(), &["X"]);
    assert_eq!(kept.get_column("X").expect("X").to_f64_vec(), vec![10.0, 20.0]);

    let mut renamed = left;
    renamed.concatenate(&right, false).expect("rename");
    assert_eq!(renamed.col_names(), &["X", "X_2"]);
    assert_eq!(renamed.get_column("X_2").expect("X_2").to_f64_vec(), vec![30.0, 40.0]);
}

#[test]
fn concat_dimension_mismatch_example() {
    let left = DataFrame::from_dict([("A", vec![1.0, 2.0])]).expect("left");
    let right = DataFrame::from_dict([("B", vec![1.0, 2.0, 3.0])]).expect("right");
    let mut target = left.clone();
    let err = target.concatenate(&right, false).expect_err("mismatch");
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(target, left);
}

#[test]
fn add_row_then_rejected_add_column() {
    let mut frame =
        DataFrame::from_dict([("A", vec![1.0, 2.0, 3.0]), ("B", vec![4.0, 5.0, 6.0])])
            .expect("frame");
    let reference = frame.clone();

    frame.add_row(&[7.0, 8.0], None).expect("add_row");
    assert_eq!(frame.dim(), (4, 2));
    assert_eq!(frame.get_row(3_usize).expect("row"), vec![7.0, 8.0]);

    let mut fresh = reference.clone();
    let err = fresh
        .add_column("C", &[9.0, 10.0, 11.0, 12.0], ColumnType::Double)
        .expect_err("length mismatch");
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(fresh.dim(), (3, 2));
    assert_eq!(fresh, reference);
}

#[test]
fn drop_by_index_and_by_name_example() {
    let frame = DataFrame::from_dict([
        ("A", vec![1.0]),
        ("B", vec![2.0]),
        ("C", vec![3.0]),
    ])
    .expect("frame");

    let mut by_index = frame.clone();
    by_index.drop_column(1_usize).expect("by index");
    let mut by_name = frame;
    by_name.drop_column("B").expect("by name");

    assert_eq!(by_index.col_names(), &["A", "C"]);
    assert_eq!(by_name.col_names(), &["A", "C"]);
}
