#![forbid(unsafe_code)]

//! Structural invariant checks for [`DataFrame`] and a small serializable
//! operation language used to drive them from fixtures and property tests.

use nf_frame::{DataFrame, FrameError};
use nf_types::{ColumnType, ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("n_cols is {n_cols} but the column order holds {order} names")]
    ColumnCount { n_cols: usize, order: usize },
    #[error("column {name:?} at position {position} does not resolve")]
    UnresolvedColumn { position: usize, name: String },
    #[error("column {name:?} has {actual} values, frame has {expected} rows")]
    ColumnLength {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("n_rows is {n_rows} but there are {names} row names")]
    RowCount { n_rows: usize, names: usize },
    #[error("row {name:?} resolves to {resolved:?}, expected {expected}")]
    RowPosition {
        name: String,
        expected: usize,
        resolved: Option<usize>,
    },
    #[error("frame without columns reports {rows} rows")]
    RowsWithoutColumns { rows: usize },
    #[error("step {step} failed but left the frame modified")]
    PartialMutation { step: usize },
}

/// Verify the structural invariants every public operation must preserve.
///
/// Duplicate labels are allowed; a duplicated label must resolve to its last
/// occurrence.
pub fn check_frame_invariants(frame: &DataFrame) -> Result<(), InvariantViolation> {
    let (n_rows, n_cols) = frame.dim();

    let order = frame.col_names();
    if n_cols != order.len() || n_cols != frame.column_index().len() {
        return Err(InvariantViolation::ColumnCount {
            n_cols,
            order: order.len(),
        });
    }
    if n_cols == 0 && n_rows != 0 {
        return Err(InvariantViolation::RowsWithoutColumns { rows: n_rows });
    }

    for (position, name) in order.iter().enumerate() {
        let unresolved = || InvariantViolation::UnresolvedColumn {
            position,
            name: name.clone(),
        };
        let by_position = frame.column(position).map_err(|_| unresolved())?;
        let by_name = frame.column(name.as_str()).map_err(|_| unresolved())?;
        if by_position != by_name {
            return Err(unresolved());
        }
        if by_position.len() != n_rows {
            return Err(InvariantViolation::ColumnLength {
                name: name.clone(),
                expected: n_rows,
                actual: by_position.len(),
            });
        }
    }

    let rows = frame.row_names();
    if rows.len() != n_rows {
        return Err(InvariantViolation::RowCount {
            n_rows,
            names: rows.len(),
        });
    }
    for (position, name) in rows.iter().enumerate() {
        let expected = rows
            .iter()
            .rposition(|candidate| candidate == name)
            .unwrap_or(position);
        let resolved = frame.row_position(name);
        if resolved != Some(expected) {
            return Err(InvariantViolation::RowPosition {
                name: name.clone(),
                expected,
                resolved,
            });
        }
    }
    Ok(())
}

/// One mutation of a frame, in a form that can be stored as a JSON fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FrameOperation {
    AddColumn {
        name: String,
        values: Vec<f64>,
        #[serde(default)]
        column_type: ColumnType,
    },
    AddRow {
        values: Vec<f64>,
        #[serde(default)]
        name: Option<String>,
    },
    DropColumnByName {
        name: String,
    },
    DropColumnAt {
        position: usize,
    },
    DropRowByName {
        name: String,
    },
    DropRowAt {
        position: usize,
    },
    Set {
        row: usize,
        column: usize,
        value: f64,
    },
    SetColumnNames {
        names: Vec<String>,
    },
    SetRowNames {
        names: Vec<String>,
    },
    Concatenate {
        other: DataFrame,
        keep_first_only: bool,
    },
}

impl FrameOperation {
    pub fn apply(&self, frame: &mut DataFrame) -> Result<(), FrameError> {
        match self {
            Self::AddColumn {
                name,
                values,
                column_type,
            } => frame.add_column(name.clone(), values, *column_type),
            Self::AddRow { values, name } => frame.add_row(values, name.as_deref()),
            Self::DropColumnByName { name } => frame.drop_column(name.as_str()),
            Self::DropColumnAt { position } => frame.drop_column(*position),
            Self::DropRowByName { name } => frame.drop_row(name.as_str()),
            Self::DropRowAt { position } => frame.drop_row(*position),
            Self::Set { row, column, value } => frame.set(*row, *column, *value),
            Self::SetColumnNames { names } => frame.set_col_names(names.clone()),
            Self::SetRowNames { names } => frame.set_row_names(names.clone()),
            Self::Concatenate {
                other,
                keep_first_only,
            } => frame.concatenate(other, *keep_first_only),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: usize,
    pub dim: (usize, usize),
    /// Kind of the error the step failed with, if it failed.
    pub error: Option<ErrorKind>,
}

/// Apply `operations` in order, checking the invariants after every step and
/// that a failed step leaves the frame exactly as it was.
pub fn run_operations(
    frame: &mut DataFrame,
    operations: &[FrameOperation],
) -> Result<Vec<StepReport>, InvariantViolation> {
    check_frame_invariants(frame)?;

    let mut reports = Vec::with_capacity(operations.len());
    for (step, operation) in operations.iter().enumerate() {
        let before = frame.clone();
        let error = match operation.apply(frame) {
            Ok(()) => None,
            Err(err) => {
                if *frame != before {
                    return Err(InvariantViolation::PartialMutation { step });
                }
                Some(err.kind())
            }
        };
        check_frame_invariants(frame)?;
        reports.push(StepReport {
            step,
            dim: frame.dim(),
            error,
        });
    }
    Ok(reports)
}
