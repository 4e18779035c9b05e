#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::{debug, warn};
use nf_columnar::{Column, ColumnError, format_value};
use nf_index::{Index, IndexError};
use nf_types::{ColumnType, ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use nf_index::AxisKey;

/// Prefix of generated row names (`R0`, `R1`, …).
pub const DEFAULT_ROW_PREFIX: &str = "R";

/// Suffix given to an incoming column whose name collides during
/// [`DataFrame::concatenate`].
pub const COLLISION_SUFFIX: &str = "_2";

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("a frame needs at least one column")]
    NoColumns,
    #[error("column {name:?} has length {actual}, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("expected {expected} row names, got {actual}")]
    RowNamesLength { expected: usize, actual: usize },
    #[error("expected {expected} column types, got {actual}")]
    ColumnTypesLength { expected: usize, actual: usize },
    #[error("row has {actual} values but the frame has {expected} columns")]
    RowWidth { expected: usize, actual: usize },
    #[error("cannot add a row to a frame without columns")]
    RowWithoutColumns,
    #[error("row count mismatch: frame has {left} rows, other frame has {right}")]
    RowCountMismatch { left: usize, right: usize },
    #[error("invalid row selector")]
    Row(#[source] IndexError),
    #[error("invalid column selector")]
    Column(#[source] IndexError),
    #[error("inconsistent frame data: {0}")]
    Inconsistent(String),
    #[error(transparent)]
    Storage(#[from] ColumnError),
}

impl FrameError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Storage(err) => err.kind(),
            _ => ErrorKind::InvalidArgument,
        }
    }
}

fn missing_column(name: &str) -> FrameError {
    FrameError::Inconsistent(format!("column {name:?} is listed but has no data"))
}

/// Column-oriented table of numeric values with named rows and columns.
///
/// Columns are addressed by name or by position in the column order, rows by
/// name or by position. Every column holds exactly `n_rows` values, and a
/// frame without columns has no rows.
///
/// Duplicate column names are tolerated: the column order keeps every
/// occurrence while the storage keeps only the last column given for that
/// name, so all occurrences read the same data. Duplicate row names are
/// tolerated as well; lookup by name finds the last occurrence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FrameParts", into = "FrameParts")]
pub struct DataFrame {
    columns: BTreeMap<String, Column>,
    column_index: Index,
    row_index: Index,
}

impl DataFrame {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a frame from ordered `(name, column)` pairs.
    ///
    /// The first column fixes the row count. Without `row_names`, rows are
    /// named `R0, R1, …`.
    pub fn from_columns(
        named_columns: Vec<(String, Column)>,
        row_names: Option<Vec<String>>,
    ) -> Result<Self, FrameError> {
        let Some((_, first)) = named_columns.first() else {
            return Err(FrameError::NoColumns);
        };
        let n_rows = first.len();
        for (name, column) in &named_columns {
            if column.len() != n_rows {
                return Err(FrameError::LengthMismatch {
                    name: name.clone(),
                    expected: n_rows,
                    actual: column.len(),
                });
            }
        }

        let row_index = match row_names {
            Some(names) if names.len() != n_rows => {
                return Err(FrameError::RowNamesLength {
                    expected: n_rows,
                    actual: names.len(),
                });
            }
            Some(names) => Index::new(names),
            None => Index::sequential(DEFAULT_ROW_PREFIX, n_rows),
        };

        let mut columns = BTreeMap::new();
        let mut order = Vec::with_capacity(named_columns.len());
        for (name, column) in named_columns {
            order.push(name.clone());
            columns.insert(name, column);
        }
        let column_index = Index::new(order);
        if column_index.has_duplicates() {
            warn!(
                "duplicate column names {:?}; the last column given for each name is kept",
                column_index.duplicated_labels()
            );
        }

        Ok(Self {
            columns,
            column_index,
            row_index,
        })
    }

    /// Build a frame from `(name, values)` pairs, with optional row names and
    /// optional per-column types (`Double` when omitted).
    pub fn from_values(
        data: Vec<(String, Vec<f64>)>,
        row_names: Option<Vec<String>>,
        column_types: Option<Vec<ColumnType>>,
    ) -> Result<Self, FrameError> {
        let types = match column_types {
            Some(types) if types.len() != data.len() => {
                return Err(FrameError::ColumnTypesLength {
                    expected: data.len(),
                    actual: types.len(),
                });
            }
            Some(types) => types,
            None => vec![ColumnType::Double; data.len()],
        };

        let named_columns = data
            .into_iter()
            .zip(types)
            .map(|((name, values), ty)| (name, Column::from_f64s(ty, &values)))
            .collect();
        Self::from_columns(named_columns, row_names)
    }

    /// Construct a frame of `Double` columns with default row names.
    ///
    /// ```
    /// use nf_frame::DataFrame;
    ///
    /// let frame = DataFrame::from_dict([("A", vec![1.0, 2.0]), ("B", vec![3.0, 4.0])])?;
    /// assert_eq!(frame.dim(), (2, 2));
    /// # Ok::<(), nf_frame::FrameError>(())
    /// ```
    pub fn from_dict<S, I>(data: I) -> Result<Self, FrameError>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Vec<f64>)>,
    {
        let data = data
            .into_iter()
            .map(|(name, values)| (name.into(), values))
            .collect();
        Self::from_values(data, None, None)
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.row_index.len()
    }

    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.column_index.len()
    }

    /// `(rows, columns)`.
    #[must_use]
    pub fn dim(&self) -> (usize, usize) {
        (self.n_rows(), self.n_cols())
    }

    /// True when the frame has no rows or no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0 || self.n_cols() == 0
    }

    #[must_use]
    pub fn col_names(&self) -> &[String] {
        self.column_index.labels()
    }

    #[must_use]
    pub fn row_names(&self) -> &[String] {
        self.row_index.labels()
    }

    #[must_use]
    pub fn column_index(&self) -> &Index {
        &self.column_index
    }

    #[must_use]
    pub fn row_index(&self) -> &Index {
        &self.row_index
    }

    #[must_use]
    pub fn contains_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    #[must_use]
    pub fn row_position(&self, name: &str) -> Option<usize> {
        self.row_index.position(name)
    }

    #[must_use]
    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.column_index.position(name)
    }

    fn resolve_row(&self, key: AxisKey<'_>) -> Result<usize, FrameError> {
        self.row_index.resolve(key).map_err(FrameError::Row)
    }

    fn resolve_column(&self, key: AxisKey<'_>) -> Result<usize, FrameError> {
        self.column_index.resolve(key).map_err(FrameError::Column)
    }

    fn column_entry(&self, key: AxisKey<'_>) -> Result<(&str, &Column), FrameError> {
        let position = self.resolve_column(key)?;
        let name = self.column_index.labels()[position].as_str();
        let column = self.columns.get(name).ok_or_else(|| missing_column(name))?;
        Ok((name, column))
    }

    /// Borrow a column by name or position.
    pub fn column<'a>(&self, col: impl Into<AxisKey<'a>>) -> Result<&Column, FrameError> {
        self.column_entry(col.into()).map(|(_, column)| column)
    }

    /// Independent copy of a column.
    pub fn get_column<'a>(&self, col: impl Into<AxisKey<'a>>) -> Result<Column, FrameError> {
        self.column(col).cloned()
    }

    pub fn get_column_type<'a>(
        &self,
        col: impl Into<AxisKey<'a>>,
    ) -> Result<ColumnType, FrameError> {
        self.column(col).map(Column::column_type)
    }

    /// One value per column, in column order.
    pub fn get_row<'a>(&self, row: impl Into<AxisKey<'a>>) -> Result<Vec<f64>, FrameError> {
        let position = self.resolve_row(row.into())?;
        let mut values = Vec::with_capacity(self.n_cols());
        for name in &self.column_index {
            let column = self.columns.get(name).ok_or_else(|| missing_column(name))?;
            values.push(column.value(position)?);
        }
        Ok(values)
    }

    pub fn get<'r, 'c>(
        &self,
        row: impl Into<AxisKey<'r>>,
        col: impl Into<AxisKey<'c>>,
    ) -> Result<f64, FrameError> {
        let position = self.resolve_row(row.into())?;
        let (_, column) = self.column_entry(col.into())?;
        Ok(column.value(position)?)
    }

    /// Overwrite one cell, narrowing `value` to the column's type.
    pub fn set<'r, 'c>(
        &mut self,
        row: impl Into<AxisKey<'r>>,
        col: impl Into<AxisKey<'c>>,
        value: f64,
    ) -> Result<(), FrameError> {
        let row_position = self.resolve_row(row.into())?;
        let col_position = self.resolve_column(col.into())?;
        let name = &self.column_index.labels()[col_position];
        let column = self
            .columns
            .get_mut(name)
            .ok_or_else(|| missing_column(name))?;
        column.set(row_position, value)?;
        Ok(())
    }

    /// Extract a new frame holding the selected rows and columns, in selector
    /// order.
    ///
    /// Repeated row selectors repeat the row. A repeated column selector is
    /// kept once (the first occurrence) since column names must stay unique
    /// within the result.
    pub fn slice<'r, 'c, R, C>(&self, rows: R, cols: C) -> Result<Self, FrameError>
    where
        R: IntoIterator,
        R::Item: Into<AxisKey<'r>>,
        C: IntoIterator,
        C::Item: Into<AxisKey<'c>>,
    {
        let row_positions = rows
            .into_iter()
            .map(|key| self.resolve_row(key.into()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut col_positions = Vec::new();
        let mut seen = BTreeSet::new();
        for key in cols {
            let position = self.resolve_column(key.into())?;
            let name = self.column_index.labels()[position].as_str();
            if !seen.insert(name) {
                warn!("column {name:?} selected more than once; keeping the first selection");
                continue;
            }
            col_positions.push(position);
        }

        self.take(&row_positions, &col_positions)
    }

    /// All columns of the selected rows.
    pub fn select_rows<'r, R>(&self, rows: R) -> Result<Self, FrameError>
    where
        R: IntoIterator,
        R::Item: Into<AxisKey<'r>>,
    {
        self.slice(rows, 0..self.n_cols())
    }

    /// All rows of the selected columns.
    pub fn select_columns<'c, C>(&self, cols: C) -> Result<Self, FrameError>
    where
        C: IntoIterator,
        C::Item: Into<AxisKey<'c>>,
    {
        self.slice(0..self.n_rows(), cols)
    }

    fn take(&self, row_positions: &[usize], col_positions: &[usize]) -> Result<Self, FrameError> {
        if col_positions.is_empty() {
            return Ok(Self::default());
        }

        let row_index = self.row_index.take(row_positions).map_err(FrameError::Row)?;
        let mut columns = BTreeMap::new();
        let mut order = Vec::with_capacity(col_positions.len());
        for &position in col_positions {
            let (name, column) = self.column_entry(AxisKey::Position(position))?;
            columns.insert(name.to_owned(), column.take(row_positions)?);
            order.push(name.to_owned());
        }

        Ok(Self {
            columns,
            column_index: Index::new(order),
            row_index,
        })
    }

    /// Append a column built from `values`.
    ///
    /// A frame without columns adopts `values.len()` as its row count;
    /// otherwise the length must match. An existing name is left untouched
    /// and only logged.
    pub fn add_column(
        &mut self,
        name: impl Into<String>,
        values: &[f64],
        column_type: ColumnType,
    ) -> Result<(), FrameError> {
        self.insert_column(name, Column::from_f64s(column_type, values))
    }

    /// [`add_column`](Self::add_column) for an already built column.
    pub fn insert_column(
        &mut self,
        name: impl Into<String>,
        column: Column,
    ) -> Result<(), FrameError> {
        let name = name.into();
        let adopt_rows = self.n_cols() == 0;
        if !adopt_rows && column.len() != self.n_rows() {
            return Err(FrameError::LengthMismatch {
                name,
                expected: self.n_rows(),
                actual: column.len(),
            });
        }
        if self.columns.contains_key(&name) {
            warn!("column {name:?} already exists; keeping the existing column");
            return Ok(());
        }

        if adopt_rows {
            self.row_index = Index::sequential(DEFAULT_ROW_PREFIX, column.len());
        }
        self.column_index.push(name.clone());
        self.columns.insert(name, column);
        Ok(())
    }

    /// Append one row, one value per column in column order.
    ///
    /// Without a name (or with an empty one) the row is called `R<n>`, where
    /// `n` is the row count before the append.
    pub fn add_row(&mut self, values: &[f64], name: Option<&str>) -> Result<(), FrameError> {
        if self.n_cols() == 0 {
            return Err(FrameError::RowWithoutColumns);
        }
        if values.len() != self.n_cols() {
            return Err(FrameError::RowWidth {
                expected: self.n_cols(),
                actual: values.len(),
            });
        }

        // A duplicated name stores one column, fed from its last position.
        let mut appended = Vec::with_capacity(self.columns.len());
        for name in self.columns.keys() {
            let position = self
                .column_index
                .position(name)
                .ok_or_else(|| missing_column(name))?;
            appended.push(values[position]);
        }
        for (column, value) in self.columns.values_mut().zip(appended) {
            column.push_f64(value);
        }

        let label = match name {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => format!("{DEFAULT_ROW_PREFIX}{}", self.n_rows()),
        };
        self.row_index.push(label);
        Ok(())
    }

    /// Remove a column.
    ///
    /// By name, every occurrence of that name leaves the column order. By
    /// position, only that entry leaves. Dropping the last column also drops
    /// every row.
    pub fn drop_column<'a>(&mut self, col: impl Into<AxisKey<'a>>) -> Result<(), FrameError> {
        let key = col.into();
        let position = self.resolve_column(key)?;
        let name = self.column_index.labels()[position].clone();

        let remaining: Vec<String> = match key {
            AxisKey::Name(_) => self
                .column_index
                .iter()
                .filter(|label| **label != name)
                .cloned()
                .collect(),
            AxisKey::Position(_) => self
                .column_index
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != position)
                .map(|(_, label)| label.clone())
                .collect(),
        };
        if !remaining.contains(&name) {
            self.columns.remove(&name);
        }
        self.column_index = Index::new(remaining);
        if self.column_index.is_empty() {
            self.columns.clear();
            self.row_index.clear();
        }

        debug!("dropped column {name:?}; frame is now {:?}", self.dim());
        Ok(())
    }

    /// Remove a row from every column.
    pub fn drop_row<'a>(&mut self, row: impl Into<AxisKey<'a>>) -> Result<(), FrameError> {
        let position = self.resolve_row(row.into())?;
        for column in self.columns.values_mut() {
            column.remove(position)?;
        }
        let name = self.row_index.remove(position).map_err(FrameError::Row)?;

        debug!("dropped row {name:?}; frame is now {:?}", self.dim());
        Ok(())
    }

    /// Column-wise union with `other`, aligning rows by position.
    ///
    /// An incoming column whose name is already taken is discarded when
    /// `keep_first_only` is set, otherwise appended as `<name>_2`. If that
    /// name is taken too, the column is skipped with a warning. Nothing is
    /// changed when the row counts differ.
    pub fn concatenate(&mut self, other: &Self, keep_first_only: bool) -> Result<(), FrameError> {
        if other.n_rows() != self.n_rows() {
            return Err(FrameError::RowCountMismatch {
                left: self.n_rows(),
                right: other.n_rows(),
            });
        }

        let mut incoming: Vec<(String, Column)> = Vec::with_capacity(other.n_cols());
        for name in &other.column_index {
            let column = other.columns.get(name).ok_or_else(|| missing_column(name))?;
            if !self.name_taken(&incoming, name) {
                incoming.push((name.clone(), column.clone()));
                continue;
            }
            if keep_first_only {
                continue;
            }
            let renamed = format!("{name}{COLLISION_SUFFIX}");
            if self.name_taken(&incoming, &renamed) {
                warn!("skipping incoming column {name:?}: {renamed:?} is already taken");
                continue;
            }
            incoming.push((renamed, column.clone()));
        }

        for (name, column) in incoming {
            self.column_index.push(name.clone());
            self.columns.insert(name, column);
        }

        debug!(
            "concatenated {} columns; frame is now {:?}",
            other.n_cols(),
            self.dim()
        );
        Ok(())
    }

    fn name_taken(&self, incoming: &[(String, Column)], name: &str) -> bool {
        self.columns.contains_key(name) || incoming.iter().any(|(taken, _)| taken == name)
    }

    /// Rename every column at once, position by position.
    pub fn set_col_names(&mut self, names: Vec<String>) -> Result<(), FrameError> {
        if names.len() != self.n_cols() {
            return Err(FrameError::Column(IndexError::LengthMismatch {
                expected: self.n_cols(),
                actual: names.len(),
            }));
        }

        let mut columns = BTreeMap::new();
        for (old, new) in self.column_index.iter().zip(&names) {
            let column = self.columns.get(old).ok_or_else(|| missing_column(old))?;
            columns.insert(new.clone(), column.clone());
        }
        let column_index = Index::new(names);
        if column_index.has_duplicates() {
            warn!(
                "duplicate column names {:?}; the last column given for each name is kept",
                column_index.duplicated_labels()
            );
        }

        self.columns = columns;
        self.column_index = column_index;
        Ok(())
    }

    /// Rename every row at once.
    pub fn set_row_names(&mut self, names: Vec<String>) -> Result<(), FrameError> {
        self.row_index.relabel(names).map_err(FrameError::Row)
    }

    /// Write the grid rendering to stdout.
    pub fn print(&self) {
        print!("{self}");
    }
}

const CELL_WIDTH: usize = 10;

impl fmt::Display for DataFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = CELL_WIDTH;
        write!(f, "{:>width$} | ", "")?;
        for name in &self.column_index {
            write!(f, "{name:>width$} ")?;
        }
        writeln!(f)?;
        writeln!(f, "{}", "-".repeat(12 + self.n_cols() * (CELL_WIDTH + 1)))?;

        for (position, row_name) in self.row_index.iter().enumerate() {
            write!(f, "{row_name:>width$} | ")?;
            for name in &self.column_index {
                let column = self.columns.get(name).ok_or(fmt::Error)?;
                let value = column.value(position).map_err(|_| fmt::Error)?;
                let value = format_value(value);
                write!(f, "{value:>width$} ")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Serialized form of a [`DataFrame`]; validated on the way back in.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FrameParts {
    column_names: Vec<String>,
    row_names: Vec<String>,
    columns: BTreeMap<String, Column>,
}

impl From<DataFrame> for FrameParts {
    fn from(frame: DataFrame) -> Self {
        Self {
            column_names: frame.column_index.into(),
            row_names: frame.row_index.into(),
            columns: frame.columns,
        }
    }
}

impl TryFrom<FrameParts> for DataFrame {
    type Error = FrameError;

    fn try_from(parts: FrameParts) -> Result<Self, Self::Error> {
        let n_rows = parts.row_names.len();
        if parts.column_names.is_empty() && n_rows > 0 {
            return Err(FrameError::Inconsistent(format!(
                "{n_rows} row names without any column"
            )));
        }
        for name in &parts.column_names {
            let column = parts.columns.get(name).ok_or_else(|| missing_column(name))?;
            if column.len() != n_rows {
                return Err(FrameError::LengthMismatch {
                    name: name.clone(),
                    expected: n_rows,
                    actual: column.len(),
                });
            }
        }
        let column_index = Index::new(parts.column_names);
        if let Some(stray) = parts.columns.keys().find(|name| !column_index.contains(name)) {
            return Err(FrameError::Inconsistent(format!(
                "column {stray:?} has data but no position"
            )));
        }

        Ok(Self {
            columns: parts.columns,
            column_index,
            row_index: Index::new(parts.row_names),
        })
    }
}
