#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};

/// Storage representation of a column.
///
/// Every column is read back as `f64`; the representation only decides how
/// values are narrowed when they are written.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Int,
    Float,
    #[default]
    Double,
}

impl ColumnType {
    pub const ALL: [Self; 3] = [Self::Int, Self::Float, Self::Double];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Int => "Int",
            Self::Float => "Float",
            Self::Double => "Double",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Coarse classification shared by every error enum in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed dimensions, unknown names, out-of-range table positions,
    /// mismatched counts.
    InvalidArgument,
    /// Raw positional access beyond a column's length.
    OutOfRange,
    /// An operation whose prerequisite state (e.g. a fit) is missing.
    IllegalState,
    Io,
    Parse,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidArgument => "invalid argument",
            Self::OutOfRange => "out of range",
            Self::IllegalState => "illegal state",
            Self::Io => "io",
            Self::Parse => "parse",
        };
        f.write_str(name)
    }
}
