#![forbid(unsafe_code)]

use std::fmt;

use nf_types::{ColumnType, ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Typed backing storage of a column.
///
/// One variant per [`ColumnType`]. Values are narrowed on write and widened
/// to `f64` on read; the variant never changes after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "snake_case")]
enum ColumnData {
    Int(Vec<i32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

/// Truncates toward zero. Out-of-range values saturate at the `i32` bounds
/// and NaN becomes 0.
fn narrow_int(value: f64) -> i32 {
    value as i32
}

fn narrow_float(value: f64) -> f32 {
    value as f32
}

impl ColumnData {
    fn empty(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Int => Self::Int(Vec::new()),
            ColumnType::Float => Self::Float(Vec::new()),
            ColumnType::Double => Self::Double(Vec::new()),
        }
    }

    fn with_capacity(column_type: ColumnType, capacity: usize) -> Self {
        match column_type {
            ColumnType::Int => Self::Int(Vec::with_capacity(capacity)),
            ColumnType::Float => Self::Float(Vec::with_capacity(capacity)),
            ColumnType::Double => Self::Double(Vec::with_capacity(capacity)),
        }
    }

    fn column_type(&self) -> ColumnType {
        match self {
            Self::Int(_) => ColumnType::Int,
            Self::Float(_) => ColumnType::Float,
            Self::Double(_) => ColumnType::Double,
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Int(d) => d.len(),
            Self::Float(d) => d.len(),
            Self::Double(d) => d.len(),
        }
    }

    fn push(&mut self, value: f64) {
        match self {
            Self::Int(d) => d.push(narrow_int(value)),
            Self::Float(d) => d.push(narrow_float(value)),
            Self::Double(d) => d.push(value),
        }
    }

    /// Caller guarantees `idx < len`.
    fn get(&self, idx: usize) -> f64 {
        match self {
            Self::Int(d) => f64::from(d[idx]),
            Self::Float(d) => f64::from(d[idx]),
            Self::Double(d) => d[idx],
        }
    }

    /// Caller guarantees `idx < len`.
    fn put(&mut self, idx: usize, value: f64) {
        match self {
            Self::Int(d) => d[idx] = narrow_int(value),
            Self::Float(d) => d[idx] = narrow_float(value),
            Self::Double(d) => d[idx] = value,
        }
    }

    /// Caller guarantees `idx < len`.
    fn remove(&mut self, idx: usize) -> f64 {
        match self {
            Self::Int(d) => f64::from(d.remove(idx)),
            Self::Float(d) => f64::from(d.remove(idx)),
            Self::Double(d) => d.remove(idx),
        }
    }

    /// Caller guarantees every position is in range.
    fn gather(&self, positions: &[usize]) -> Self {
        match self {
            Self::Int(d) => Self::Int(positions.iter().map(|&p| d[p]).collect()),
            Self::Float(d) => Self::Float(positions.iter().map(|&p| d[p]).collect()),
            Self::Double(d) => Self::Double(positions.iter().map(|&p| d[p]).collect()),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ColumnError {
    #[error("index {index} out of range in {op} (column length {len})")]
    OutOfRange {
        op: &'static str,
        index: usize,
        len: usize,
    },
}

impl ColumnError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::OutOfRange
    }
}

/// A sequence of numeric values stored under one fixed [`ColumnType`].
///
/// `Clone` duplicates the backing storage; two columns never share values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Column {
    data: ColumnData,
}

impl Column {
    #[must_use]
    pub fn new(column_type: ColumnType) -> Self {
        Self {
            data: ColumnData::empty(column_type),
        }
    }

    /// Build a column of `column_type`, narrowing every value on the way in.
    #[must_use]
    pub fn from_f64s(column_type: ColumnType, values: &[f64]) -> Self {
        let mut data = ColumnData::with_capacity(column_type, values.len());
        for &value in values {
            data.push(value);
        }
        Self { data }
    }

    #[must_use]
    pub fn column_type(&self) -> ColumnType {
        self.data.column_type()
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.column_type().name()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push_f64(&mut self, value: f64) {
        self.data.push(value);
    }

    pub fn extend_from_f64s(&mut self, values: &[f64]) {
        for &value in values {
            self.data.push(value);
        }
    }

    /// Materialize every value widened to `f64`.
    #[must_use]
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match &self.data {
            ColumnData::Int(d) => d.iter().map(|&v| f64::from(v)).collect(),
            ColumnData::Float(d) => d.iter().map(|&v| f64::from(v)).collect(),
            ColumnData::Double(d) => d.clone(),
        }
    }

    pub fn iter_f64(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len()).map(|idx| self.data.get(idx))
    }

    fn check(&self, op: &'static str, index: usize) -> Result<(), ColumnError> {
        let len = self.len();
        if index >= len {
            return Err(ColumnError::OutOfRange { op, index, len });
        }
        Ok(())
    }

    pub fn value(&self, index: usize) -> Result<f64, ColumnError> {
        self.check("value", index)?;
        Ok(self.data.get(index))
    }

    /// Overwrite position `index`, narrowing `value` to the column type.
    pub fn set(&mut self, index: usize, value: f64) -> Result<(), ColumnError> {
        self.check("set", index)?;
        self.data.put(index, value);
        Ok(())
    }

    /// Remove position `index`, shifting later values down. Returns the
    /// removed value widened to `f64`.
    pub fn remove(&mut self, index: usize) -> Result<f64, ColumnError> {
        self.check("remove", index)?;
        Ok(self.data.remove(index))
    }

    /// Gather `positions` (in order, repeats allowed) into a new column of
    /// the same type.
    pub fn take(&self, positions: &[usize]) -> Result<Self, ColumnError> {
        for &position in positions {
            self.check("take", position)?;
        }
        Ok(Self {
            data: self.data.gather(positions),
        })
    }
}

/// Significant digits kept by [`format_value`].
const DISPLAY_PRECISION: i32 = 6;

/// Render a value with six significant digits, in exponent form when the
/// decimal exponent is below -4 or at least 6 (`0.333333`, `2.5`,
/// `1.23457e+06`). Trailing zeros are dropped.
#[must_use]
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_owned();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_owned();
    }

    let digits = (DISPLAY_PRECISION - 1) as usize;
    let scientific = format!("{value:.digits$e}");
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if exponent < -4 || exponent >= DISPLAY_PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exponent.abs())
    } else {
        let decimals = (DISPLAY_PRECISION - 1 - exponent) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_owned()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Data: ( ")?;
        for value in self.iter_f64() {
            write!(f, "{} ", format_value(value))?;
        }
        write!(f, "); Type: {}", self.type_name())
    }
}
