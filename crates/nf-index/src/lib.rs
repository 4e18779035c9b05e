#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fmt;

use nf_types::ErrorKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Selects one row or column either by position or by label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisKey<'a> {
    Position(usize),
    Name(&'a str),
}

impl From<usize> for AxisKey<'_> {
    fn from(value: usize) -> Self {
        Self::Position(value)
    }
}

impl From<&usize> for AxisKey<'_> {
    fn from(value: &usize) -> Self {
        Self::Position(*value)
    }
}

impl<'a> From<&'a str> for AxisKey<'a> {
    fn from(value: &'a str) -> Self {
        Self::Name(value)
    }
}

impl<'a> From<&&'a str> for AxisKey<'a> {
    fn from(value: &&'a str) -> Self {
        Self::Name(value)
    }
}

impl<'a> From<&'a String> for AxisKey<'a> {
    fn from(value: &'a String) -> Self {
        Self::Name(value.as_str())
    }
}

impl fmt::Display for AxisKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position(p) => write!(f, "position {p}"),
            Self::Name(n) => write!(f, "{n:?}"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("position {position} out of range for {len} labels")]
    PositionOutOfRange { position: usize, len: usize },
    #[error("unknown label {label:?}")]
    UnknownLabel { label: String },
    #[error("expected {expected} labels, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

impl IndexError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidArgument
    }
}

/// Ordered labels plus the derived label → position map.
///
/// Labels are not required to be unique. When a label repeats, the map points
/// at its last occurrence, so earlier duplicates are only reachable by
/// position.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Index {
    labels: Vec<String>,
    positions: HashMap<String, usize>,
}

impl PartialEq for Index {
    fn eq(&self, other: &Self) -> bool {
        self.labels == other.labels
    }
}

impl Eq for Index {}

impl From<Vec<String>> for Index {
    fn from(labels: Vec<String>) -> Self {
        Self::new(labels)
    }
}

impl From<Index> for Vec<String> {
    fn from(index: Index) -> Self {
        index.labels
    }
}

fn build_positions(labels: &[String]) -> HashMap<String, usize> {
    let mut positions = HashMap::with_capacity(labels.len());
    for (pos, label) in labels.iter().enumerate() {
        positions.insert(label.clone(), pos);
    }
    positions
}

impl Index {
    #[must_use]
    pub fn new(labels: Vec<String>) -> Self {
        let positions = build_positions(&labels);
        Self { labels, positions }
    }

    /// `prefix0, prefix1, …` for `len` labels.
    #[must_use]
    pub fn sequential(prefix: &str, len: usize) -> Self {
        Self::new((0..len).map(|i| format!("{prefix}{i}")).collect())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    #[must_use]
    pub fn label(&self, position: usize) -> Option<&str> {
        self.labels.get(position).map(String::as_str)
    }

    #[must_use]
    pub fn position(&self, label: &str) -> Option<usize> {
        self.positions.get(label).copied()
    }

    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.positions.contains_key(label)
    }

    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        self.positions.len() != self.labels.len()
    }

    /// Labels that occur more than once, in order of their second occurrence.
    #[must_use]
    pub fn duplicated_labels(&self) -> Vec<&str> {
        let mut seen = HashMap::<&str, usize>::new();
        let mut dups = Vec::new();
        for label in &self.labels {
            let count = seen.entry(label.as_str()).or_insert(0);
            *count += 1;
            if *count == 2 {
                dups.push(label.as_str());
            }
        }
        dups
    }

    /// Resolve a key to a position, checking range for positional keys.
    pub fn resolve(&self, key: AxisKey<'_>) -> Result<usize, IndexError> {
        match key {
            AxisKey::Position(position) => {
                if position < self.labels.len() {
                    Ok(position)
                } else {
                    Err(IndexError::PositionOutOfRange {
                        position,
                        len: self.labels.len(),
                    })
                }
            }
            AxisKey::Name(label) => {
                self.position(label)
                    .ok_or_else(|| IndexError::UnknownLabel {
                        label: label.to_owned(),
                    })
            }
        }
    }

    /// Append a label. A repeated label takes over the map entry.
    pub fn push(&mut self, label: String) {
        self.positions.insert(label.clone(), self.labels.len());
        self.labels.push(label);
    }

    /// Remove the label at `position` and rebuild the whole map, since every
    /// later position shifts down by one.
    pub fn remove(&mut self, position: usize) -> Result<String, IndexError> {
        let position = self.resolve(AxisKey::Position(position))?;
        let label = self.labels.remove(position);
        self.positions = build_positions(&self.labels);
        Ok(label)
    }

    pub fn take(&self, positions: &[usize]) -> Result<Self, IndexError> {
        let mut labels = Vec::with_capacity(positions.len());
        for &position in positions {
            let position = self.resolve(AxisKey::Position(position))?;
            labels.push(self.labels[position].clone());
        }
        Ok(Self::new(labels))
    }

    /// Replace every label at once. The count must not change.
    pub fn relabel(&mut self, labels: Vec<String>) -> Result<(), IndexError> {
        if labels.len() != self.labels.len() {
            return Err(IndexError::LengthMismatch {
                expected: self.labels.len(),
                actual: labels.len(),
            });
        }
        *self = Self::new(labels);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.labels.clear();
        self.positions.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.labels.iter()
    }
}

impl<'a> IntoIterator for &'a Index {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.labels.iter()
    }
}
