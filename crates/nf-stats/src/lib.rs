#![forbid(unsafe_code)]

use log::warn;
use nf_columnar::Column;
use nf_frame::{DataFrame, FrameError};
use nf_types::ErrorKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("cannot compute {what} on an empty frame ({rows} rows, {cols} columns)")]
    EmptyFrame {
        what: &'static str,
        rows: usize,
        cols: usize,
    },
    #[error("scaler has to be fitted before transforming")]
    NotFitted,
    #[error("scaler was fitted on {expected} columns, input has {actual}")]
    ColumnCountMismatch { expected: usize, actual: usize },
    #[error(transparent)]
    Frame(#[from] FrameError),
}

impl StatsError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyFrame { .. } | Self::ColumnCountMismatch { .. } => {
                ErrorKind::InvalidArgument
            }
            Self::NotFitted => ErrorKind::IllegalState,
            Self::Frame(err) => err.kind(),
        }
    }
}

fn ensure_non_empty(frame: &DataFrame, what: &'static str) -> Result<(), StatsError> {
    if frame.is_empty() {
        return Err(StatsError::EmptyFrame {
            what,
            rows: frame.n_rows(),
            cols: frame.n_cols(),
        });
    }
    Ok(())
}

/// Every column widened to `f64`, in column order.
fn column_values(frame: &DataFrame) -> Result<Vec<Vec<f64>>, StatsError> {
    (0..frame.n_cols())
        .map(|position| -> Result<Vec<f64>, StatsError> {
            Ok(frame.column(position)?.to_f64_vec())
        })
        .collect()
}

fn mean_of(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample covariance (denominator `n - 1`). A single observation yields NaN.
fn covariance_of(a: &[f64], mean_a: f64, b: &[f64], mean_b: f64) -> f64 {
    let sum: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x - mean_a) * (y - mean_b))
        .sum();
    sum / (a.len() as f64 - 1.0)
}

/// Arithmetic mean of each column.
pub fn means(frame: &DataFrame) -> Result<Vec<f64>, StatsError> {
    ensure_non_empty(frame, "means")?;
    Ok(column_values(frame)?.iter().map(|v| mean_of(v)).collect())
}

/// Sample variance of each column.
pub fn variances(frame: &DataFrame) -> Result<Vec<f64>, StatsError> {
    ensure_non_empty(frame, "variances")?;
    Ok(column_values(frame)?
        .iter()
        .map(|v| {
            let mean = mean_of(v);
            covariance_of(v, mean, v, mean)
        })
        .collect())
}

pub fn standard_deviations(frame: &DataFrame) -> Result<Vec<f64>, StatsError> {
    Ok(variances(frame)?.into_iter().map(f64::sqrt).collect())
}

/// Sample covariance matrix as a square frame. Both the columns and the rows
/// are named after the input columns.
pub fn covariances(frame: &DataFrame) -> Result<DataFrame, StatsError> {
    ensure_non_empty(frame, "covariances")?;
    let columns = column_values(frame)?;
    let column_means: Vec<f64> = columns.iter().map(|v| mean_of(v)).collect();

    let k = columns.len();
    let mut matrix = vec![vec![0.0; k]; k];
    for i in 0..k {
        for j in 0..=i {
            let cov = covariance_of(&columns[i], column_means[i], &columns[j], column_means[j]);
            matrix[i][j] = cov;
            matrix[j][i] = cov;
        }
    }

    let names = frame.col_names().to_vec();
    let data = names.iter().cloned().zip(matrix).collect();
    Ok(DataFrame::from_values(data, Some(names), None)?)
}

/// True when every value equals its predecessor. Empty and single-value
/// columns are constant.
#[must_use]
pub fn is_constant(column: &Column) -> bool {
    let values = column.to_f64_vec();
    values.windows(2).all(|pair| pair[0] == pair[1])
}

/// Centers each column on its mean and divides by its standard deviation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    standard_deviations: Vec<f64>,
    fitted: bool,
}

impl StandardScaler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn per-column means and standard deviations. A failed fit leaves
    /// the previous one in place.
    pub fn fit(&mut self, frame: &DataFrame) -> Result<(), StatsError> {
        let means = means(frame)?;
        let standard_deviations = standard_deviations(frame)?;
        self.means = means;
        self.standard_deviations = standard_deviations;
        self.fitted = true;
        Ok(())
    }

    /// Scale `frame` with the fitted parameters.
    ///
    /// Output columns are `Double` and keep the input's column and row names.
    /// A column whose fitted deviation is zero is copied unchanged.
    pub fn transform(&self, frame: &DataFrame) -> Result<DataFrame, StatsError> {
        if !self.fitted {
            return Err(StatsError::NotFitted);
        }
        if frame.n_cols() != self.means.len() {
            return Err(StatsError::ColumnCountMismatch {
                expected: self.means.len(),
                actual: frame.n_cols(),
            });
        }
        if frame.is_empty() {
            warn!("transforming an empty frame; returning an empty frame");
            return Ok(DataFrame::new());
        }

        let columns = column_values(frame)?;
        let mut data = Vec::with_capacity(columns.len());
        for (position, values) in columns.into_iter().enumerate() {
            let name = frame.col_names()[position].clone();
            let mean = self.means[position];
            let sd = self.standard_deviations[position];
            let scaled = if sd == 0.0 {
                warn!("cannot scale column {name:?}: its standard deviation is 0");
                values
            } else {
                values.into_iter().map(|x| (x - mean) / sd).collect()
            };
            data.push((name, scaled));
        }

        Ok(DataFrame::from_values(
            data,
            Some(frame.row_names().to_vec()),
            None,
        )?)
    }

    pub fn fit_transform(&mut self, frame: &DataFrame) -> Result<DataFrame, StatsError> {
        self.fit(frame)?;
        self.transform(frame)
    }

    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    #[must_use]
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    #[must_use]
    pub fn standard_deviations(&self) -> &[f64] {
        &self.standard_deviations
    }
}
