#![forbid(unsafe_code)]

use log::warn;
use nalgebra::{DMatrix, DVector, SVD, SymmetricEigen};
use nf_frame::{DataFrame, FrameError};
use nf_stats::{StandardScaler, StatsError, covariances, is_constant};
use nf_types::{ColumnType, ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest tolerated `|a_ij - a_ji|` when a frame is read as a covariance
/// matrix.
pub const SYMMETRY_TOLERANCE: f64 = 1e-8;

/// Prefix of the projected columns produced by [`Pca::transform`].
pub const COMPONENT_PREFIX: &str = "PrincipalComponent";

#[derive(Debug, Error)]
pub enum PcaError {
    #[error(
        "PCA needs at least one row and two columns, got {rows} rows and {cols} columns"
    )]
    TooFewVariables { rows: usize, cols: usize },
    #[error("column {name:?} is constant and cannot be centered and scaled")]
    ConstantColumn { name: String },
    #[error("expected a square matrix, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },
    #[error("matrix is not symmetric at ({row}, {col})")]
    NotSymmetric { row: usize, col: usize },
    #[error("{0} decomposition did not converge")]
    DecompositionFailed(&'static str),
    #[error("PCA has to be fitted before transforming")]
    NotFitted,
    #[error("PCA was fitted on {expected} columns, input has {actual}")]
    ColumnCountMismatch { expected: usize, actual: usize },
    #[error("number of components must be greater than 0")]
    ZeroDimension,
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Stats(#[from] StatsError),
}

impl PcaError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFitted => ErrorKind::IllegalState,
            Self::Frame(err) => err.kind(),
            Self::Stats(err) => err.kind(),
            _ => ErrorKind::InvalidArgument,
        }
    }
}

// --- casting -----------------------------------------------------------------

/// `rows x cols` matrix of the frame's values.
pub fn frame_to_matrix(frame: &DataFrame) -> Result<DMatrix<f64>, PcaError> {
    let columns = frame_to_columns(frame)?;
    Ok(DMatrix::from_fn(frame.n_rows(), frame.n_cols(), |i, j| {
        columns[j][i]
    }))
}

/// One vector per column, in column order.
pub fn frame_to_columns(frame: &DataFrame) -> Result<Vec<Vec<f64>>, PcaError> {
    (0..frame.n_cols())
        .map(|position| -> Result<Vec<f64>, PcaError> {
            Ok(frame.column(position)?.to_f64_vec())
        })
        .collect()
}

/// Frame of `Double` columns holding `matrix`.
///
/// `names` is used only when it has one entry per matrix column; otherwise
/// columns are called `Col0, Col1, …`. An empty matrix gives an empty frame.
pub fn matrix_to_frame(matrix: &DMatrix<f64>, names: &[String]) -> Result<DataFrame, PcaError> {
    if matrix.nrows() == 0 || matrix.ncols() == 0 {
        return Ok(DataFrame::new());
    }

    let names: Vec<String> = if names.len() == matrix.ncols() {
        names.to_vec()
    } else {
        (0..matrix.ncols()).map(|j| format!("Col{j}")).collect()
    };
    let data = names
        .into_iter()
        .zip(matrix.column_iter())
        .map(|(name, column)| (name, column.iter().copied().collect()))
        .collect();
    Ok(DataFrame::from_values(data, None, None)?)
}

/// Read a square frame as a symmetric matrix.
///
/// Fails when the frame is not square or when a mirrored pair differs by
/// more than `tolerance`. The upper triangle is mirrored into the result.
pub fn symmetric_matrix(frame: &DataFrame, tolerance: f64) -> Result<DMatrix<f64>, PcaError> {
    let (rows, cols) = frame.dim();
    if rows != cols {
        return Err(PcaError::NotSquare { rows, cols });
    }

    let values = frame_to_matrix(frame)?;
    for i in 0..cols {
        for j in i + 1..cols {
            if (values[(i, j)] - values[(j, i)]).abs() > tolerance {
                return Err(PcaError::NotSymmetric { row: i, col: j });
            }
        }
    }
    Ok(DMatrix::from_fn(cols, cols, |i, j| {
        if i <= j { values[(i, j)] } else { values[(j, i)] }
    }))
}

// --- decompositions ----------------------------------------------------------

/// Eigenvalues with their eigenvectors stored column by column.
#[derive(Debug, Clone, PartialEq)]
pub struct EigenDecomposition {
    pub eigenvalues: DVector<f64>,
    pub eigenvectors: DMatrix<f64>,
}

/// Eigen-decomposition of a symmetric matrix.
pub fn spectral_decomposition(matrix: &DMatrix<f64>) -> Result<EigenDecomposition, PcaError> {
    if !matrix.is_square() {
        return Err(PcaError::NotSquare {
            rows: matrix.nrows(),
            cols: matrix.ncols(),
        });
    }
    if matrix.is_empty() {
        return Ok(EigenDecomposition {
            eigenvalues: DVector::zeros(0),
            eigenvectors: DMatrix::zeros(0, 0),
        });
    }

    let eigen = SymmetricEigen::try_new(matrix.clone(), f64::EPSILON, 0)
        .ok_or(PcaError::DecompositionFailed("spectral"))?;
    Ok(EigenDecomposition {
        eigenvalues: eigen.eigenvalues,
        eigenvectors: eigen.eigenvectors,
    })
}

/// Principal axes of the observations in `data` (`n x p`) via the thin SVD.
///
/// Eigenvalues are `s² / (n - 1)` for each singular value `s`; eigenvectors
/// are the right singular vectors.
pub fn singular_value_decomposition(
    data: &DMatrix<f64>,
) -> Result<EigenDecomposition, PcaError> {
    if data.is_empty() {
        return Ok(EigenDecomposition {
            eigenvalues: DVector::zeros(0),
            eigenvectors: DMatrix::zeros(data.ncols(), 0),
        });
    }

    let svd = SVD::try_new(data.clone(), false, true, f64::EPSILON, 0)
        .ok_or(PcaError::DecompositionFailed("singular value"))?;
    let v_t = svd.v_t.ok_or(PcaError::DecompositionFailed("singular value"))?;
    let denominator = data.nrows() as f64 - 1.0;
    Ok(EigenDecomposition {
        eigenvalues: svd.singular_values.map(|s| s * s / denominator),
        eigenvectors: v_t.transpose(),
    })
}

// --- PCA ---------------------------------------------------------------------

/// How the principal axes are computed from observations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decomposition {
    /// Eigen-decomposition of the sample covariance matrix.
    #[default]
    Spectral,
    /// Singular value decomposition of the data matrix.
    Svd,
}

/// What the frame passed to [`Pca::fit`] contains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PcaInput {
    /// One row per observation, one column per variable.
    #[default]
    Observations,
    /// A precomputed symmetric covariance matrix. Always decomposed
    /// spectrally.
    Covariance,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PcaOptions {
    /// Standardize every column before fitting and before projecting.
    /// Ignored for [`PcaInput::Covariance`].
    pub center_and_scale: bool,
    pub method: Decomposition,
    pub input: PcaInput,
}

impl PcaOptions {
    #[must_use]
    pub fn with_center_and_scale(mut self, center_and_scale: bool) -> Self {
        self.center_and_scale = center_and_scale;
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: Decomposition) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn with_input(mut self, input: PcaInput) -> Self {
        self.input = input;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EigenPair {
    pub eigenvalue: f64,
    pub eigenvector: Vec<f64>,
}

/// Flip `vector` so its largest-magnitude component is positive, making the
/// result independent of the solver's sign choice.
fn canonical_sign(mut vector: Vec<f64>) -> Vec<f64> {
    let pivot = vector
        .iter()
        .copied()
        .fold(0.0_f64, |best, v| if v.abs() > best.abs() { v } else { best });
    if pivot < 0.0 {
        for v in &mut vector {
            *v = -*v;
        }
    }
    vector
}

fn sorted_pairs(decomposition: &EigenDecomposition) -> Vec<EigenPair> {
    let mut pairs: Vec<EigenPair> = decomposition
        .eigenvalues
        .iter()
        .zip(decomposition.eigenvectors.column_iter())
        .map(|(&eigenvalue, vector)| EigenPair {
            eigenvalue,
            eigenvector: canonical_sign(vector.iter().copied().collect()),
        })
        .collect();
    pairs.sort_by(|a, b| b.eigenvalue.total_cmp(&a.eigenvalue));
    pairs
}

/// Principal component analysis over the columns of a frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pca {
    options: PcaOptions,
    eigen_pairs: Vec<EigenPair>,
    scaler: StandardScaler,
    fitted_columns: Option<usize>,
}

impl Pca {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the principal axes of `frame`, replacing any previous fit.
    pub fn fit(&mut self, frame: &DataFrame, options: &PcaOptions) -> Result<(), PcaError> {
        let (rows, cols) = frame.dim();
        if rows == 0 || cols < 2 {
            return Err(PcaError::TooFewVariables { rows, cols });
        }
        if options.input == PcaInput::Observations {
            check_constant_columns(frame, options.center_and_scale)?;
        }

        let mut scaler = StandardScaler::new();
        let scaled;
        let data = if scales(options) {
            scaled = scaler.fit_transform(frame)?;
            &scaled
        } else {
            frame
        };

        let decomposition = match (options.input, options.method) {
            (PcaInput::Covariance, _) => {
                spectral_decomposition(&symmetric_matrix(frame, SYMMETRY_TOLERANCE)?)?
            }
            (PcaInput::Observations, Decomposition::Svd) => {
                singular_value_decomposition(&frame_to_matrix(data)?)?
            }
            (PcaInput::Observations, Decomposition::Spectral) => {
                spectral_decomposition(&frame_to_matrix(&covariances(data)?)?)?
            }
        };

        self.options = *options;
        self.eigen_pairs = sorted_pairs(&decomposition);
        self.scaler = scaler;
        self.fitted_columns = Some(cols);
        Ok(())
    }

    /// Project `frame` onto the first `dim` principal axes.
    ///
    /// `dim` is capped at the number of available components. The result
    /// keeps the input's row names and names its columns
    /// `PrincipalComponent0, …`.
    pub fn transform(&self, frame: &DataFrame, dim: usize) -> Result<DataFrame, PcaError> {
        let Some(expected) = self.fitted_columns else {
            return Err(PcaError::NotFitted);
        };
        if frame.n_cols() != expected {
            return Err(PcaError::ColumnCountMismatch {
                expected,
                actual: frame.n_cols(),
            });
        }
        if dim == 0 {
            return Err(PcaError::ZeroDimension);
        }
        if frame.is_empty() {
            warn!("projecting an empty frame; returning an empty frame");
            return Ok(DataFrame::new());
        }

        let available = self.eigen_pairs.len();
        let dim = if dim > available {
            warn!("only {available} principal components available, {dim} requested");
            available
        } else {
            dim
        };

        let scaled;
        let data = if scales(&self.options) {
            scaled = self.scaler.transform(frame)?;
            &scaled
        } else {
            frame
        };

        let projection = DMatrix::from_fn(expected, dim, |i, j| self.eigen_pairs[j].eigenvector[i]);
        let reduced = frame_to_matrix(data)? * projection;
        let names: Vec<String> = (0..dim).map(|i| format!("{COMPONENT_PREFIX}{i}")).collect();

        let mut out = matrix_to_frame(&reduced, &names)?;
        out.set_row_names(frame.row_names().to_vec())?;
        Ok(out)
    }

    pub fn fit_transform(
        &mut self,
        frame: &DataFrame,
        options: &PcaOptions,
        dim: usize,
    ) -> Result<DataFrame, PcaError> {
        self.fit(frame, options)?;
        self.transform(frame, dim)
    }

    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.fitted_columns.is_some()
    }

    #[must_use]
    pub fn options(&self) -> &PcaOptions {
        &self.options
    }

    /// Eigenpairs sorted by eigenvalue, largest first.
    #[must_use]
    pub fn eigen_pairs(&self) -> &[EigenPair] {
        &self.eigen_pairs
    }

    #[must_use]
    pub fn eigenvalues(&self) -> Vec<f64> {
        self.eigen_pairs.iter().map(|pair| pair.eigenvalue).collect()
    }

    /// Unit eigenvectors, one per component.
    #[must_use]
    pub fn eigenvectors(&self) -> Vec<Vec<f64>> {
        self.eigen_pairs
            .iter()
            .map(|pair| pair.eigenvector.clone())
            .collect()
    }

    /// One column per eigenvector, named `EV=<eigenvalue>` with six decimals.
    pub fn eigen_information(&self) -> Result<DataFrame, PcaError> {
        if !self.is_fitted() {
            return Err(PcaError::NotFitted);
        }
        let mut info = DataFrame::new();
        for pair in &self.eigen_pairs {
            info.add_column(
                format!("EV={:.6}", pair.eigenvalue),
                &pair.eigenvector,
                ColumnType::Double,
            )?;
        }
        Ok(info)
    }
}

/// Covariance input is never rescaled.
fn scales(options: &PcaOptions) -> bool {
    options.center_and_scale && options.input == PcaInput::Observations
}

fn check_constant_columns(frame: &DataFrame, center_and_scale: bool) -> Result<(), PcaError> {
    for (position, name) in frame.col_names().iter().enumerate() {
        if !is_constant(frame.column(position)?) {
            continue;
        }
        if center_and_scale {
            return Err(PcaError::ConstantColumn { name: name.clone() });
        }
        warn!("column {name:?} is constant and does not contribute to the principal components");
        break;
    }
    Ok(())
}
