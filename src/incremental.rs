// Incremental principal component analysis over a stream of vectors

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use log::{debug, error, info, trace, warn};
use serde::{Deserialize, Serialize};

use crate::error::{IpcaError, Result};
use crate::linalg_backends::{BackendEig, BackendEigh, EigenOutput, LinAlgBackendProvider};

#[cfg(feature = "enable-ipca-diagnostics")]
use crate::diagnostics::{DiagnosticsStage, UpdateDiagnostics};

/// Which eigendecomposition routine refreshes the basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EigenSolverKind {
    /// Symmetric solver reading the upper triangle. Eigenvalues are real.
    #[default]
    Symmetric,
    /// General solver. Eigenpairs may come back complex; only real parts are kept.
    General,
}

/// Construction-time parameters for [`IncrementalPCA`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementalPcaConfig {
    /// Dimensionality `d` of every input vector.
    pub input_dim: usize,
    /// Number `q` of principal components kept, `1 <= q <= d`.
    pub output_dim: usize,
    /// Eigendecomposition routine used on every refresh.
    #[serde(default)]
    pub solver: EigenSolverKind,
}

impl Default for IncrementalPcaConfig {
    fn default() -> Self {
        IncrementalPcaConfig {
            input_dim: 2,
            output_dim: 2,
            solver: EigenSolverKind::Symmetric,
        }
    }
}

impl IncrementalPcaConfig {
    /// Checks `1 <= output_dim <= input_dim`.
    pub fn validate(&self) -> Result<()> {
        if self.input_dim == 0 {
            return Err(IpcaError::InvalidConfiguration(
                "input dimensionality must be at least 1".to_string(),
            ));
        }
        if self.output_dim == 0 || self.output_dim > self.input_dim {
            return Err(IpcaError::InvalidConfiguration(format!(
                "output dimensionality must be in 1..={}, got {}",
                self.input_dim, self.output_dim
            )));
        }
        Ok(())
    }
}

/// Running statistics committed as a unit after each successful call.
#[derive(Debug, Clone)]
struct PcaState {
    mean: Array1<f64>,
    covariance: Array2<f64>,
    eigenvectors: Array2<f64>,
    eigenvalues: Array1<f64>,
    n: usize,
}

impl PcaState {
    fn empty(d: usize, q: usize) -> Self {
        PcaState {
            mean: Array1::zeros(d),
            covariance: Array2::zeros((d, d)),
            eigenvectors: Array2::zeros((d, q)),
            eigenvalues: Array1::zeros(q),
            n: 0,
        }
    }
}

/// Top-q eigenpairs of a covariance matrix, sorted by descending eigenvalue.
#[derive(Debug)]
struct Eigenbasis {
    eigenvectors: Array2<f64>,
    eigenvalues: Array1<f64>,
    /// Every eigenvalue, sorted descending. Only the first q are kept in the basis.
    #[cfg_attr(not(feature = "enable-ipca-diagnostics"), allow(dead_code))]
    spectrum: Vec<f64>,
}

/// Streaming PCA that keeps a running mean, a running covariance and the
/// leading `q` eigenvectors of that covariance.
///
/// The model is bootstrapped with [`IncrementalPCA::initialize`] on a batch of at least two
/// vectors and then refined one vector at a time with [`IncrementalPCA::update`]. No history
/// of observed points is kept.
///
/// Every call re-runs a full `d x d` eigendecomposition, so each update costs O(d^3). This is
/// fine for small and moderate `d`; for large `d` the refresh step would need replacing with an
/// incremental eigenbasis tracker.
///
/// Each call computes its new mean, covariance and basis into locals and commits them together
/// only once everything has succeeded, so a failed call leaves the previous state untouched.
///
/// # Examples
///
/// ```
/// use incremental_pca::IncrementalPCA;
/// use ndarray::array;
///
/// let mut ipca = IncrementalPCA::new(2, 1).unwrap();
/// let scores = ipca.initialize(array![[1.0, 2.0], [3.0, 4.0], [5.0, 7.0]].view()).unwrap();
/// assert_eq!(scores.dim(), (3, 1));
///
/// let score = ipca.update(array![2.0, 3.0].view()).unwrap();
/// assert_eq!(score.len(), 1);
/// assert_eq!(ipca.n_samples(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct IncrementalPCA {
    config: IncrementalPcaConfig,
    state: PcaState,
    backend: LinAlgBackendProvider<f64>,
    #[cfg(feature = "enable-ipca-diagnostics")]
    diagnostics: Vec<UpdateDiagnostics>,
}

impl IncrementalPCA {
    /// Creates an uninitialised model for `d`-dimensional input keeping `q` components.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` unless `1 <= q <= d`.
    pub fn new(d: usize, q: usize) -> Result<Self> {
        Self::with_config(IncrementalPcaConfig {
            input_dim: d,
            output_dim: q,
            ..IncrementalPcaConfig::default()
        })
    }

    /// Creates an uninitialised model from a full configuration.
    pub fn with_config(config: IncrementalPcaConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: PcaState::empty(config.input_dim, config.output_dim),
            config,
            backend: LinAlgBackendProvider::new(),
            #[cfg(feature = "enable-ipca-diagnostics")]
            diagnostics: Vec::new(),
        })
    }

    pub fn config(&self) -> &IncrementalPcaConfig {
        &self.config
    }

    /// Input dimensionality `d`.
    pub fn input_dim(&self) -> usize {
        self.config.input_dim
    }

    /// Output dimensionality `q`.
    pub fn output_dim(&self) -> usize {
        self.config.output_dim
    }

    /// Number of samples absorbed so far. Zero until `initialize` succeeds.
    pub fn n_samples(&self) -> usize {
        self.state.n
    }

    pub fn is_initialized(&self) -> bool {
        self.state.n > 0
    }

    /// Running mean, shape (d). All zeros before initialisation.
    pub fn mean(&self) -> &Array1<f64> {
        &self.state.mean
    }

    /// Running covariance estimate, shape (d, d).
    pub fn covariance(&self) -> &Array2<f64> {
        &self.state.covariance
    }

    /// Current basis, shape (d, q). Column `i` is the eigenvector with the `i`-th largest
    /// eigenvalue. Signs are whatever the eigensolver returned; treat `v` and `-v` as equal.
    pub fn eigenvectors(&self) -> &Array2<f64> {
        &self.state.eigenvectors
    }

    /// Eigenvalues matching the columns of [`Self::eigenvectors`], non-increasing.
    pub fn eigenvalues(&self) -> &Array1<f64> {
        &self.state.eigenvalues
    }

    /// Fraction of the total variance (trace of the covariance) carried by each kept component.
    ///
    /// Returns zeros when the trace is not positive, e.g. before initialisation.
    pub fn explained_variance_ratio(&self) -> Array1<f64> {
        let total_variance = self.state.covariance.diag().sum();
        if total_variance <= 0.0 {
            return Array1::zeros(self.config.output_dim);
        }
        self.state.eigenvalues.mapv(|value| value / total_variance)
    }

    /// Bootstraps the model from a batch of at least two samples and returns the batch
    /// projected onto the new basis.
    ///
    /// Any previous state is discarded. The covariance is the Bessel-corrected sample covariance
    /// `Xc^T Xc / (n - 1)` of the mean-centred batch.
    ///
    /// * `batch` - Input data, shape (n_samples, d).
    ///
    /// # Returns
    /// Projected scores, shape (n_samples, q).
    ///
    /// # Errors
    /// `DimensionMismatch` if the batch does not have `d` columns, `InsufficientSamples` if it
    /// has fewer than two rows, `DecompositionFailure` if the eigensolver fails.
    pub fn initialize(&mut self, batch: ArrayView2<f64>) -> Result<Array2<f64>> {
        let (n_rows, n_cols) = batch.dim();
        let d = self.config.input_dim;

        if n_cols != d {
            return Err(IpcaError::DimensionMismatch { expected: d, got: n_cols });
        }
        if n_rows < 2 {
            return Err(IpcaError::InsufficientSamples { got: n_rows });
        }

        let mean = batch
            .mean_axis(Axis(0))
            .ok_or(IpcaError::InsufficientSamples { got: n_rows })?;
        let centered = &batch - &mean;

        let mut covariance = centered.t().dot(&centered);
        covariance /= (n_rows - 1) as f64;

        let basis = self.refresh_eigenbasis(&covariance)?;
        let projected = centered.dot(&basis.eigenvectors);
        check_shape("projected batch", (n_rows, self.config.output_dim), projected.dim())?;

        info!(
            "Initialised incremental PCA from {} samples (d = {}, q = {}); leading eigenvalue {:.6e}",
            n_rows,
            d,
            self.config.output_dim,
            basis.eigenvalues[0]
        );

        #[cfg(feature = "enable-ipca-diagnostics")]
        self.record_diagnostics(DiagnosticsStage::Initialize, n_rows, &covariance, &basis);

        self.commit(mean, covariance, basis, n_rows);
        Ok(projected)
    }

    /// Convenience over [`Self::initialize`] for row-slices, e.g. `&[Vec<f64>]`.
    ///
    /// Rows of differing length are reported as `DimensionMismatch` for the first offending row.
    pub fn initialize_rows<R: AsRef<[f64]>>(&mut self, rows: &[R]) -> Result<Array2<f64>> {
        let d = self.config.input_dim;
        if let Some(bad) = rows.iter().map(|row| row.as_ref().len()).find(|&len| len != d) {
            return Err(IpcaError::DimensionMismatch { expected: d, got: bad });
        }
        let batch = Array2::from_shape_fn((rows.len(), d), |(i, j)| rows[i].as_ref()[j]);
        self.initialize(batch.view())
    }

    /// Absorbs one sample, refreshes the basis and returns the sample's projection.
    ///
    /// The counter is incremented first and the new count `n` is used in both recurrences:
    ///
    /// * `mean <- mean + (x - mean) / n`
    /// * `xc = x - mean` (against the updated mean)
    /// * `cov <- cov * (n - 1) / n + xc^T xc / n^2`
    ///
    /// The covariance recurrence is an approximate streaming estimator rather than the exact
    /// batch update; results agree with a batch fit statistically, not bit for bit.
    ///
    /// # Errors
    /// `NotInitialized` before `initialize`, `DimensionMismatch` if `x.len() != d`,
    /// `DecompositionFailure` if the eigensolver fails. State is unchanged on error.
    pub fn update(&mut self, x: ArrayView1<f64>) -> Result<Array1<f64>> {
        if !self.is_initialized() {
            return Err(IpcaError::NotInitialized);
        }
        let d = self.config.input_dim;
        if x.len() != d {
            return Err(IpcaError::DimensionMismatch { expected: d, got: x.len() });
        }

        let n = self.state.n + 1;
        let n_f = n as f64;

        let mean = &self.state.mean + &((&x - &self.state.mean) / n_f);
        let centered = &x - &mean;

        let column = centered.view().insert_axis(Axis(1));
        let outer = column.dot(&column.t());
        let covariance = &self.state.covariance * ((n_f - 1.0) / n_f) + &(outer / (n_f * n_f));

        let basis = self.refresh_eigenbasis(&covariance)?;
        let projected = centered.dot(&basis.eigenvectors);
        check_shape("projected sample", (1, self.config.output_dim), (1, projected.len()))?;

        debug!(
            "Absorbed sample {} into incremental PCA; leading eigenvalue {:.6e}",
            n, basis.eigenvalues[0]
        );

        #[cfg(feature = "enable-ipca-diagnostics")]
        self.record_diagnostics(DiagnosticsStage::Update, n, &covariance, &basis);

        self.commit(mean, covariance, basis, n);
        Ok(projected)
    }

    /// Convenience over [`Self::update`] for a plain slice.
    pub fn update_slice(&mut self, x: &[f64]) -> Result<Array1<f64>> {
        self.update(ArrayView1::from(x))
    }

    /// Projects `batch` onto the current basis using the current mean, without absorbing it.
    ///
    /// * `batch` - Input data, shape (m_samples, d). Zero rows yields an empty (0, q) result.
    ///
    /// # Errors
    /// `NotInitialized` before `initialize`, `DimensionMismatch` if the batch lacks `d` columns.
    pub fn transform(&self, batch: ArrayView2<f64>) -> Result<Array2<f64>> {
        if !self.is_initialized() {
            return Err(IpcaError::NotInitialized);
        }
        let d = self.config.input_dim;
        if batch.ncols() != d {
            return Err(IpcaError::DimensionMismatch { expected: d, got: batch.ncols() });
        }
        let centered = &batch - &self.state.mean;
        Ok(centered.dot(&self.state.eigenvectors))
    }

    /// Diagnostics recorded by every successful `initialize`/`update`, oldest first.
    #[cfg(feature = "enable-ipca-diagnostics")]
    pub fn diagnostics(&self) -> &[UpdateDiagnostics] {
        &self.diagnostics
    }

    /// Drains the recorded diagnostics.
    #[cfg(feature = "enable-ipca-diagnostics")]
    pub fn take_diagnostics(&mut self) -> Vec<UpdateDiagnostics> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Decomposes `covariance` and keeps the top-q eigenpairs in descending eigenvalue order.
    fn refresh_eigenbasis(&self, covariance: &Array2<f64>) -> Result<Eigenbasis> {
        let d = self.config.input_dim;
        let q = self.config.output_dim;
        check_shape("covariance matrix", (d, d), covariance.dim())?;
        // Finite samples can still overflow the outer product.
        if covariance.iter().any(|value| !value.is_finite()) {
            return Err(IpcaError::DecompositionFailure(
                "covariance matrix contains non-finite values".to_string(),
            ));
        }

        let EigenOutput { eigenvalues, eigenvectors } = match self.config.solver {
            EigenSolverKind::Symmetric => self.backend.eigh_upper(covariance),
            EigenSolverKind::General => self.backend.eig_real(covariance),
        }
        .map_err(|e| IpcaError::DecompositionFailure(e.to_string()))?;

        if eigenvalues.len() != d || eigenvectors.dim() != (d, d) {
            return Err(IpcaError::DecompositionFailure(format!(
                "expected {} eigenpairs of length {}, got {} eigenvalues and a {:?} eigenvector matrix",
                d,
                d,
                eigenvalues.len(),
                eigenvectors.dim()
            )));
        }
        if eigenvalues.iter().chain(eigenvectors.iter()).any(|value| !value.is_finite()) {
            return Err(IpcaError::DecompositionFailure(
                "eigensolver returned non-finite values".to_string(),
            ));
        }

        // sort_by is stable: tied eigenvalues keep the backend's index order.
        let mut order: Vec<usize> = (0..d).collect();
        order.sort_by(|&a, &b| {
            eigenvalues[b]
                .partial_cmp(&eigenvalues[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let spectrum: Vec<f64> = order.iter().map(|&i| eigenvalues[i]).collect();
        trace!("Sorted covariance spectrum: {:?}", spectrum);

        let kept = &order[..q];
        let basis_vectors = eigenvectors.select(Axis(1), kept);
        let basis_values = eigenvalues.select(Axis(0), kept);
        check_shape("eigenvector basis", (d, q), basis_vectors.dim())?;

        if spectrum[0] <= 0.0 {
            warn!(
                "Leading covariance eigenvalue is {:.3e}; the data are degenerate and the basis is arbitrary.",
                spectrum[0]
            );
        }

        Ok(Eigenbasis {
            eigenvectors: basis_vectors,
            eigenvalues: basis_values,
            spectrum,
        })
    }

    #[cfg(feature = "enable-ipca-diagnostics")]
    fn record_diagnostics(
        &mut self,
        stage: DiagnosticsStage,
        n: usize,
        covariance: &Array2<f64>,
        basis: &Eigenbasis,
    ) {
        self.diagnostics.push(UpdateDiagnostics::capture(
            stage,
            n,
            &basis.spectrum,
            &covariance.view(),
            &basis.eigenvectors.view(),
        ));
    }

    fn commit(&mut self, mean: Array1<f64>, covariance: Array2<f64>, basis: Eigenbasis, n: usize) {
        self.state = PcaState {
            mean,
            covariance,
            eigenvectors: basis.eigenvectors,
            eigenvalues: basis.eigenvalues,
            n,
        };
    }
}

fn shape_violation(what: &'static str, expected: (usize, usize), got: (usize, usize)) -> IpcaError {
    error!(
        "Internal shape invariant violated for {}: expected {:?}, got {:?}",
        what, expected, got
    );
    IpcaError::ShapeInvariantViolation { what, expected, got }
}

fn check_shape(what: &'static str, expected: (usize, usize), got: (usize, usize)) -> Result<()> {
    if expected != got {
        return Err(shape_violation(what, expected, got));
    }
    Ok(())
}
