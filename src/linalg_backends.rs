// src/linalg_backends.rs

#[derive(Debug, Default, Copy, Clone)]
pub struct LinAlgBackendProvider<F: 'static + Copy + Send + Sync> {
    _phantom: PhantomData<F>,
}

impl<F: 'static + Copy + Send + Sync> LinAlgBackendProvider<F> {
    pub fn new() -> Self {
        Self { _phantom: PhantomData }
    }
}

use ndarray::{Array1, Array2};
use std::error::Error;
use std::marker::PhantomData;

/// Boxed error crossing the backend boundary.
pub type BackendError = Box<dyn Error + Send + Sync>;

/// Output of an eigendecomposition, reduced to real values.
#[derive(Debug)]
pub struct EigenOutput<F: 'static> {
    /// Eigenvalues in whatever order the backend produced them.
    pub eigenvalues: Array1<F>,
    /// Eigenvectors as columns of the matrix.
    /// eigenvectors.column(i) corresponds to eigenvalues[i].
    pub eigenvectors: Array2<F>,
}

/// Trait for symmetric eigendecomposition (similar to LAPACK's DSYEVD).
/// Implementers read only the upper triangle of `matrix`.
pub trait BackendEigh<F: 'static + Copy + Send + Sync> {
    fn eigh_upper(&self, matrix: &Array2<F>) -> Result<EigenOutput<F>, BackendError>;
}

/// Trait for general (non-symmetric) eigendecomposition (similar to LAPACK's DGEEV).
///
/// The backend may compute complex eigenpairs; only their real parts are returned.
pub trait BackendEig<F: 'static + Copy + Send + Sync> {
    fn eig_real(&self, matrix: &Array2<F>) -> Result<EigenOutput<F>, BackendError>;
}

use ndarray_linalg::{Eig as NdLinalgEig, Eigh as NdLinalgEigh, UPLO};

#[derive(Debug, Default, Copy, Clone)]
pub struct NdarrayLinAlgBackend;

// Helper to convert ndarray-linalg's error to BackendError
fn to_dyn_error<E: Error + Send + Sync + 'static>(e: E) -> BackendError {
    Box::new(e)
}

fn require_square<F>(matrix: &Array2<F>) -> Result<(), BackendError> {
    if matrix.nrows() != matrix.ncols() {
        return Err(format!(
            "Matrix must be square for eigendecomposition, got {}x{}.",
            matrix.nrows(),
            matrix.ncols()
        )
        .into());
    }
    Ok(())
}

impl BackendEigh<f64> for NdarrayLinAlgBackend {
    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EigenOutput<f64>, BackendError> {
        require_square(matrix)?;
        let (eigenvalues, eigenvectors) = matrix.eigh(UPLO::Upper).map_err(to_dyn_error)?;
        Ok(EigenOutput { eigenvalues, eigenvectors })
    }
}

impl BackendEig<f64> for NdarrayLinAlgBackend {
    fn eig_real(&self, matrix: &Array2<f64>) -> Result<EigenOutput<f64>, BackendError> {
        require_square(matrix)?;
        let (complex_values, complex_vectors) = matrix.eig().map_err(to_dyn_error)?;
        Ok(EigenOutput {
            eigenvalues: complex_values.mapv(|value| value.re),
            eigenvectors: complex_vectors.mapv(|value| value.re),
        })
    }
}

#[cfg(feature = "backend_faer")]
mod faer_specific_code {
    use super::{require_square, BackendEigh, BackendError, EigenOutput};
    use faer::MatRef;
    use ndarray::{Array1, Array2, ShapeBuilder};

    #[derive(Debug, Default, Copy, Clone)]
    pub struct FaerLinAlgBackend;

    fn faer_mat_to_ndarray(faer_mat: MatRef<'_, f64>) -> Array2<f64> {
        let nrows = faer_mat.nrows();
        let ncols = faer_mat.ncols();
        Array2::from_shape_fn((nrows, ncols).f(), |(i, j)| unsafe { *faer_mat.get_unchecked(i, j) })
    }

    fn faer_col_to_ndarray_vec(faer_col: faer::ColRef<'_, f64>) -> Array1<f64> {
        let nrows = faer_col.nrows();
        let mut data_vec = Vec::with_capacity(nrows);
        for i in 0..nrows {
            data_vec.push(unsafe { *faer_col.get_unchecked(i) });
        }
        Array1::from_vec(data_vec)
    }

    impl BackendEigh<f64> for FaerLinAlgBackend {
        fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EigenOutput<f64>, BackendError> {
            require_square(matrix)?;
            if matrix.is_empty() {
                return Ok(EigenOutput { eigenvalues: Array1::zeros(0), eigenvectors: Array2::zeros((0, 0)) });
            }
            let n = matrix.nrows();
            // Covariance matrices built by the engine are owned and contiguous; copy anything else.
            let contiguous = matrix.as_standard_layout();
            let slice = contiguous
                .as_slice()
                .ok_or_else(|| format!("Failed to get slice from row-major ndarray matrix ({}x{})", n, n))?;
            let faer_mat_view = faer::mat::from_row_major_slice(slice, n, n);
            let eig = faer_mat_view.as_ref().selfadjoint_eigendecomposition(faer::Side::Upper);
            Ok(EigenOutput {
                eigenvalues: faer_col_to_ndarray_vec(eig.s().column_vector()),
                eigenvectors: faer_mat_to_ndarray(eig.u().as_ref()),
            })
        }
    }
}

/// A provider struct that dispatches to the selected linear algebra backend
/// based on compile-time feature flags.
///
/// The symmetric path honours `backend_faer`; the general path always goes
/// through ndarray-linalg.
impl BackendEigh<f64> for LinAlgBackendProvider<f64> {
    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EigenOutput<f64>, BackendError> {
        #[cfg(feature = "backend_faer")]
        {
            faer_specific_code::FaerLinAlgBackend.eigh_upper(matrix)
        }
        #[cfg(not(feature = "backend_faer"))]
        {
            NdarrayLinAlgBackend.eigh_upper(matrix)
        }
    }
}

impl BackendEig<f64> for LinAlgBackendProvider<f64> {
    fn eig_real(&self, matrix: &Array2<f64>) -> Result<EigenOutput<f64>, BackendError> {
        NdarrayLinAlgBackend.eig_real(matrix)
    }
}
