// src/diagnostics.rs
#![cfg(feature = "enable-ipca-diagnostics")]

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Which entry point produced a diagnostics record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DiagnosticsStage {
    #[default]
    Initialize,
    Update,
}

/// Numerical health of the running state after one `initialize` or `update` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDiagnostics {
    pub stage: DiagnosticsStage,
    pub n_samples: usize,

    // --- Covariance metrics ---
    pub covariance_dims: (usize, usize),
    pub covariance_fro_norm: f64,
    pub covariance_symmetry_error: f64, // ||C - C^T||_F
    pub covariance_condition_number: Option<f64>, // |lambda_max| / |lambda_min|

    /// Full eigenvalue spectrum, sorted descending.
    pub sorted_eigenvalues: Vec<f64>,

    // --- Basis metrics ---
    pub basis_dims: (usize, usize),
    pub basis_orthogonality_error: Option<f64>, // ||I - V^T V||_F
}

impl UpdateDiagnostics {
    pub fn capture(
        stage: DiagnosticsStage,
        n_samples: usize,
        sorted_eigenvalues: &[f64],
        covariance: &ArrayView2<f64>,
        basis: &ArrayView2<f64>,
    ) -> Self {
        UpdateDiagnostics {
            stage,
            n_samples,
            covariance_dims: covariance.dim(),
            covariance_fro_norm: compute_frob_norm_f64(covariance),
            covariance_symmetry_error: compute_symmetry_error_f64(covariance),
            covariance_condition_number: condition_number_from_spectrum(sorted_eigenvalues),
            sorted_eigenvalues: sorted_eigenvalues.to_vec(),
            basis_dims: basis.dim(),
            basis_orthogonality_error: compute_orthogonality_error_f64(basis),
        }
    }
}

/// Computes Frobenius norm for an f64 matrix.
pub fn compute_frob_norm_f64(matrix: &ArrayView2<f64>) -> f64 {
    if matrix.is_empty() {
        return 0.0;
    }
    matrix.iter().map(|&x| x * x).sum::<f64>().sqrt()
}

/// Computes ||A - A^T||_F. Non-square input has no meaningful symmetry; returns infinity.
pub fn compute_symmetry_error_f64(matrix: &ArrayView2<f64>) -> f64 {
    if matrix.nrows() != matrix.ncols() {
        return f64::INFINITY;
    }
    let diff = matrix - &matrix.t();
    compute_frob_norm_f64(&diff.view())
}

/// Computes orthogonality error ||I - Q^T Q||_F for an f64 matrix.
pub fn compute_orthogonality_error_f64(q_matrix: &ArrayView2<f64>) -> Option<f64> {
    if q_matrix.nrows() == 0 || q_matrix.ncols() == 0 {
        return None;
    }
    let qtq = q_matrix.t().dot(q_matrix);
    let identity = Array2::<f64>::eye(qtq.nrows());
    let diff = &identity - &qtq;
    Some(compute_frob_norm_f64(&diff.view()))
}

/// Ratio of the largest to the smallest eigenvalue magnitude.
/// `None` for an empty or singular spectrum.
pub fn condition_number_from_spectrum(eigenvalues: &[f64]) -> Option<f64> {
    let magnitudes = eigenvalues.iter().map(|v| v.abs());
    let max = magnitudes.clone().fold(f64::NAN, f64::max);
    let min = magnitudes.fold(f64::NAN, f64::min);
    if !max.is_finite() || !min.is_finite() || min <= 1e-300 {
        return None;
    }
    Some(max / min)
}
