// src/error.rs

use thiserror::Error;

/// Errors raised by [`crate::IncrementalPCA`].
///
/// Input errors (`DimensionMismatch`, `NotInitialized`, `InsufficientSamples`) are detected before
/// any state is touched, so the model stays usable after they are returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IpcaError {
    /// An input vector or batch row does not have exactly `d` components.
    #[error("Dimension mismatch: expected {expected} features, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// `update` or `transform` was called before `initialize`.
    #[error("Incremental PCA was not initialised; call `initialize` with a batch first")]
    NotInitialized,

    /// The bootstrap batch has fewer than two rows.
    #[error("Initialisation batch must contain at least 2 samples, got {got}")]
    InsufficientSamples { got: usize },

    /// The requested input/output dimensionality is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The eigendecomposition backend failed or produced non-finite output.
    #[error("Eigen decomposition of covariance matrix failed: {0}")]
    DecompositionFailure(String),

    /// An internal post-condition on matrix shapes did not hold.
    #[error("Shape invariant violated for {what}: expected {expected:?}, got {got:?}")]
    ShapeInvariantViolation {
        what: &'static str,
        expected: (usize, usize),
        got: (usize, usize),
    },
}

/// Result type alias for incremental PCA operations.
pub type Result<T> = std::result::Result<T, IpcaError>;
