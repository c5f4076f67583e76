// Incremental principal component analysis (PCA)

#![doc = include_str!("../README.md")]

pub mod error;
pub mod incremental;
pub mod linalg_backends;

#[cfg(feature = "enable-ipca-diagnostics")]
pub mod diagnostics;

pub use error::{IpcaError, Result};
pub use incremental::{EigenSolverKind, IncrementalPCA, IncrementalPcaConfig};
