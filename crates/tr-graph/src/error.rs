//! Graph-subsystem error type.

use thiserror::Error;

use tr_core::CoreError;

/// Errors produced by `tr-graph`.
#[derive(Debug, Error)]
pub enum GraphError {
    /// An output-contract violation (e.g. a self-loop edge survived the
    /// degenerate-edge rule).  Always a bug, never a data problem.
    #[error("graph invariant violated: {0}")]
    Invariant(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type GraphResult<T> = Result<T, GraphError>;
