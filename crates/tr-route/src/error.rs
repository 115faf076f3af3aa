//! Route-subsystem error type.
//!
//! Pattern-level outcomes (tolerance exhausted, component skipped, caps
//! hit) are counters in [`crate::search::SearchOutcome`], not errors; a
//! `RouteError` means the search itself cannot proceed.

use thiserror::Error;

use tr_core::CoreError;

/// Errors produced by `tr-route`.
#[derive(Debug, Error)]
pub enum RouteError {
    /// A produced route violates a structural invariant (non-adjacent
    /// consecutive edges, dangling ids).  Always a bug.
    #[error("route invariant violated: {0}")]
    Invariant(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type RouteResult<T> = Result<T, RouteError>;
