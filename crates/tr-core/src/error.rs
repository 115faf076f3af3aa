//! Core error type.
//!
//! Sub-crates define their own error enums and either convert into
//! `CoreError` via `From` impls or wrap it as one variant.  Data-level
//! problems (a bad record, an exhausted tolerance ladder) are *not* errors —
//! they are counters in [`crate::summary::RunSummary`]; error values here
//! mean the run cannot meaningfully continue.

use thiserror::Error;

/// The top-level error type for `tr-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("run cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for all `tr-*` crates.
pub type CoreResult<T> = Result<T, CoreError>;
