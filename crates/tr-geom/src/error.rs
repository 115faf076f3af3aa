//! Geometry-subsystem error type.
//!
//! Data-level problems (one bad trail) are counted in reports, not raised;
//! these variants cover the conditions under which Layer 1 cannot produce a
//! usable output at all.

use thiserror::Error;

use tr_core::CoreError;

/// Errors produced by `tr-geom`.
#[derive(Debug, Error)]
pub enum GeomError {
    /// A preprocessing pass removed every remaining trail.
    #[error("preprocessing pass {pass} eliminated every trail")]
    EmptyResult { pass: u32 },

    /// The splitter received a non-simple geometry — Layer 1a guarantees
    /// simplicity, so this is an upstream regression, not a data problem.
    #[error("trail {0} is not simple on entry to the splitter")]
    NotSimple(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type GeomResult<T> = Result<T, GeomError>;
