//! Pipeline error type.
//!
//! Everything here is fatal: data-level problems are counters in the run
//! summary and never surface as errors.  A `PipelineError` aborts the run
//! with no artifact.

use thiserror::Error;

use tr_core::CoreError;
use tr_geom::GeomError;
use tr_graph::GraphError;
use tr_route::RouteError;

/// Fatal pipeline failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(String),

    /// Preprocessing eliminated every trail.
    #[error("preprocessing produced no trails: {0}")]
    EmptyAfterPreprocess(GeomError),

    /// An impossible invariant violation in a stage's output.
    #[error("invariant violation: {0}")]
    Invariant(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<GeomError> for PipelineError {
    fn from(e: GeomError) -> Self {
        match e {
            GeomError::Core(c)          => PipelineError::Core(c),
            GeomError::EmptyResult { .. } => PipelineError::EmptyAfterPreprocess(e),
            GeomError::NotSimple(_)     => PipelineError::Invariant(e.to_string()),
        }
    }
}

impl From<GraphError> for PipelineError {
    fn from(e: GraphError) -> Self {
        match e {
            GraphError::Core(c)      => PipelineError::Core(c),
            GraphError::Invariant(m) => PipelineError::Invariant(m),
        }
    }
}

impl From<RouteError> for PipelineError {
    fn from(e: RouteError) -> Self {
        match e {
            RouteError::Core(c)      => PipelineError::Core(c),
            RouteError::Invariant(m) => PipelineError::Invariant(m),
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
