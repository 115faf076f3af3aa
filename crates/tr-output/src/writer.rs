//! The `ArtifactWriter` trait implemented by all backend writers.

use tr_core::RunSummary;
use tr_geom::{Segment, Trail};
use tr_graph::TrailGraph;
use tr_route::RouteRecommendation;

use crate::OutputResult;

/// Trait implemented by the CSV, GeoJSON, and SQLite backends.
///
/// Callers drive the five `write_*` methods in any order, then `finish()`.
pub trait ArtifactWriter {
    /// Persist the cleaned trail set (post-preprocessing).
    fn write_trails(&mut self, trails: &[Trail]) -> OutputResult<()>;

    /// Persist the split segment set.
    fn write_segments(&mut self, segments: &[Segment]) -> OutputResult<()>;

    /// Persist the vertex and edge tables (1-based exported ids).
    fn write_graph(&mut self, graph: &TrailGraph) -> OutputResult<()>;

    /// Persist the route recommendations.
    fn write_routes(&mut self, routes: &[RouteRecommendation]) -> OutputResult<()>;

    /// Persist the run summary.
    fn write_summary(&mut self, summary: &RunSummary) -> OutputResult<()>;

    /// Flush and close all underlying file handles.
    ///
    /// Idempotent — safe to call more than once.
    fn finish(&mut self) -> OutputResult<()>;
}
