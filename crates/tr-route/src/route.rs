//! Route recommendations: the final product of Layer 3.
//!
//! # Identity
//!
//! Route ids must be stable across runs, so they are derived from a
//! 128-bit FxHash of the path's edge ids and shape, formatted as a UUID
//! string.  Two runs over identical inputs produce identical ids.

use std::collections::BTreeSet;
use std::hash::Hasher;

use rustc_hash::FxHasher;
use serde::Serialize;

use tr_core::{EdgeId, VertexId};
use tr_geom::Polyline;
use tr_graph::TrailGraph;

use crate::dijkstra::GraphPath;
use crate::pattern::{RoutePattern, RouteShape};

// ── RouteGeometry ─────────────────────────────────────────────────────────────

/// Aggregated route geometry: a MultiLineString for out-and-back (forward
/// then reversed forward), a single LineString for every other shape.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum RouteGeometry {
    LineString(Polyline),
    MultiLineString(Vec<Polyline>),
}

// ── RouteRecommendation ───────────────────────────────────────────────────────

/// A proposed route matching (or near-missing) one pattern's targets.
#[derive(Clone, Debug, Serialize)]
pub struct RouteRecommendation {
    /// Deterministic id derived from (edge ids, shape).
    pub uuid:   String,
    pub region: String,
    pub pattern_name: String,
    pub shape:  RouteShape,

    pub target_distance_km:      f64,
    pub target_elevation_gain_m: f64,

    /// Σ edge lengths along the stored path (doubled for out-and-back).
    pub length_km: f64,
    /// Surfaced only where it is non-redundant: for out-and-back it is the
    /// doubled total while the stored path is the forward half.
    pub total_trail_distance_km: Option<f64>,
    pub elevation_gain_m: f64,
    pub elevation_loss_m: f64,

    /// Ordered edge ids of the stored path (forward half for out-and-back).
    pub edge_ids:   Vec<EdgeId>,
    /// Ordered vertex ids, edge-consistent with `edge_ids`.
    pub vertex_ids: Vec<VertexId>,
    /// Constituent trail names, deduplicated and sorted.
    pub trail_names: Vec<String>,

    /// Fit quality in [0, 1]; 1.0 is an exact match on both targets.
    pub route_score: f64,
    /// Max trail-set Jaccard similarity vs. previously accepted routes.
    pub similarity_score: f64,

    pub geometry: RouteGeometry,
}

impl RouteRecommendation {
    /// Assemble a recommendation from an accepted graph path.
    ///
    /// `realized_km`/`realized_gain_m` are the pattern-facing values (for
    /// out-and-back these cover the doubled traversal even though `path`
    /// holds only the forward half).
    #[allow(clippy::too_many_arguments)]
    pub fn from_path(
        graph: &TrailGraph,
        pattern: &RoutePattern,
        region: &str,
        path: &GraphPath,
        realized_km: f64,
        realized_gain_m: f64,
        realized_loss_m: f64,
        route_score: f64,
        similarity_score: f64,
    ) -> Self {
        let trail_names: Vec<String> = trail_name_set(graph, &path.edges).into_iter().collect();
        let forward = assemble_line(graph, path);
        let geometry = match pattern.shape {
            RouteShape::OutAndBack => {
                RouteGeometry::MultiLineString(vec![forward.clone(), forward.reversed()])
            }
            _ => RouteGeometry::LineString(forward),
        };
        let total_trail_distance_km = match pattern.shape {
            RouteShape::OutAndBack => Some(realized_km),
            _ => None,
        };

        Self {
            uuid:   route_uuid(&path.edges, pattern.shape),
            region: region.to_owned(),
            pattern_name: pattern.name.clone(),
            shape:  pattern.shape,
            target_distance_km:      pattern.target_distance_km,
            target_elevation_gain_m: pattern.target_elevation_gain_m,
            length_km: realized_km,
            total_trail_distance_km,
            elevation_gain_m: realized_gain_m,
            elevation_loss_m: realized_loss_m,
            edge_ids:   path.edges.clone(),
            vertex_ids: path.vertices.clone(),
            trail_names,
            route_score,
            similarity_score,
            geometry,
        }
    }

    /// The trail-name set used for Jaccard deduplication.
    pub fn name_set(&self) -> BTreeSet<String> {
        self.trail_names.iter().cloned().collect()
    }
}

/// Structural check on a finished recommendation.
///
/// Verifies that every edge id exists, that the vertex list is
/// edge-consistent (each edge connects its bracketing vertices), and that
/// loop routes close on themselves.  A failure is a bug in the search, not
/// a data condition, and the pipeline treats it as fatal.
pub fn validate(
    route: &RouteRecommendation,
    graph: &TrailGraph,
) -> Result<(), crate::error::RouteError> {
    use crate::error::RouteError;

    if route.vertex_ids.len() != route.edge_ids.len() + 1 {
        return Err(RouteError::Invariant(format!(
            "route {}: {} vertices for {} edges",
            route.uuid,
            route.vertex_ids.len(),
            route.edge_ids.len()
        )));
    }
    for (i, &e) in route.edge_ids.iter().enumerate() {
        if e.index() >= graph.edge_count() {
            return Err(RouteError::Invariant(format!(
                "route {}: edge {e} does not exist",
                route.uuid
            )));
        }
        let (a, b) = (route.vertex_ids[i], route.vertex_ids[i + 1]);
        let (s, t) = (graph.edge_source[e.index()], graph.edge_target[e.index()]);
        if !((a == s && b == t) || (a == t && b == s)) {
            return Err(RouteError::Invariant(format!(
                "route {}: edge {e} does not connect {a} and {b}",
                route.uuid
            )));
        }
    }
    if route.shape == RouteShape::Loop
        && route.vertex_ids.first() != route.vertex_ids.last()
    {
        return Err(RouteError::Invariant(format!(
            "route {}: loop does not close",
            route.uuid
        )));
    }
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Deduplicated, sorted trail names along a set of edges.
pub fn trail_name_set(graph: &TrailGraph, edges: &[EdgeId]) -> BTreeSet<String> {
    edges
        .iter()
        .map(|e| graph.edge_trail_name[e.index()].clone())
        .collect()
}

/// Concatenate edge geometries along the path, oriented by traversal
/// direction, dropping the duplicated joint vertices.
pub fn assemble_line(graph: &TrailGraph, path: &GraphPath) -> Polyline {
    let mut points = Vec::new();
    for (i, &edge) in path.edges.iter().enumerate() {
        let from = path.vertices[i];
        let geom = &graph.edge_geometry[edge.index()];
        let forward = graph.edge_source[edge.index()] == from;

        let mut add = |p: tr_core::GeoPoint| {
            if points.last() != Some(&p) {
                points.push(p);
            }
        };
        if forward {
            for &p in &geom.points {
                add(p);
            }
        } else {
            for &p in geom.points.iter().rev() {
                add(p);
            }
        }
    }
    Polyline::new(points)
}

/// Deterministic 128-bit id from (edge ids, shape), in UUID text form.
pub fn route_uuid(edges: &[EdgeId], shape: RouteShape) -> String {
    let mut hi = FxHasher::default();
    hi.write(shape.as_str().as_bytes());
    for e in edges {
        hi.write_u32(e.0);
    }
    let a = hi.finish();

    // Second word: same payload, reversed, salted, so the two halves are
    // independent.
    let mut lo = FxHasher::default();
    lo.write_u64(a ^ 0x9e37_79b9_7f4a_7c15);
    for e in edges.iter().rev() {
        lo.write_u32(e.0);
    }
    let b = lo.finish();

    format!(
        "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
        (a >> 32) as u32,
        (a >> 16) as u16,
        a as u16,
        (b >> 48) as u16,
        b & 0xffff_ffff_ffff,
    )
}
