//! Noding (Layer 2a/2b): planarize the segment set into vertex/edge
//! topology with endpoint snapping.
//!
//! # Algorithm
//!
//! 1. Emit every segment start/end point as a candidate vertex.
//! 2. Cluster candidates: two candidates cluster iff they lie within
//!    `topology_tolerance_m` (single-linkage over a grid index).  Cluster
//!    representative = centroid; elevation = mean of members.
//! 3. Assign dense vertex ids by sorting clusters on (lng, lat).
//! 4. Per segment, `source`/`target` = clusters of its start/end points.
//! 5. Degenerate edges (`source == target`, i.e. loop trails) are split at
//!    their geometric midpoint into two edges first; loops too short to
//!    split are dropped and counted.
//! 6. Assign dense edge ids by sorting on
//!    (min(source, target), max(source, target), segment order).
//! 7. Derive `cnt`, lengths, gains, losses, and costs (CSR build).
//!
//! Identical inputs and tolerance produce identical vertex and edge ids.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use tr_core::{CancelToken, CoreError, EARTH_RADIUS_M, EngineConfig, GeoPoint, VertexId};
use tr_geom::{Polyline, Segment};

use crate::error::{GraphError, GraphResult};
use crate::graph::{TrailGraph, TrailGraphBuilder};

/// Loops shorter than this cannot be meaningfully midpoint-split.
const MIN_LOOP_SPLIT_M: f64 = 2.0;

// ── Report ────────────────────────────────────────────────────────────────────

/// Noding outcome counters.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct NoderReport {
    pub segments_in:  usize,
    pub vertices_out: usize,
    pub edges_out:    usize,
    /// Loop segments split at their midpoint into two edges.
    pub loops_split:         u64,
    /// Segments dropped because both endpoints collapse to one vertex and
    /// the geometry is too short to split.
    pub degenerate_dropped:  u64,
    /// Segments dropped for zero or non-finite length.
    pub zero_length_dropped: u64,
    /// Segments dropped for exceeding `max_edge_length_km`.
    pub overlong_dropped:    u64,
}

// ── Noder ─────────────────────────────────────────────────────────────────────

/// Layer 2a/2b: build the routing graph from split segments.
pub struct Noder {
    topology_tolerance_m: f64,
    max_edge_length_km:   f64,
}

/// One edge candidate inside the noder (a segment, or half of a loop).
struct WorkEdge<'a> {
    segment:  &'a Segment,
    geometry: Polyline,
    /// Suffix distinguishing loop halves in the exported segment id.
    id_suffix: &'static str,
    /// Global order for the deterministic edge-sort tie-break.
    order: usize,
}

impl Noder {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            topology_tolerance_m: config.topology_tolerance_m,
            max_edge_length_km:   config.max_edge_length_km,
        }
    }

    pub fn run(
        &self,
        segments: &[Segment],
        cancel: &CancelToken,
    ) -> GraphResult<(TrailGraph, NoderReport)> {
        let mut report = NoderReport {
            segments_in: segments.len(),
            ..Default::default()
        };

        // ── Length guard: drop broken segments up front ───────────────────
        let mut usable: Vec<&Segment> = Vec::with_capacity(segments.len());
        for s in segments {
            let km = s.geometry.length_km();
            if !(km.is_finite() && km > 0.0) {
                report.zero_length_dropped += 1;
            } else if km > self.max_edge_length_km {
                report.overlong_dropped += 1;
            } else {
                usable.push(s);
            }
        }
        if cancel.is_cancelled() {
            return Err(GraphError::Core(CoreError::Cancelled));
        }

        // ── Pre-pass: detect loop segments and midpoint-split them ────────
        let endpoints: Vec<GeoPoint> = usable
            .iter()
            .flat_map(|s| {
                // Length-filtered segments always have ≥ 2 points.
                let pts = &s.geometry.points;
                [pts[0], pts[pts.len() - 1]]
            })
            .collect();
        let (assignment, _) = cluster_points(&endpoints, self.topology_tolerance_m);

        let mut work: Vec<WorkEdge<'_>> = Vec::with_capacity(usable.len());
        let mut order = 0;
        for (i, &s) in usable.iter().enumerate() {
            let is_loop = assignment[2 * i] == assignment[2 * i + 1];
            if !is_loop {
                work.push(WorkEdge { segment: s, geometry: s.geometry.clone(), id_suffix: "", order });
                order += 1;
                continue;
            }
            let len_m = s.geometry.length_m();
            if len_m < MIN_LOOP_SPLIT_M {
                report.degenerate_dropped += 1;
                continue;
            }
            report.loops_split += 1;
            let halves = s.geometry.split_at_chainages(&[len_m / 2.0]);
            debug!(segment = %s.id, "loop segment split at midpoint");
            for (half, suffix) in halves.into_iter().zip(["/a", "/b"]) {
                work.push(WorkEdge { segment: s, geometry: half, id_suffix: suffix, order });
                order += 1;
            }
        }

        // ── Cluster all endpoints of the final edge set ───────────────────
        let endpoints: Vec<GeoPoint> = work
            .iter()
            .flat_map(|w| {
                let pts = &w.geometry.points;
                [pts[0], pts[pts.len() - 1]]
            })
            .collect();
        let (assignment, centroids) = cluster_points(&endpoints, self.topology_tolerance_m);

        if cancel.is_cancelled() {
            return Err(GraphError::Core(CoreError::Cancelled));
        }

        // ── Edge records with canonical ordering ──────────────────────────
        struct EdgeRec {
            source: VertexId,
            target: VertexId,
            work:   usize,
        }
        let mut edges: Vec<EdgeRec> = Vec::with_capacity(work.len());
        for (i, _w) in work.iter().enumerate() {
            let source = VertexId(assignment[2 * i] as u32);
            let target = VertexId(assignment[2 * i + 1] as u32);
            if source == target {
                // A loop half still collapsing means the whole loop fits
                // inside the tolerance; nothing routable remains.
                report.degenerate_dropped += 1;
                continue;
            }
            edges.push(EdgeRec { source, target, work: i });
        }
        edges.sort_by_key(|e| {
            (e.source.min(e.target), e.source.max(e.target), work[e.work].order)
        });

        // ── Materialise the graph ─────────────────────────────────────────
        let mut builder = TrailGraphBuilder::with_capacity(centroids.len(), edges.len());
        for &c in &centroids {
            builder.add_vertex(c);
        }
        for rec in &edges {
            let w = &work[rec.work];
            builder.add_edge(
                rec.source,
                rec.target,
                w.geometry.clone(),
                format!("{}{}", w.segment.id, w.id_suffix),
                w.segment.parent_trail_id.clone(),
                w.segment.name.clone(),
            );
        }
        let graph = builder.build();

        // Output contract: no self-loops may survive the degenerate rule.
        for e in 0..graph.edge_count() {
            if graph.edge_source[e] == graph.edge_target[e] {
                return Err(GraphError::Invariant(format!(
                    "edge {e} has source == target after noding"
                )));
            }
        }

        report.vertices_out = graph.vertex_count();
        report.edges_out = graph.edge_count();
        Ok((graph, report))
    }
}

// ── Endpoint clustering ───────────────────────────────────────────────────────

/// Single-linkage clustering of candidate points at `tolerance_m`.
///
/// Returns `(assignment, centroids)` where `assignment[i]` is the index of
/// point `i`'s cluster and `centroids` is ordered by (lng, lat) — the
/// noder's canonical vertex order, so `assignment` values are final vertex
/// indices.
fn cluster_points(points: &[GeoPoint], tolerance_m: f64) -> (Vec<usize>, Vec<GeoPoint>) {
    let n = points.len();
    if n == 0 {
        return (Vec::new(), Vec::new());
    }

    // ── Union-find with grid acceleration ─────────────────────────────────
    let mut parent: Vec<usize> = (0..n).collect();
    fn find(parent: &mut [usize], x: usize) -> usize {
        let mut root = x;
        while parent[root] != root {
            root = parent[root];
        }
        let mut cur = x;
        while parent[cur] != root {
            let next = parent[cur];
            parent[cur] = root;
            cur = next;
        }
        root
    }
    fn union(parent: &mut [usize], a: usize, b: usize) {
        let (ra, rb) = (find(parent, a), find(parent, b));
        if ra != rb {
            // Smaller root wins, keeping structure independent of scan order.
            parent[ra.max(rb)] = ra.min(rb);
        }
    }

    let cell_lat = (tolerance_m.max(1e-3) / EARTH_RADIUS_M).to_degrees();
    let mean_lat = points.iter().map(|p| p.lat).sum::<f64>() / n as f64;
    let cell_lng = cell_lat / mean_lat.to_radians().cos().abs().max(1e-6);

    let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::with_capacity(n);
    for (i, p) in points.iter().enumerate() {
        let key = ((p.lng / cell_lng).floor() as i64, (p.lat / cell_lat).floor() as i64);
        grid.entry(key).or_default().push(i);
    }
    for (i, p) in points.iter().enumerate() {
        let (cx, cy) = ((p.lng / cell_lng).floor() as i64, (p.lat / cell_lat).floor() as i64);
        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(bucket) = grid.get(&(cx + dx, cy + dy)) else { continue };
                for &j in bucket {
                    if j > i && points[i].distance_m(points[j]) <= tolerance_m {
                        union(&mut parent, i, j);
                    }
                }
            }
        }
    }

    // ── Centroids in first-member order ───────────────────────────────────
    let mut group_of_root: HashMap<usize, usize> = HashMap::new();
    let mut sums: Vec<(f64, f64, f64, usize)> = Vec::new();
    let mut group: Vec<usize> = vec![0; n];
    for i in 0..n {
        let root = find(&mut parent, i);
        let g = *group_of_root.entry(root).or_insert_with(|| {
            sums.push((0.0, 0.0, 0.0, 0));
            sums.len() - 1
        });
        sums[g].0 += points[i].lng;
        sums[g].1 += points[i].lat;
        sums[g].2 += points[i].elev;
        sums[g].3 += 1;
        group[i] = g;
    }
    let centroids: Vec<GeoPoint> = sums
        .iter()
        .map(|&(lng, lat, elev, k)| GeoPoint::new(lng / k as f64, lat / k as f64, elev / k as f64))
        .collect();

    // ── Canonical (lng, lat) vertex order ─────────────────────────────────
    let mut order: Vec<usize> = (0..centroids.len()).collect();
    order.sort_by(|&a, &b| {
        centroids[a]
            .lng
            .total_cmp(&centroids[b].lng)
            .then(centroids[a].lat.total_cmp(&centroids[b].lat))
    });
    let mut rank = vec![0usize; centroids.len()];
    for (pos, &g) in order.iter().enumerate() {
        rank[g] = pos;
    }

    let assignment: Vec<usize> = group.iter().map(|&g| rank[g]).collect();
    let sorted_centroids: Vec<GeoPoint> = order.iter().map(|&g| centroids[g]).collect();
    (assignment, sorted_centroids)
}
