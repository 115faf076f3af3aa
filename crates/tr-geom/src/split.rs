//! Trail splitting at true spatial intersections (Layer 1b).
//!
//! # Pipeline position
//!
//! Consumes the preprocessor's cleaned trails, emits [`Segment`]s.  Every
//! output geometry is a sub-LineString of exactly one input trail; split
//! points are the pairwise intersections of trail linework, deduplicated at
//! `intersection_tolerance_m` precision.
//!
//! # Parallelism
//!
//! Pair intersection tests run on the Rayon pool.  The candidate pair list
//! is built in deterministic (i, j) order and the parallel map preserves
//! that order, so the merged split-point sets — and therefore segment ids —
//! are identical run to run.

use rayon::prelude::*;
use rstar::{AABB, RTree, RTreeObject};
use tracing::debug;

use serde::Serialize;

use tr_core::{CancelToken, CoreError, EngineConfig, GeoPoint};

use crate::error::{GeomError, GeomResult};
use crate::polyline::{SegSegIntersection, seg_seg_intersection};
use crate::trail::{Segment, Trail};

// ── Report ────────────────────────────────────────────────────────────────────

/// Splitting outcome counters.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct SplitReport {
    pub trails_in:          usize,
    pub segments_out:       usize,
    /// Pairs whose padded bboxes overlapped.
    pub candidate_pairs:    u64,
    /// Pairs that produced at least one split point.
    pub intersecting_pairs: u64,
    /// Pairs skipped because intersection produced degenerate output; the
    /// trails involved are still emitted, unsplit at that location.
    pub pairs_skipped:      u64,
    /// Distinct split points after clustering, across all trails.
    pub split_points:       u64,
}

// ── R-tree entry ──────────────────────────────────────────────────────────────

/// Padded 2D bbox of one trail, for the pair pre-filter.
struct TrailEnvelope {
    aabb: AABB<[f64; 2]>,
    idx:  usize,
}

impl RTreeObject for TrailEnvelope {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

// ── TrailSplitter ─────────────────────────────────────────────────────────────

/// Layer 1b: split cleaned trails at their pairwise intersections.
pub struct TrailSplitter {
    tolerance_m: f64,
}

impl TrailSplitter {
    pub fn new(config: &EngineConfig) -> Self {
        Self { tolerance_m: config.intersection_tolerance_m }
    }

    pub fn run(
        &self,
        trails: &[Trail],
        cancel: &CancelToken,
    ) -> GeomResult<(Vec<Segment>, SplitReport)> {
        let mut report = SplitReport {
            trails_in: trails.len(),
            ..Default::default()
        };

        // Layer 1a guarantees simplicity; a violation here is a regression
        // upstream, not a data problem, and must fail loudly.
        for t in trails {
            if !t.geometry.is_simple() {
                return Err(GeomError::NotSimple(t.id.clone()));
            }
        }

        // ── Candidate pairs via padded-bbox R-tree ────────────────────────
        let entries: Vec<TrailEnvelope> = trails
            .iter()
            .enumerate()
            .map(|(idx, t)| {
                let b = t.bbox().padded_m(self.tolerance_m);
                TrailEnvelope {
                    aabb: AABB::from_corners([b.min_lng, b.min_lat], [b.max_lng, b.max_lat]),
                    idx,
                }
            })
            .collect();
        let padded: Vec<AABB<[f64; 2]>> = entries.iter().map(|e| e.aabb).collect();
        let tree = RTree::bulk_load(entries);

        let mut pairs: Vec<(usize, usize)> = Vec::new();
        for (i, aabb) in padded.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(GeomError::Core(CoreError::Cancelled));
            }
            for hit in tree.locate_in_envelope_intersecting(aabb) {
                if hit.idx > i {
                    pairs.push((i, hit.idx));
                }
            }
        }
        pairs.sort_unstable();
        report.candidate_pairs = pairs.len() as u64;

        // ── Pair intersections (parallel, order-preserving) ───────────────
        let pair_results: Vec<PairOutcome> = pairs
            .par_iter()
            .map(|&(i, j)| intersect_pair(i, j, &trails[i], &trails[j]))
            .collect();

        let mut per_trail: Vec<Vec<GeoPoint>> = vec![Vec::new(); trails.len()];
        for outcome in pair_results {
            match outcome {
                PairOutcome::Skipped => report.pairs_skipped += 1,
                PairOutcome::Disjoint => {}
                PairOutcome::Hits { i, j, points } => {
                    report.intersecting_pairs += 1;
                    for p in points {
                        per_trail[i].push(p);
                        per_trail[j].push(p);
                    }
                }
            }
        }

        // ── Split each trail at its clustered cut points ──────────────────
        let mut segments = Vec::with_capacity(trails.len());
        for (idx, trail) in trails.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(GeomError::Core(CoreError::Cancelled));
            }
            let clusters = cluster_points(&mut per_trail[idx], self.tolerance_m);
            report.split_points += clusters.len() as u64;

            let chainages: Vec<f64> = clusters
                .iter()
                .map(|&p| trail.geometry.chainage_of(p))
                .collect();
            let pieces = trail.geometry.split_at_chainages(&chainages);
            debug!(trail = %trail.id, cuts = clusters.len(), pieces = pieces.len(), "split");

            for (k, piece) in pieces.into_iter().enumerate() {
                segments.push(Segment::from_piece(trail, k as u32, piece));
            }
        }

        report.segments_out = segments.len();
        Ok((segments, report))
    }
}

// ── Pair intersection ─────────────────────────────────────────────────────────

enum PairOutcome {
    Disjoint,
    Skipped,
    Hits {
        i:      usize,
        j:      usize,
        points: Vec<GeoPoint>,
    },
}

/// All split points contributed by one trail pair.
///
/// Point and multipoint results are taken as-is; for overlapping linework,
/// the overlap's endpoints are retained as split points (the overlap itself
/// is not collapsed — each trail keeps its own copy, split at those
/// endpoints).
fn intersect_pair(i: usize, j: usize, a: &Trail, b: &Trail) -> PairOutcome {
    let mut points: Vec<GeoPoint> = Vec::new();
    for sa in a.geometry.points.windows(2) {
        for sb in b.geometry.points.windows(2) {
            match seg_seg_intersection(sa[0], sa[1], sb[0], sb[1]) {
                SegSegIntersection::None => {}
                SegSegIntersection::Point(p) => points.push(p),
                SegSegIntersection::Collinear(p1, p2) => {
                    points.push(p1);
                    points.push(p2);
                }
            }
        }
    }
    if points.is_empty() {
        return PairOutcome::Disjoint;
    }
    if points.iter().any(|p| !p.is_finite()) {
        return PairOutcome::Skipped;
    }
    PairOutcome::Hits { i, j, points }
}

// ── Split-point clustering ────────────────────────────────────────────────────

/// Collapse near-coincident split points to cluster centroids.
///
/// Two points belong to one cluster iff some chain of members links them at
/// ≤ `tolerance_m` steps (single-linkage), so a three-way near-coincidence
/// becomes a single point at the cluster centroid.  Input order is
/// normalised by sorting, keeping the result independent of pair order.
fn cluster_points(points: &mut Vec<GeoPoint>, tolerance_m: f64) -> Vec<GeoPoint> {
    if points.is_empty() {
        return Vec::new();
    }
    points.sort_by(|a, b| {
        a.lng
            .total_cmp(&b.lng)
            .then(a.lat.total_cmp(&b.lat))
            .then(a.elev.total_cmp(&b.elev))
    });

    // Union-find over the (small) per-trail point set.
    let n = points.len();
    let mut parent: Vec<usize> = (0..n).collect();
    fn find(parent: &mut Vec<usize>, x: usize) -> usize {
        let up = parent[x];
        if up == x {
            return x;
        }
        let root = find(parent, up);
        parent[x] = root;
        root
    }
    for x in 0..n {
        for y in (x + 1)..n {
            if points[x].distance_m(points[y]) <= tolerance_m {
                let (rx, ry) = (find(&mut parent, x), find(&mut parent, y));
                if rx != ry {
                    parent[ry.max(rx)] = ry.min(rx);
                }
            }
        }
    }

    let mut sums: std::collections::BTreeMap<usize, (f64, f64, f64, usize)> =
        std::collections::BTreeMap::new();
    for x in 0..n {
        let root = find(&mut parent, x);
        let e = sums.entry(root).or_insert((0.0, 0.0, 0.0, 0));
        e.0 += points[x].lng;
        e.1 += points[x].lat;
        e.2 += points[x].elev;
        e.3 += 1;
    }
    sums.into_values()
        .map(|(lng, lat, elev, k)| {
            GeoPoint::new(lng / k as f64, lat / k as f64, elev / k as f64)
        })
        .collect()
}
