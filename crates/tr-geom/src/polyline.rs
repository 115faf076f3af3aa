//! 3D polyline operations.
//!
//! # Coordinate spaces
//!
//! Vertices are WGS-84 `(lng, lat, elev)`.  Intersection predicates run in
//! planar degree space (adequate at regional extents); distances, chainages,
//! and projections run in a local metre frame derived from the
//! equirectangular approximation, so tolerances expressed in metres apply
//! directly.
//!
//! # Chainage
//!
//! A chainage is a cumulative along-line distance in metres from the first
//! vertex.  Split points are addressed by chainage; elevation at an inserted
//! split point is linearly interpolated between the bracketing vertices.

use serde::{Deserialize, Serialize};

use tr_core::{BBox, EARTH_RADIUS_M, GeoPoint};

/// Snap window in metres: chainages closer than this to an existing vertex
/// reuse that vertex instead of inserting a near-duplicate point.
const SNAP_M: f64 = 1e-3;

// ── Polyline ──────────────────────────────────────────────────────────────────

/// An ordered sequence of 3D vertices.
///
/// A *valid* polyline has ≥ 2 vertices, all finite.  Construction does not
/// enforce this — the preprocessor filters invalid linework explicitly so it
/// can count what it dropped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub points: Vec<GeoPoint>,
}

impl Polyline {
    pub fn new(points: Vec<GeoPoint>) -> Self {
        Self { points }
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<GeoPoint> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<GeoPoint> {
        self.points.last().copied()
    }

    pub fn is_finite(&self) -> bool {
        self.points.iter().all(|p| p.is_finite())
    }

    /// First and last vertex coincide in 2D.
    pub fn is_closed(&self) -> bool {
        match (self.first(), self.last()) {
            (Some(a), Some(b)) => self.points.len() > 2 && a.same_xy(b),
            _ => false,
        }
    }

    pub fn length_m(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| w[0].distance_m(w[1]))
            .sum()
    }

    pub fn length_km(&self) -> f64 {
        self.length_m() / 1_000.0
    }

    pub fn bbox(&self) -> BBox {
        BBox::from_points(self.points.iter().copied())
    }

    /// Σ max(0, zᵢ₊₁ − zᵢ) over the vertex sequence.
    pub fn elevation_gain_m(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| (w[1].elev - w[0].elev).max(0.0))
            .sum()
    }

    /// Σ max(0, zᵢ − zᵢ₊₁) over the vertex sequence.
    pub fn elevation_loss_m(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| (w[0].elev - w[1].elev).max(0.0))
            .sum()
    }

    pub fn reversed(&self) -> Polyline {
        let mut points = self.points.clone();
        points.reverse();
        Polyline::new(points)
    }

    /// Copy with consecutive 2D-duplicate vertices collapsed.
    pub fn dedup_consecutive(&self) -> Polyline {
        let mut out: Vec<GeoPoint> = Vec::with_capacity(self.points.len());
        for &p in &self.points {
            if out.last().is_none_or(|&last| !last.same_xy(p)) {
                out.push(p);
            }
        }
        Polyline::new(out)
    }

    // ── Simplicity ────────────────────────────────────────────────────────

    /// ST_IsSimple semantics: no self-intersection except consecutive
    /// segments touching at their shared vertex, and (for a closed line)
    /// the first/last vertex.  Zero-length segments make a line non-simple.
    pub fn is_simple(&self) -> bool {
        let n = self.points.len();
        if n < 2 {
            return false;
        }
        if self.points.windows(2).any(|w| w[0].same_xy(w[1])) {
            return false;
        }
        let closed = self.is_closed();
        let segs = n - 1;
        for i in 0..segs {
            for j in (i + 1)..segs {
                let adjacent = j == i + 1;
                let wraps = closed && i == 0 && j == segs - 1;
                let hit = seg_seg_intersection(
                    self.points[i], self.points[i + 1],
                    self.points[j], self.points[j + 1],
                );
                match hit {
                    SegSegIntersection::None => {}
                    SegSegIntersection::Point(p) => {
                        if adjacent {
                            if !near_xy(p, self.points[j]) {
                                return false;
                            }
                        } else if wraps {
                            if !near_xy(p, self.points[0]) {
                                return false;
                            }
                        } else {
                            return false;
                        }
                    }
                    // Overlapping linework is never simple.
                    SegSegIntersection::Collinear(_, _) => return false,
                }
            }
        }
        true
    }

    /// Chainages (both passes) of every self-intersection, sorted and
    /// deduplicated.  Empty for a simple line.
    pub fn self_intersection_chainages(&self) -> Vec<f64> {
        let n = self.points.len();
        if n < 3 {
            return vec![];
        }
        let cum = self.cumulative_m();
        let closed = self.is_closed();
        let segs = n - 1;
        let mut cuts: Vec<f64> = Vec::new();

        fn push_hit(cuts: &mut Vec<f64>, cum: &[f64], seg: usize, a: GeoPoint, p: GeoPoint) {
            cuts.push(cum[seg] + a.distance_m(p));
        }

        for i in 0..segs {
            for j in (i + 1)..segs {
                let adjacent = j == i + 1;
                let wraps = closed && i == 0 && j == segs - 1;
                let hit = seg_seg_intersection(
                    self.points[i], self.points[i + 1],
                    self.points[j], self.points[j + 1],
                );
                match hit {
                    SegSegIntersection::None => {}
                    SegSegIntersection::Point(p) => {
                        let shared = (adjacent && near_xy(p, self.points[j]))
                            || (wraps && near_xy(p, self.points[0]));
                        if !shared {
                            push_hit(&mut cuts, &cum, i, self.points[i], p);
                            push_hit(&mut cuts, &cum, j, self.points[j], p);
                        }
                    }
                    SegSegIntersection::Collinear(p1, p2) => {
                        for p in [p1, p2] {
                            push_hit(&mut cuts, &cum, i, self.points[i], p);
                            push_hit(&mut cuts, &cum, j, self.points[j], p);
                        }
                    }
                }
            }
        }
        cuts.sort_by(f64::total_cmp);
        cuts.dedup_by(|a, b| (*a - *b).abs() < SNAP_M);
        cuts
    }

    // ── Chainage ──────────────────────────────────────────────────────────

    /// Cumulative length in metres before each vertex (len = point_count).
    pub fn cumulative_m(&self) -> Vec<f64> {
        let mut cum = Vec::with_capacity(self.points.len());
        let mut acc = 0.0;
        cum.push(0.0);
        for w in self.points.windows(2) {
            acc += w[0].distance_m(w[1]);
            cum.push(acc);
        }
        cum
    }

    /// Chainage of the closest on-line projection of `p`.
    ///
    /// Ties (equidistant segments) resolve to the earliest chainage.
    pub fn chainage_of(&self, p: GeoPoint) -> f64 {
        let mut best_d = f64::INFINITY;
        let mut best_c = 0.0;
        let mut cum = 0.0;
        for w in self.points.windows(2) {
            let seg_len = w[0].distance_m(w[1]);
            if seg_len > 0.0 {
                let (px, py) = local_m(w[0], p);
                let (sx, sy) = local_m(w[0], w[1]);
                let t = ((px * sx + py * sy) / (sx * sx + sy * sy)).clamp(0.0, 1.0);
                let (dx, dy) = (px - t * sx, py - t * sy);
                let d = (dx * dx + dy * dy).sqrt();
                if d < best_d - 1e-9 {
                    best_d = d;
                    best_c = cum + t * seg_len;
                }
            }
            cum += seg_len;
        }
        best_c
    }

    /// The point at chainage `c` (clamped to the line), elevation linearly
    /// interpolated between the bracketing vertices.
    pub fn point_at_chainage(&self, c: f64) -> GeoPoint {
        let mut cum = 0.0;
        for w in self.points.windows(2) {
            let seg_len = w[0].distance_m(w[1]);
            if seg_len == 0.0 {
                continue;
            }
            if c <= cum + seg_len {
                let t = ((c - cum) / seg_len).clamp(0.0, 1.0);
                return lerp(w[0], w[1], t);
            }
            cum += seg_len;
        }
        // Chainage beyond the end.
        self.points[self.points.len() - 1]
    }

    /// Split at the given chainages (metres), producing ordered pieces.
    ///
    /// Chainages within [`SNAP_M`] of an existing vertex cut *at* that
    /// vertex (no near-duplicate point is inserted); chainages at or beyond
    /// the line ends are ignored.  Inserted points interpolate elevation.
    pub fn split_at_chainages(&self, chainages: &[f64]) -> Vec<Polyline> {
        let total = self.length_m();
        let mut cuts: Vec<f64> = chainages
            .iter()
            .copied()
            .filter(|&c| c > SNAP_M && c < total - SNAP_M)
            .collect();
        cuts.sort_by(f64::total_cmp);
        cuts.dedup_by(|a, b| (*a - *b).abs() < SNAP_M);
        if cuts.is_empty() || self.points.len() < 2 {
            return vec![self.clone()];
        }

        let mut pieces: Vec<Polyline> = Vec::with_capacity(cuts.len() + 1);
        let mut current: Vec<GeoPoint> = vec![self.points[0]];
        let mut cum = 0.0;
        let mut next_cut = cuts.iter().copied().peekable();

        for w in self.points.windows(2) {
            let seg_len = w[0].distance_m(w[1]);
            // Cuts strictly inside this segment.
            while let Some(&c) = next_cut.peek() {
                if c >= cum + seg_len - SNAP_M {
                    break;
                }
                if c <= cum + SNAP_M {
                    // Coincides with the segment start, already a vertex.
                    next_cut.next();
                    continue;
                }
                let t = (c - cum) / seg_len;
                let p = lerp(w[0], w[1], t);
                current.push(p);
                pieces.push(Polyline::new(std::mem::replace(&mut current, vec![p])));
                next_cut.next();
            }
            cum += seg_len;
            current.push(w[1]);
            // A cut landing on the end vertex splits there without inserting.
            if let Some(&c) = next_cut.peek() {
                if (c - cum).abs() <= SNAP_M {
                    pieces.push(Polyline::new(std::mem::replace(&mut current, vec![w[1]])));
                    next_cut.next();
                }
            }
        }
        pieces.push(Polyline::new(current));
        pieces.retain(|p| p.point_count() >= 2 && p.length_m() > 0.0);
        pieces
    }
}

// ── Segment-segment intersection ──────────────────────────────────────────────

/// Result of intersecting two 2D line segments.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SegSegIntersection {
    None,
    /// Proper or endpoint intersection at a single point.  Elevation is
    /// interpolated along the *first* segment.
    Point(GeoPoint),
    /// Collinear overlap; the two endpoints of the shared portion.
    Collinear(GeoPoint, GeoPoint),
}

/// Planar segment intersection in degree space, parametric form.
pub fn seg_seg_intersection(
    a1: GeoPoint,
    a2: GeoPoint,
    b1: GeoPoint,
    b2: GeoPoint,
) -> SegSegIntersection {
    let r = (a2.lng - a1.lng, a2.lat - a1.lat);
    let s = (b2.lng - b1.lng, b2.lat - b1.lat);
    let qp = (b1.lng - a1.lng, b1.lat - a1.lat);

    let denom = cross(r, s);
    let r_len = (r.0 * r.0 + r.1 * r.1).sqrt();
    let s_len = (s.0 * s.0 + s.1 * s.1).sqrt();
    // Scale-relative epsilon: coordinates are O(100) degrees, deltas much
    // smaller; a fixed absolute epsilon would misclassify short segments.
    let eps = 1e-12 * r_len.max(s_len).max(1e-12);

    if denom.abs() > eps * r_len.max(1e-12) {
        let t = cross(qp, s) / denom;
        let u = cross(qp, r) / denom;
        let in_range = |v: f64| (-1e-9..=1.0 + 1e-9).contains(&v);
        if in_range(t) && in_range(u) {
            return SegSegIntersection::Point(lerp(a1, a2, t.clamp(0.0, 1.0)));
        }
        return SegSegIntersection::None;
    }

    // Parallel.  Collinear iff b1 lies on the line through a.
    if cross(qp, r).abs() > eps {
        return SegSegIntersection::None;
    }

    // Collinear: project b's endpoints onto a's parameter space.
    let rr = r.0 * r.0 + r.1 * r.1;
    if rr == 0.0 {
        return SegSegIntersection::None; // degenerate zero-length a
    }
    let t0 = (qp.0 * r.0 + qp.1 * r.1) / rr;
    let t1 = t0 + (s.0 * r.0 + s.1 * r.1) / rr;
    let (lo, hi) = (t0.min(t1).max(0.0), t0.max(t1).min(1.0));
    if hi < lo - 1e-9 {
        return SegSegIntersection::None;
    }
    if (hi - lo).abs() <= 1e-9 {
        return SegSegIntersection::Point(lerp(a1, a2, lo.clamp(0.0, 1.0)));
    }
    SegSegIntersection::Collinear(lerp(a1, a2, lo), lerp(a1, a2, hi))
}

// ── Local helpers ─────────────────────────────────────────────────────────────

#[inline]
fn cross(a: (f64, f64), b: (f64, f64)) -> f64 {
    a.0 * b.1 - a.1 * b.0
}

/// Linear interpolation along a segment, including elevation.
#[inline]
pub(crate) fn lerp(a: GeoPoint, b: GeoPoint, t: f64) -> GeoPoint {
    GeoPoint::new(
        a.lng + (b.lng - a.lng) * t,
        a.lat + (b.lat - a.lat) * t,
        a.elev + (b.elev - a.elev) * t,
    )
}

/// Planar metre offsets of `p` relative to `origin`.
#[inline]
pub(crate) fn local_m(origin: GeoPoint, p: GeoPoint) -> (f64, f64) {
    let coslat = origin.lat.to_radians().cos();
    let x = (p.lng - origin.lng).to_radians() * EARTH_RADIUS_M * coslat;
    let y = (p.lat - origin.lat).to_radians() * EARTH_RADIUS_M;
    (x, y)
}

/// 2D proximity in degree space, tight enough to identify shared vertices.
#[inline]
fn near_xy(a: GeoPoint, b: GeoPoint) -> bool {
    (a.lng - b.lng).abs() < 1e-9 && (a.lat - b.lat).abs() < 1e-9
}
