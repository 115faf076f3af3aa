//! Route patterns, tolerance ladder, and scoring.

use serde::{Deserialize, Serialize};

// ── RouteShape ────────────────────────────────────────────────────────────────

/// The four supported route shapes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteShape {
    OutAndBack,
    PointToPoint,
    Loop,
    Lollipop,
}

impl RouteShape {
    pub fn as_str(self) -> &'static str {
        match self {
            RouteShape::OutAndBack   => "out-and-back",
            RouteShape::PointToPoint => "point-to-point",
            RouteShape::Loop         => "loop",
            RouteShape::Lollipop     => "lollipop",
        }
    }

    /// Minimum edge count for an acceptable route of this shape.
    ///
    /// Out-and-back counts the doubled (forward + return) traversal.
    pub fn min_edges(self) -> usize {
        match self {
            RouteShape::Loop | RouteShape::Lollipop => 3,
            RouteShape::OutAndBack                  => 2,
            RouteShape::PointToPoint                => 1,
        }
    }
}

impl std::fmt::Display for RouteShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── RoutePattern ──────────────────────────────────────────────────────────────

/// A target specification: shape plus distance and elevation-gain goals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoutePattern {
    pub name: String,
    pub target_distance_km: f64,
    pub target_elevation_gain_m: f64,
    pub shape: RouteShape,
    /// Per-pattern ladder override; `None` uses the engine-wide ladder.
    #[serde(default)]
    pub tolerance_ladder_percent: Option<Vec<f64>>,
}

impl RoutePattern {
    pub fn new(
        name: impl Into<String>,
        target_distance_km: f64,
        target_elevation_gain_m: f64,
        shape: RouteShape,
    ) -> Self {
        Self {
            name: name.into(),
            target_distance_km,
            target_elevation_gain_m,
            shape,
            tolerance_ladder_percent: None,
        }
    }

    /// The built-in pattern set used when no `PatternSource` is supplied:
    /// two loops, two out-and-backs, a point-to-point, and a lollipop
    /// spanning the common day-hike envelope.
    pub fn default_set() -> Vec<RoutePattern> {
        vec![
            Self::new("short-loop", 5.0, 150.0, RouteShape::Loop),
            Self::new("half-day-loop", 12.0, 400.0, RouteShape::Loop),
            Self::new("short-out-and-back", 8.0, 250.0, RouteShape::OutAndBack),
            Self::new("long-out-and-back", 16.0, 600.0, RouteShape::OutAndBack),
            Self::new("traverse", 10.0, 300.0, RouteShape::PointToPoint),
            Self::new("lollipop", 14.0, 450.0, RouteShape::Lollipop),
        ]
    }

    /// The ladder to walk for this pattern.  An absent (or empty) override
    /// falls back to the engine-wide ladder.
    pub fn ladder<'a>(&'a self, engine_ladder: &'a [f64]) -> &'a [f64] {
        match self.tolerance_ladder_percent.as_deref() {
            Some(ladder) if !ladder.is_empty() => ladder,
            _ => engine_ladder,
        }
    }
}

// ── Acceptance & scoring ──────────────────────────────────────────────────────

/// Acceptance window half-width for a target at a ladder level.
#[inline]
pub fn window(target: f64, pct: f64) -> f64 {
    target * pct / 100.0
}

/// Does `actual` fall within the level's window around `target`?
///
/// A zero target admits only a (numerically) zero actual.
pub fn within(actual: f64, target: f64, pct: f64) -> bool {
    if target > 0.0 {
        (actual - target).abs() <= window(target, pct)
    } else {
        actual.abs() <= 1e-9
    }
}

/// Sub-score for one dimension: 1.0 at an exact match, linearly decaying
/// to 0.0 at the edge of the accepting level's window.
pub fn sub_score(actual: f64, target: f64, pct: f64) -> f64 {
    if target <= 0.0 {
        return if actual.abs() <= 1e-9 { 1.0 } else { 0.0 };
    }
    (1.0 - (actual - target).abs() / window(target, pct)).max(0.0)
}

/// Combined route score in [0, 1]: the mean of the distance and elevation
/// sub-scores at the tolerance level under which the route was accepted.
pub fn route_score(
    actual_km: f64,
    target_km: f64,
    actual_gain_m: f64,
    target_gain_m: f64,
    pct: f64,
) -> f64 {
    (sub_score(actual_km, target_km, pct) + sub_score(actual_gain_m, target_gain_m, pct)) / 2.0
}
