//! Engine configuration.
//!
//! Typically loaded from a JSON file by the CLI and passed to the pipeline.
//! Every field has a serde default, so a partial (or empty) config file is
//! valid; [`EngineConfig::validate`] catches self-contradictions up front —
//! a validation failure is fatal and aborts the run before any stage starts.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

// ── Endpoint selection mode ───────────────────────────────────────────────────

/// How route start/end candidates are chosen per component.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointSelection {
    /// User-supplied trailhead coordinates, snapped to the nearest vertex.
    Manual,
    /// Degree-1 vertices nearest the component's geographic boundary.
    Automatic,
}

// ── Trailhead ─────────────────────────────────────────────────────────────────

/// A manually specified trailhead, snapped to the nearest graph vertex
/// within `tolerance_m`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrailheadSpec {
    #[serde(default)]
    pub name: Option<String>,
    pub lat:  f64,
    pub lng:  f64,
    #[serde(default = "default_trailhead_tolerance_m")]
    pub tolerance_m: f64,
}

fn default_trailhead_tolerance_m() -> f64 {
    50.0
}

// ── Lollipop sub-config ───────────────────────────────────────────────────────

/// Caps and thresholds for the lollipop (stem + loop) composition search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LollipopConfig {
    /// Anchor vertices tried per component.
    pub max_anchor_nodes: usize,
    /// Reachable-vertex cap for the outbound Dijkstra scan per anchor.
    pub max_reachable_nodes: usize,
    /// Candidate destinations explored per anchor.
    pub max_destination_exploration: usize,
    /// Discard composites whose |E(stem) ∩ E(loop)| / |E(stem)| exceeds this.
    pub edge_overlap_threshold: f64,
    /// K for the destination → anchor K-shortest-paths call.
    pub ksp_paths: usize,
    /// Minimum stem length in km.
    pub min_outbound_km: f64,
    /// Optional hard (min, max) window on composite length, km.
    pub distance_range_km: Option<(f64, f64)>,
    /// Composites retained (by length within the target range) per pattern.
    pub max_routes_to_keep: usize,
}

impl Default for LollipopConfig {
    fn default() -> Self {
        Self {
            max_anchor_nodes:            50,
            max_reachable_nodes:         500,
            max_destination_exploration: 50,
            edge_overlap_threshold:      0.25,
            ksp_paths:                   8,
            min_outbound_km:             1.0,
            distance_range_km:           None,
            max_routes_to_keep:          100,
        }
    }
}

// ── EngineConfig ──────────────────────────────────────────────────────────────

/// Top-level configuration for the full pipeline.  Defaults in brackets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Drop cleaned geometries shorter than this.  0 disables the filter
    /// (geometries with fewer than 2 vertices are still dropped).  [0]
    pub min_segment_length_m: f64,

    /// Endpoints within this distance collapse to one vertex.  [0.1]
    pub topology_tolerance_m: f64,

    /// Linework crossings within this distance are one split point.  [2.0]
    pub intersection_tolerance_m: f64,

    /// Edges longer than this are dropped as grossly broken input.  [50.0]
    pub max_edge_length_km: f64,

    /// Route search ignores edges longer than this, so giant connectors
    /// cannot dominate shortest paths.  [2.0]
    pub max_single_edge_km: f64,

    /// Upper bound on preprocessing fixed-point passes.  [5]
    pub max_passes: u32,

    /// Endpoint selection mode.  [automatic]
    pub endpoint_selection: EndpointSelection,

    /// Manual trailheads (used when `endpoint_selection` is `manual`).
    pub trailheads: Vec<TrailheadSpec>,

    /// Cap on automatic endpoints per component.  [50]
    pub max_endpoints_per_component: usize,

    /// Accepted routes per pattern before moving on.  [10]
    pub target_routes_per_pattern: usize,

    /// Tolerance ladder, percent.  Tried in order.  [[10, 20, 35, 50]]
    pub tolerance_ladder_percent: Vec<f64>,

    /// K for out-and-back K-shortest-paths.  [10]
    pub ksp_k: usize,

    /// Row cap for simple-cycle enumeration.  [100_000]
    pub hawick_max_rows: usize,

    /// Lollipop composition caps.
    pub lollipop: LollipopConfig,

    /// Routes with trail-set Jaccard similarity above this vs. an accepted
    /// route are dropped.  [0.5]
    pub dedup_threshold_jaccard: f64,

    /// Components with fewer vertices are skipped by route generation.  [2]
    pub component_min_nodes: usize,

    /// Include point-to-point routes in the output artifact.  [false]
    pub include_p2p_in_output: bool,

    /// Loop acceptance skips the elevation window (historical parity).  [false]
    pub loop_ignore_elevation: bool,

    pub generate_loop:           bool,
    pub generate_out_and_back:   bool,
    pub generate_point_to_point: bool,
    pub generate_lollipop:       bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_segment_length_m:        0.0,
            topology_tolerance_m:        0.1,
            intersection_tolerance_m:    2.0,
            max_edge_length_km:          50.0,
            max_single_edge_km:          2.0,
            max_passes:                  5,
            endpoint_selection:          EndpointSelection::Automatic,
            trailheads:                  Vec::new(),
            max_endpoints_per_component: 50,
            target_routes_per_pattern:   10,
            tolerance_ladder_percent:    vec![10.0, 20.0, 35.0, 50.0],
            ksp_k:                       10,
            hawick_max_rows:             100_000,
            lollipop:                    LollipopConfig::default(),
            dedup_threshold_jaccard:     0.5,
            component_min_nodes:         2,
            include_p2p_in_output:       false,
            loop_ignore_elevation:       false,
            generate_loop:               true,
            generate_out_and_back:       true,
            generate_point_to_point:     true,
            generate_lollipop:           true,
        }
    }
}

impl EngineConfig {
    /// Check for self-contradictory settings.
    ///
    /// Called once by the pipeline before stage 1; a failure here is fatal.
    pub fn validate(&self) -> CoreResult<()> {
        fn bad(msg: String) -> CoreResult<()> {
            Err(CoreError::Config(msg))
        }

        if self.min_segment_length_m < 0.0 {
            return bad(format!("min_segment_length_m must be >= 0, got {}", self.min_segment_length_m));
        }
        if self.topology_tolerance_m < 0.0 {
            return bad(format!("topology_tolerance_m must be >= 0, got {}", self.topology_tolerance_m));
        }
        if self.intersection_tolerance_m < 0.0 {
            return bad(format!("intersection_tolerance_m must be >= 0, got {}", self.intersection_tolerance_m));
        }
        if self.max_edge_length_km <= 0.0 {
            return bad(format!("max_edge_length_km must be > 0, got {}", self.max_edge_length_km));
        }
        if self.max_single_edge_km <= 0.0 {
            return bad(format!("max_single_edge_km must be > 0, got {}", self.max_single_edge_km));
        }
        if self.max_passes == 0 {
            return bad("max_passes must be >= 1".into());
        }
        if self.tolerance_ladder_percent.is_empty() {
            return bad("tolerance_ladder_percent must not be empty".into());
        }
        if self.tolerance_ladder_percent.windows(2).any(|w| w[1] <= w[0]) {
            return bad("tolerance_ladder_percent must be strictly ascending".into());
        }
        if self.tolerance_ladder_percent.iter().any(|&p| p <= 0.0) {
            return bad("tolerance levels must be positive percentages".into());
        }
        if self.endpoint_selection == EndpointSelection::Manual && self.trailheads.is_empty() {
            return bad("endpoint_selection is manual but no trailheads were given".into());
        }
        if !(0.0..=1.0).contains(&self.dedup_threshold_jaccard) {
            return bad(format!("dedup_threshold_jaccard must be in [0, 1], got {}", self.dedup_threshold_jaccard));
        }
        if !(0.0..=1.0).contains(&self.lollipop.edge_overlap_threshold) {
            return bad(format!("lollipop.edge_overlap_threshold must be in [0, 1], got {}", self.lollipop.edge_overlap_threshold));
        }
        if let Some((lo, hi)) = self.lollipop.distance_range_km {
            if lo < 0.0 || hi < lo {
                return bad(format!("lollipop.distance_range_km ({lo}, {hi}) is not a valid window"));
            }
        }
        if self.ksp_k == 0 || self.lollipop.ksp_paths == 0 {
            return bad("ksp_k and lollipop.ksp_paths must be >= 1".into());
        }
        Ok(())
    }

    /// Apply a `dotted.path=value` override (CLI `--set`).
    ///
    /// Only scalar fields are addressable; lists and trailheads must come
    /// from the config file.
    pub fn set_by_path(&mut self, path: &str, value: &str) -> CoreResult<()> {
        fn parse<T: std::str::FromStr>(path: &str, value: &str) -> CoreResult<T> {
            value.parse().map_err(|_| {
                CoreError::Config(format!("invalid value {value:?} for {path}"))
            })
        }

        match path {
            "min_segment_length_m"     => self.min_segment_length_m = parse(path, value)?,
            "topology_tolerance_m"     => self.topology_tolerance_m = parse(path, value)?,
            "intersection_tolerance_m" => self.intersection_tolerance_m = parse(path, value)?,
            "max_edge_length_km"       => self.max_edge_length_km = parse(path, value)?,
            "max_single_edge_km"       => self.max_single_edge_km = parse(path, value)?,
            "max_passes"               => self.max_passes = parse(path, value)?,
            "endpoint_selection" => {
                self.endpoint_selection = match value {
                    "manual"    => EndpointSelection::Manual,
                    "automatic" => EndpointSelection::Automatic,
                    _ => {
                        return Err(CoreError::Config(format!(
                            "invalid endpoint_selection {value:?}: expected \"manual\" or \"automatic\""
                        )));
                    }
                }
            }
            "max_endpoints_per_component" => self.max_endpoints_per_component = parse(path, value)?,
            "target_routes_per_pattern"   => self.target_routes_per_pattern = parse(path, value)?,
            "ksp_k"                       => self.ksp_k = parse(path, value)?,
            "hawick_max_rows"             => self.hawick_max_rows = parse(path, value)?,
            "dedup_threshold_jaccard"     => self.dedup_threshold_jaccard = parse(path, value)?,
            "component_min_nodes"         => self.component_min_nodes = parse(path, value)?,
            "include_p2p_in_output"       => self.include_p2p_in_output = parse(path, value)?,
            "loop_ignore_elevation"       => self.loop_ignore_elevation = parse(path, value)?,
            "generate_loop"               => self.generate_loop = parse(path, value)?,
            "generate_out_and_back"       => self.generate_out_and_back = parse(path, value)?,
            "generate_point_to_point"     => self.generate_point_to_point = parse(path, value)?,
            "generate_lollipop"           => self.generate_lollipop = parse(path, value)?,
            "lollipop.max_anchor_nodes"   => self.lollipop.max_anchor_nodes = parse(path, value)?,
            "lollipop.max_reachable_nodes" => self.lollipop.max_reachable_nodes = parse(path, value)?,
            "lollipop.max_destination_exploration" => {
                self.lollipop.max_destination_exploration = parse(path, value)?
            }
            "lollipop.edge_overlap_threshold" => self.lollipop.edge_overlap_threshold = parse(path, value)?,
            "lollipop.ksp_paths"          => self.lollipop.ksp_paths = parse(path, value)?,
            "lollipop.min_outbound_km"    => self.lollipop.min_outbound_km = parse(path, value)?,
            "lollipop.max_routes_to_keep" => self.lollipop.max_routes_to_keep = parse(path, value)?,
            _ => {
                return Err(CoreError::Config(format!("unknown config path {path:?}")));
            }
        }
        Ok(())
    }
}
