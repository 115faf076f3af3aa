//! The staged pipeline runner.
//!
//! Stages run in a fixed order, each committing its output by value before
//! the next begins:
//!
//! 1. preprocess (L1a)  — clean raw trails
//! 2. split      (L1b)  — segments at true intersections
//! 3. node       (L2a/b) — vertex/edge topology with attributes
//! 4. components (L2c)  — component labels
//! 5. routes     (L3)   — per-pattern search, scoring, dedup
//!
//! Per-stage wall-clock timings and all data-level outcome counters are
//! folded into one [`RunSummary`].  Invariant violations in any stage's
//! output abort with [`PipelineError::Invariant`] — no artifact is
//! produced.

use std::time::Instant;

use tracing::info;

use tr_core::{BBox, CancelToken, CoreError, EngineConfig, RunSummary};
use tr_geom::{GeometryPreprocessor, RawTrail, Segment, Trail, TrailSplitter};
use tr_graph::{ComponentFinder, ComponentSummary, Noder, TrailGraph};
use tr_route::{RoutePattern, RouteRecommendation, RouteSearch, RouteShape};

use crate::error::{PipelineError, PipelineResult};

// ── PipelineArtifacts ─────────────────────────────────────────────────────────

/// Everything the pipeline produces, for external writers to persist.
#[derive(Debug)]
pub struct PipelineArtifacts {
    /// Cleaned trail set (post-L1a).
    pub trails: Vec<Trail>,
    /// Split segment set (post-L1b).
    pub segments: Vec<Segment>,
    /// The routing graph (vertices, edges, attributes, component labels).
    pub graph: TrailGraph,
    pub components: Vec<ComponentSummary>,
    pub routes: Vec<RouteRecommendation>,
    pub summary: RunSummary,
}

impl PipelineArtifacts {
    fn empty() -> Self {
        Self {
            trails:     Vec::new(),
            segments:   Vec::new(),
            graph:      TrailGraph::empty(),
            components: Vec::new(),
            routes:     Vec::new(),
            summary:    RunSummary::default(),
        }
    }

    /// True when processing yielded nothing to persist.
    pub fn is_empty(&self) -> bool {
        self.trails.is_empty() && self.routes.is_empty()
    }
}

// ── Stage flow control ────────────────────────────────────────────────────────

enum StageFlow<T> {
    Done(T),
    Cancelled,
}

/// Split a stage result into normal completion, cooperative cancellation,
/// and fatal error.
fn flow<T, E: Into<PipelineError>>(res: Result<T, E>) -> PipelineResult<StageFlow<T>> {
    match res.map_err(Into::into) {
        Ok(v) => Ok(StageFlow::Done(v)),
        Err(PipelineError::Core(CoreError::Cancelled)) => Ok(StageFlow::Cancelled),
        Err(e) => Err(e),
    }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// The full engine: construct once per run, then call [`run`](Self::run).
pub struct Pipeline<'a> {
    config: &'a EngineConfig,
    region: Option<String>,
    bbox:   Option<BBox>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config, region: None, bbox: None }
    }

    /// Restrict input to one region tag (also used to label routes).
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Restrict input to trails whose bbox intersects `bbox`.
    pub fn with_bbox(mut self, bbox: BBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// Run all stages.  On cancellation the completed portion is returned
    /// with `summary.cancelled` set; callers must not persist it.
    pub fn run(
        &self,
        raw_trails: Vec<RawTrail>,
        patterns: &[RoutePattern],
        cancel: &CancelToken,
    ) -> PipelineResult<PipelineArtifacts> {
        self.config
            .validate()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        let mut artifacts = PipelineArtifacts::empty();
        // Route labels fall back to the first input trail's region when no
        // explicit region filter was given.
        let region_label = self
            .region
            .clone()
            .or_else(|| raw_trails.first().map(|t| t.region.clone()))
            .unwrap_or_default();

        // ── Stage 1: preprocess ───────────────────────────────────────────
        let t0 = Instant::now();
        let pre = GeometryPreprocessor::new(self.config).run(
            raw_trails,
            self.bbox.as_ref(),
            self.region.as_deref(),
            cancel,
        );
        let (trails, pre_report) = match flow(pre)? {
            StageFlow::Done(v) => v,
            StageFlow::Cancelled => return Ok(cancelled(artifacts)),
        };
        artifacts.summary.record_stage("preprocess", t0.elapsed());
        artifacts.summary.invalid_input.absorb(&pre_report.invalid_input);
        info!(
            trails_in = pre_report.trails_in,
            trails_out = pre_report.trails_out,
            passes = pre_report.passes.len(),
            "preprocess done"
        );
        artifacts.trails = trails;

        // ── Stage 2: split ────────────────────────────────────────────────
        let t0 = Instant::now();
        let split = TrailSplitter::new(self.config).run(&artifacts.trails, cancel);
        let (segments, split_report) = match flow(split)? {
            StageFlow::Done(v) => v,
            StageFlow::Cancelled => return Ok(cancelled(artifacts)),
        };
        artifacts.summary.record_stage("split", t0.elapsed());
        artifacts.summary.invalid_input.bump(split_report.pairs_skipped);
        info!(
            segments = split_report.segments_out,
            split_points = split_report.split_points,
            pairs = split_report.candidate_pairs,
            "split done"
        );
        artifacts.segments = segments;

        // ── Stage 3: node ─────────────────────────────────────────────────
        let t0 = Instant::now();
        let noded = Noder::new(self.config).run(&artifacts.segments, cancel);
        let (graph, node_report) = match flow(noded)? {
            StageFlow::Done(v) => v,
            StageFlow::Cancelled => return Ok(cancelled(artifacts)),
        };
        artifacts.summary.record_stage("node", t0.elapsed());
        artifacts.summary.invalid_input.bump(
            node_report.degenerate_dropped
                + node_report.zero_length_dropped
                + node_report.overlong_dropped,
        );
        info!(
            vertices = node_report.vertices_out,
            edges = node_report.edges_out,
            "noding done"
        );
        artifacts.graph = graph;

        // ── Stage 4: components ───────────────────────────────────────────
        let t0 = Instant::now();
        artifacts.components = ComponentFinder::run(&mut artifacts.graph);
        artifacts.summary.record_stage("components", t0.elapsed());
        info!(components = artifacts.components.len(), "components done");

        // ── Stage 5: routes ───────────────────────────────────────────────
        let t0 = Instant::now();
        let searched = RouteSearch::new(&artifacts.graph, self.config, &region_label).run(
            patterns,
            &artifacts.components,
            cancel,
        );
        let outcome = match flow(searched)? {
            StageFlow::Done(v) => v,
            StageFlow::Cancelled => return Ok(cancelled(artifacts)),
        };
        artifacts.summary.record_stage("routes", t0.elapsed());

        for pattern in &outcome.tolerance_exhausted {
            artifacts.summary.tolerance_exhausted.record(pattern.clone());
        }
        artifacts.summary.graph_isolated.bump(outcome.isolated_components);
        artifacts.summary.capacity.bump(outcome.capacity_hits);
        artifacts.summary.trailhead_misses = outcome.trailhead_misses.clone();
        for (pattern, accepted) in &outcome.pattern_counts {
            artifacts.summary.record_pattern(pattern, *accepted);
        }

        // ── Output-contract verification ──────────────────────────────────
        for route in &outcome.routes {
            tr_route::route::validate(route, &artifacts.graph)?;
        }

        // Point-to-point routes are searched (they seed dedup and pattern
        // counts) but only exported when configured.
        artifacts.routes = outcome
            .routes
            .into_iter()
            .filter(|r| {
                r.shape != RouteShape::PointToPoint || self.config.include_p2p_in_output
            })
            .collect();

        info!(routes = artifacts.routes.len(), "pipeline done");
        Ok(artifacts)
    }
}

fn cancelled(mut artifacts: PipelineArtifacts) -> PipelineArtifacts {
    artifacts.summary.cancelled = true;
    artifacts
}
