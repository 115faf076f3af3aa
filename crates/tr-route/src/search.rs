//! Route search (Layer 3b): per-pattern candidate generation, the
//! tolerance ladder, acceptance filtering, scoring, and dedup.
//!
//! # Shape of the search
//!
//! Candidates are generated once per (pattern, component) with the
//! shape-specific algorithm, in a deterministic order; the tolerance
//! ladder then walks its levels over that candidate list, accepting until
//! `target_routes_per_pattern` is reached.  Scores are computed at the
//! level under which a route was accepted.
//!
//! # Parallelism
//!
//! The lollipop search fans out per anchor on the Rayon pool; results are
//! collected in anchor order before any acceptance decision, so the
//! outcome is independent of scheduling.

use rayon::prelude::*;
use rustc_hash::FxHashSet;
use tracing::{debug, info};

use tr_core::{CancelToken, CoreError, EngineConfig, VertexId};
use tr_graph::{ComponentSummary, TrailGraph};

use crate::cycles::CycleEnumerator;
use crate::dedup::RouteDeduper;
use crate::dijkstra::{Dijkstra, GraphPath};
use crate::endpoints::EndpointSelector;
use crate::error::{RouteError, RouteResult};
use crate::ksp::k_shortest_paths;
use crate::pattern::{RoutePattern, RouteShape, route_score, within};
use crate::route::{RouteRecommendation, trail_name_set};

// ── SearchOutcome ─────────────────────────────────────────────────────────────

/// Everything Layer 3b hands back: routes plus data-level outcome counts.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    pub routes: Vec<RouteRecommendation>,
    /// Patterns that accepted nothing even at the loosest level.
    pub tolerance_exhausted: Vec<String>,
    /// Components skipped for having too few vertices or endpoints.
    pub isolated_components: u64,
    /// Hard caps hit (cycle rows); partial results were still used.
    pub capacity_hits: u64,
    /// Manual trailheads with no vertex within tolerance.
    pub trailhead_misses: Vec<String>,
    /// Accepted route count per pattern, in pattern order.
    pub pattern_counts: Vec<(String, usize)>,
}

// ── Candidate ─────────────────────────────────────────────────────────────────

/// A generated route candidate, before ladder acceptance.
struct Candidate {
    path:        GraphPath,
    realized_km: f64,
    gain_m:      f64,
    loss_m:      f64,
}

// ── RouteSearch ───────────────────────────────────────────────────────────────

/// Layer 3b entry point, bound to one graph and configuration.
pub struct RouteSearch<'a> {
    graph:  &'a TrailGraph,
    config: &'a EngineConfig,
    region: &'a str,
}

impl<'a> RouteSearch<'a> {
    pub fn new(graph: &'a TrailGraph, config: &'a EngineConfig, region: &'a str) -> Self {
        Self { graph, config, region }
    }

    /// Generate recommendations for every enabled pattern over every
    /// eligible component.
    pub fn run(
        &self,
        patterns: &[RoutePattern],
        components: &[ComponentSummary],
        cancel: &CancelToken,
    ) -> RouteResult<SearchOutcome> {
        let mut outcome = SearchOutcome::default();
        let dij = Dijkstra::new(self.graph, self.config.max_single_edge_km);
        let selector = EndpointSelector::new(self.graph, self.config);

        // ── Component gating + endpoint selection (once, reused) ──────────
        // Components below the vertex floor are skipped outright; a
        // component with no endpoints is still eligible for loop search
        // (cycles need no start/end candidates) but counts as isolated for
        // the endpoint-anchored shapes.
        let mut eligible: Vec<(&ComponentSummary, Vec<VertexId>, Vec<VertexId>)> = Vec::new();
        for summary in components {
            if summary.vertex_count < self.config.component_min_nodes {
                outcome.isolated_components += 1;
                continue;
            }
            let set = selector.select(summary.id, summary);
            outcome.trailhead_misses.extend(set.misses.iter().cloned());
            if set.vertices.is_empty() {
                outcome.isolated_components += 1;
            }
            let members = tr_graph::ComponentFinder::members(self.graph, summary.id);
            eligible.push((summary, set.vertices, members));
        }

        // ── Pattern loop ──────────────────────────────────────────────────
        for pattern in patterns {
            if !self.shape_enabled(pattern.shape) {
                continue;
            }
            if cancel.is_cancelled() {
                return Err(RouteError::Core(CoreError::Cancelled));
            }

            let ladder = pattern.ladder(&self.config.tolerance_ladder_percent);
            // Config validation guarantees a non-empty engine ladder.
            let Some(&loosest) = ladder.last() else { continue };

            // Generate candidates across all eligible components, in
            // component order.
            let mut candidates: Vec<Candidate> = Vec::new();
            for (summary, endpoints, members) in &eligible {
                if cancel.is_cancelled() {
                    return Err(RouteError::Core(CoreError::Cancelled));
                }
                let mut from_component = match pattern.shape {
                    RouteShape::PointToPoint => self.p2p_candidates(&dij, endpoints, cancel),
                    RouteShape::OutAndBack => self.oab_candidates(&dij, endpoints, pattern, cancel),
                    RouteShape::Loop => {
                        self.loop_candidates(members, pattern, loosest, cancel, &mut outcome)
                    }
                    RouteShape::Lollipop => {
                        self.lollipop_candidates(&dij, endpoints, pattern, loosest, cancel)
                    }
                };
                debug!(
                    pattern = %pattern.name,
                    component = %summary.id,
                    candidates = from_component.len(),
                    "candidates generated"
                );
                candidates.append(&mut from_component);
            }

            // ── Tolerance ladder over the candidate list ──────────────────
            let mut deduper = RouteDeduper::new(self.config.dedup_threshold_jaccard);
            let mut taken: FxHashSet<usize> = FxHashSet::default();
            let mut accepted: Vec<RouteRecommendation> = Vec::new();

            'ladder: for &pct in ladder {
                for (idx, cand) in candidates.iter().enumerate() {
                    if accepted.len() >= self.config.target_routes_per_pattern {
                        break 'ladder;
                    }
                    if taken.contains(&idx) || !self.accepts(pattern, cand, pct) {
                        continue;
                    }
                    let names = trail_name_set(self.graph, &cand.path.edges);
                    let Some(similarity) = deduper.admit(&names) else {
                        continue;
                    };
                    taken.insert(idx);
                    let score = route_score(
                        cand.realized_km,
                        pattern.target_distance_km,
                        cand.gain_m,
                        pattern.target_elevation_gain_m,
                        pct,
                    );
                    accepted.push(RouteRecommendation::from_path(
                        self.graph,
                        pattern,
                        self.region,
                        &cand.path,
                        cand.realized_km,
                        cand.gain_m,
                        cand.loss_m,
                        score,
                        similarity,
                    ));
                }
            }

            info!(pattern = %pattern.name, accepted = accepted.len(), "pattern done");
            if accepted.is_empty() {
                outcome.tolerance_exhausted.push(pattern.name.clone());
            }
            outcome.pattern_counts.push((pattern.name.clone(), accepted.len()));
            outcome.routes.extend(accepted);
        }

        Ok(outcome)
    }

    fn shape_enabled(&self, shape: RouteShape) -> bool {
        match shape {
            RouteShape::Loop         => self.config.generate_loop,
            RouteShape::OutAndBack   => self.config.generate_out_and_back,
            RouteShape::PointToPoint => self.config.generate_point_to_point,
            RouteShape::Lollipop     => self.config.generate_lollipop,
        }
    }

    // ── Acceptance filter ─────────────────────────────────────────────────

    fn accepts(&self, pattern: &RoutePattern, cand: &Candidate, pct: f64) -> bool {
        let edge_count = match pattern.shape {
            // The doubled traversal is what the user walks.
            RouteShape::OutAndBack => cand.path.edge_count() * 2,
            _ => cand.path.edge_count(),
        };
        if edge_count < pattern.shape.min_edges() {
            return false;
        }
        if !within(cand.realized_km, pattern.target_distance_km, pct) {
            return false;
        }
        if pattern.shape == RouteShape::Loop && self.config.loop_ignore_elevation {
            return true;
        }
        within(cand.gain_m, pattern.target_elevation_gain_m, pct)
    }

    // ── Point-to-point ────────────────────────────────────────────────────

    /// Dijkstra between every ordered pair of distinct endpoints.
    fn p2p_candidates(
        &self,
        dij: &Dijkstra<'_>,
        endpoints: &[VertexId],
        cancel: &CancelToken,
    ) -> Vec<Candidate> {
        let mut out = Vec::new();
        for &a in endpoints {
            if cancel.is_cancelled() {
                return out;
            }
            for &b in endpoints {
                if a == b {
                    continue;
                }
                let Some(path) = dij.shortest_path(a, b) else { continue };
                if path.edges.is_empty() {
                    continue;
                }
                out.push(Candidate {
                    realized_km: path.length_km,
                    gain_m:      path.gain_m(self.graph),
                    loss_m:      path.loss_m(self.graph),
                    path,
                });
            }
        }
        out
    }

    // ── Out-and-back ──────────────────────────────────────────────────────

    /// K-shortest forward paths between endpoint pairs whose straight-line
    /// distance permits an out-and-back near the target length.
    fn oab_candidates(
        &self,
        dij: &Dijkstra<'_>,
        endpoints: &[VertexId],
        pattern: &RoutePattern,
        cancel: &CancelToken,
    ) -> Vec<Candidate> {
        let prune_km = 0.7 * pattern.target_distance_km;
        let mut out = Vec::new();
        for (i, &a) in endpoints.iter().enumerate() {
            if cancel.is_cancelled() {
                return out;
            }
            for &b in &endpoints[i + 1..] {
                let crow_km = self.graph.vertex_pos[a.index()]
                    .distance_km(self.graph.vertex_pos[b.index()]);
                if crow_km > prune_km {
                    continue;
                }
                for path in k_shortest_paths(dij, a, b, self.config.ksp_k) {
                    if path.edges.is_empty() {
                        continue;
                    }
                    // The return leg mirrors the forward leg: its gain is
                    // the forward loss.
                    let gain = path.gain_m(self.graph);
                    let loss = path.loss_m(self.graph);
                    out.push(Candidate {
                        realized_km: 2.0 * path.length_km,
                        gain_m:      gain + loss,
                        loss_m:      gain + loss,
                        path,
                    });
                }
            }
        }
        out
    }

    // ── Loop ──────────────────────────────────────────────────────────────

    /// Bounded simple-cycle enumeration over the component.
    fn loop_candidates(
        &self,
        members: &[VertexId],
        pattern: &RoutePattern,
        loosest_pct: f64,
        cancel: &CancelToken,
        outcome: &mut SearchOutcome,
    ) -> Vec<Candidate> {
        let max_len = pattern.target_distance_km * (1.0 + loosest_pct / 100.0);
        let enumerator = CycleEnumerator::new(
            self.graph,
            self.config.max_single_edge_km,
            max_len,
            self.config.hawick_max_rows,
        );
        let cycles = enumerator.enumerate(members, cancel);
        if cycles.hit_row_cap {
            outcome.capacity_hits += 1;
        }
        cycles
            .cycles
            .into_iter()
            .map(|path| Candidate {
                realized_km: path.length_km,
                gain_m:      path.gain_m(self.graph),
                loss_m:      path.loss_m(self.graph),
                path,
            })
            .collect()
    }

    // ── Lollipop ──────────────────────────────────────────────────────────

    /// Stem + loop composition: per anchor, scan for destinations at
    /// stem-appropriate distance, then KSP back to the anchor for return
    /// legs that diverge from the stem.
    fn lollipop_candidates(
        &self,
        dij: &Dijkstra<'_>,
        endpoints: &[VertexId],
        pattern: &RoutePattern,
        loosest_pct: f64,
        cancel: &CancelToken,
    ) -> Vec<Candidate> {
        let lp = &self.config.lollipop;
        let anchors: Vec<VertexId> = endpoints.iter().copied().take(lp.max_anchor_nodes).collect();

        // Per-anchor search on the Rayon pool; anchor order is preserved by
        // the ordered collect, so the merged list is deterministic.
        let per_anchor: Vec<Vec<Candidate>> = anchors
            .par_iter()
            .map(|&anchor| {
                if cancel.is_cancelled() {
                    return Vec::new();
                }
                self.explore_anchor(dij, anchor, pattern)
            })
            .collect();

        let mut out: Vec<Candidate> = per_anchor.into_iter().flatten().collect();

        // Window to the configured range (or the loosest ladder level),
        // then keep the top `max_routes_to_keep` by length.
        let (lo, hi) = lp.distance_range_km.unwrap_or((
            pattern.target_distance_km * (1.0 - loosest_pct / 100.0),
            pattern.target_distance_km * (1.0 + loosest_pct / 100.0),
        ));
        out.retain(|c| c.realized_km >= lo && c.realized_km <= hi);
        out.sort_by(|a, b| {
            b.realized_km
                .total_cmp(&a.realized_km)
                .then_with(|| a.path.edges.cmp(&b.path.edges))
        });
        out.truncate(lp.max_routes_to_keep);
        out
    }

    fn explore_anchor(
        &self,
        dij: &Dijkstra<'_>,
        anchor: VertexId,
        pattern: &RoutePattern,
    ) -> Vec<Candidate> {
        let lp = &self.config.lollipop;
        let reachable = dij.reachable_within(
            anchor,
            lp.min_outbound_km,
            pattern.target_distance_km / 2.0,
            lp.max_reachable_nodes,
        );

        let mut out = Vec::new();
        for &(dest, _dist) in reachable.iter().take(lp.max_destination_exploration) {
            let Some(stem) = dij.shortest_path(anchor, dest) else { continue };
            if stem.edges.is_empty() {
                continue;
            }
            let stem_edges: FxHashSet<_> = stem.edges.iter().copied().collect();

            for ret in k_shortest_paths(dij, dest, anchor, lp.ksp_paths) {
                if ret.edges.is_empty() {
                    continue;
                }
                let overlap = ret.edges.iter().filter(|e| stem_edges.contains(e)).count();
                let ratio = overlap as f64 / stem.edges.len() as f64;
                if ratio > lp.edge_overlap_threshold {
                    continue;
                }
                let composite = stem.join(&ret);
                out.push(Candidate {
                    realized_km: composite.length_km,
                    gain_m:      composite.gain_m(self.graph),
                    loss_m:      composite.loss_m(self.graph),
                    path:        composite,
                });
            }
        }
        out
    }
}
