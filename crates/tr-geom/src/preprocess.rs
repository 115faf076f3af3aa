//! Geometry preprocessing (Layer 1a).
//!
//! Makes every trail geometry individually well-formed before any
//! cross-trail analysis.  Operation is a fixed-point loop of up to
//! `max_passes` passes; each pass runs, in order:
//!
//! 1. flatten MultiLineStrings (line-merge; unmergeable pieces become new
//!    trails named "… (Segment N)")
//! 2. drop invalid geometry (non-finite coordinates)
//! 3. node-split valid-but-not-simple lines at every self-intersection,
//!    discarding pieces shorter than 1 m
//! 4. drop empty geometry
//! 5. drop lines shorter than `min_segment_length_m` (or with < 2 vertices
//!    when no minimum is configured)
//! 6. keep only LineStrings
//! 7. drop exact geometric duplicates, keeping the lowest internal id
//!
//! The loop terminates when a pass produces no net count change or the pass
//! budget is exhausted.  A single malformed input never aborts the batch; a
//! pass that eliminates every trail is fatal.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use tr_core::summary::SampleCounter;
use tr_core::{BBox, CancelToken, CoreError, EngineConfig};

use crate::error::{GeomError, GeomResult};
use crate::polyline::Polyline;
use crate::trail::{ElevationStats, Geometry, RawTrail, Trail, TrailAttributes};

/// Self-split pieces shorter than this are noise and discarded.
const MIN_PIECE_M: f64 = 1.0;

// ── Reports ───────────────────────────────────────────────────────────────────

/// What one pass removed or introduced, per step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PassCounts {
    pub pass:               u32,
    /// Multi-geometries flattened (merged or exploded).
    pub flattened:          u64,
    /// New trails minted by flattening or self-splitting.
    pub pieces_minted:      u64,
    pub invalid_dropped:    u64,
    /// Trails node-split at self-intersections.
    pub self_split:         u64,
    pub empty_dropped:      u64,
    pub short_dropped:      u64,
    pub non_line_dropped:   u64,
    pub duplicates_dropped: u64,
}

impl PassCounts {
    /// True when the pass neither removed nor introduced anything.
    pub fn is_noop(&self) -> bool {
        self.flattened == 0
            && self.pieces_minted == 0
            && self.invalid_dropped == 0
            && self.self_split == 0
            && self.empty_dropped == 0
            && self.short_dropped == 0
            && self.non_line_dropped == 0
            && self.duplicates_dropped == 0
    }
}

/// Preprocessing outcome counters.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PreprocessReport {
    pub trails_in:    usize,
    pub trails_out:   usize,
    /// Inputs excluded by the bbox/region filter (not an error).
    pub filtered_out: u64,
    pub passes:        Vec<PassCounts>,
    pub invalid_input: SampleCounter,
}

// ── Working record ────────────────────────────────────────────────────────────

/// One trail inside the pass loop.  `internal_id` is a dense insertion
/// counter used for deterministic duplicate resolution and id minting.
struct WorkItem {
    internal_id: u64,
    id:          String,
    name:        String,
    region:      String,
    osm_id:      Option<i64>,
    attributes:  TrailAttributes,
    source_tags: BTreeMap<String, String>,
    elevation:   Option<ElevationStats>,
    geometry:    Geometry,
}

impl WorkItem {
    /// Mint a sibling carrying the same attributes but new geometry.
    ///
    /// Piece 1 keeps the parent's id and name; later pieces get a fresh id
    /// and a "(Segment N)" name suffix.  Attribute duplication is
    /// deliberate.
    fn piece(&self, next_internal_id: u64, ordinal: usize, line: Polyline) -> WorkItem {
        let (id, name, internal_id) = if ordinal == 1 {
            (self.id.clone(), self.name.clone(), self.internal_id)
        } else {
            (
                format!("{}-s{}", self.id, ordinal),
                format!("{} (Segment {})", self.name, ordinal),
                next_internal_id,
            )
        };
        WorkItem {
            internal_id,
            id,
            name,
            region:      self.region.clone(),
            osm_id:      self.osm_id,
            attributes:  self.attributes.clone(),
            source_tags: self.source_tags.clone(),
            elevation:   self.elevation,
            geometry:    Geometry::LineString(line),
        }
    }
}

// ── GeometryPreprocessor ──────────────────────────────────────────────────────

/// Layer 1a: the fixed-point geometry cleaning loop.
pub struct GeometryPreprocessor {
    min_segment_length_m: f64,
    max_passes:           u32,
}

impl GeometryPreprocessor {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            min_segment_length_m: config.min_segment_length_m,
            max_passes:           config.max_passes,
        }
    }

    /// Clean `trails`, optionally restricted to a bbox and/or region.
    pub fn run(
        &self,
        trails: Vec<RawTrail>,
        bbox_filter: Option<&BBox>,
        region_filter: Option<&str>,
        cancel: &CancelToken,
    ) -> GeomResult<(Vec<Trail>, PreprocessReport)> {
        let mut report = PreprocessReport {
            trails_in: trails.len(),
            ..Default::default()
        };

        // ── Admission: bbox/region filter + insertion ids ─────────────────
        let mut next_internal_id: u64 = 0;
        let mut items: Vec<WorkItem> = Vec::with_capacity(trails.len());
        for t in trails {
            if let Some(region) = region_filter {
                if t.region != region {
                    report.filtered_out += 1;
                    continue;
                }
            }
            if let Some(filter) = bbox_filter {
                if !trail_bbox(&t.geometry).intersects(filter) {
                    report.filtered_out += 1;
                    continue;
                }
            }
            items.push(WorkItem {
                internal_id: next_internal_id,
                id:          t.id,
                name:        t.name,
                region:      t.region,
                osm_id:      t.osm_id,
                attributes:  t.attributes,
                source_tags: t.source_tags,
                elevation:   t.elevation,
                geometry:    t.geometry,
            });
            next_internal_id += 1;
        }
        let had_input = !items.is_empty();

        // ── Fixed-point loop ──────────────────────────────────────────────
        for pass in 1..=self.max_passes {
            if cancel.is_cancelled() {
                return Err(GeomError::Core(CoreError::Cancelled));
            }
            let before = items.len();
            let counts = self.run_pass(pass, &mut items, &mut next_internal_id, &mut report);
            debug!(pass, before, after = items.len(), "preprocess pass");
            report.passes.push(counts);

            if had_input && items.is_empty() {
                return Err(GeomError::EmptyResult { pass });
            }
            if items.len() == before && counts.is_noop() {
                break;
            }
        }

        // ── Materialise cleaned trails ────────────────────────────────────
        let mut cleaned = Vec::with_capacity(items.len());
        for item in items {
            let Geometry::LineString(line) = item.geometry else {
                // The type filter keeps only LineStrings; anything else here
                // is a pass-loop bug.
                unreachable!("non-LineString survived preprocessing");
            };
            let elevation = item.elevation.unwrap_or_else(|| ElevationStats::of(&line));
            cleaned.push(Trail {
                id:          item.id,
                name:        item.name,
                region:      item.region,
                osm_id:      item.osm_id,
                attributes:  item.attributes,
                source_tags: item.source_tags,
                elevation,
                geometry:    line,
            });
        }
        report.trails_out = cleaned.len();
        Ok((cleaned, report))
    }

    /// One full pass: the seven steps, in order.
    fn run_pass(
        &self,
        pass: u32,
        items: &mut Vec<WorkItem>,
        next_internal_id: &mut u64,
        report: &mut PreprocessReport,
    ) -> PassCounts {
        let mut c = PassCounts { pass, ..Default::default() };

        // ── Step 1: flatten complex geometries ────────────────────────────
        let mut flat: Vec<WorkItem> = Vec::with_capacity(items.len());
        for mut item in items.drain(..) {
            let geometry = std::mem::replace(
                &mut item.geometry,
                Geometry::LineString(Polyline::new(vec![])),
            );
            match geometry {
                Geometry::LineString(line) => {
                    item.geometry = Geometry::LineString(line);
                    flat.push(item);
                }
                Geometry::MultiLineString(parts) => {
                    c.flattened += 1;
                    let merged = line_merge(parts);
                    if merged.is_empty() {
                        // Leaves an empty line for step 4 to account for.
                        flat.push(item);
                        continue;
                    }
                    c.pieces_minted += merged.len() as u64 - 1;
                    for (ordinal, line) in merged.into_iter().enumerate() {
                        let piece = item.piece(*next_internal_id, ordinal + 1, line);
                        if ordinal > 0 {
                            *next_internal_id += 1;
                        }
                        flat.push(piece);
                    }
                }
            }
        }
        *items = flat;

        // ── Step 2: drop invalid (non-finite) geometry ────────────────────
        items.retain_mut(|item| {
            let Geometry::LineString(line) = &mut item.geometry else {
                return true;
            };
            *line = line.dedup_consecutive();
            if line.is_finite() {
                true
            } else {
                c.invalid_dropped += 1;
                report.invalid_input.record(item.id.clone());
                false
            }
        });

        // ── Step 3: node-split self-intersecting lines ────────────────────
        let mut noded: Vec<WorkItem> = Vec::with_capacity(items.len());
        for item in items.drain(..) {
            let Geometry::LineString(line) = &item.geometry else {
                noded.push(item);
                continue;
            };
            if line.point_count() < 2 || line.is_simple() {
                noded.push(item);
                continue;
            }
            c.self_split += 1;
            let cuts = line.self_intersection_chainages();
            let pieces: Vec<Polyline> = line
                .split_at_chainages(&cuts)
                .into_iter()
                .filter(|p| p.length_m() >= MIN_PIECE_M)
                .collect();
            if pieces.is_empty() {
                c.empty_dropped += 1;
                continue;
            }
            c.pieces_minted += pieces.len() as u64 - 1;
            for (ordinal, piece_line) in pieces.into_iter().enumerate() {
                let piece = item.piece(*next_internal_id, ordinal + 1, piece_line);
                if ordinal > 0 {
                    *next_internal_id += 1;
                }
                noded.push(piece);
            }
        }
        *items = noded;

        // ── Step 4: drop empty geometry ───────────────────────────────────
        items.retain(|item| {
            let Geometry::LineString(line) = &item.geometry else {
                return true;
            };
            if line.is_empty() {
                c.empty_dropped += 1;
                false
            } else {
                true
            }
        });

        // ── Step 5: length / point-count filter ───────────────────────────
        items.retain(|item| {
            let Geometry::LineString(line) = &item.geometry else {
                return true;
            };
            let keep = if self.min_segment_length_m > 0.0 {
                line.point_count() >= 2 && line.length_m() >= self.min_segment_length_m
            } else {
                line.point_count() >= 2
            };
            if !keep {
                c.short_dropped += 1;
            }
            keep
        });

        // ── Step 6: type filter ───────────────────────────────────────────
        items.retain(|item| {
            if matches!(item.geometry, Geometry::LineString(_)) {
                true
            } else {
                c.non_line_dropped += 1;
                false
            }
        });

        // ── Step 7: exact-duplicate removal ───────────────────────────────
        // ST_Equals treats a line and its reverse as equal, so the key is
        // the lexicographically smaller of the two orientations.  Insertion
        // order is ascending internal_id, so "first wins" keeps the lowest.
        let mut seen: std::collections::HashSet<Vec<(u64, u64, u64)>> =
            std::collections::HashSet::with_capacity(items.len());
        items.sort_by_key(|i| i.internal_id);
        items.retain(|item| {
            let Geometry::LineString(line) = &item.geometry else {
                return true;
            };
            if seen.insert(canonical_key(line)) {
                true
            } else {
                c.duplicates_dropped += 1;
                false
            }
        });

        c
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn trail_bbox(geometry: &Geometry) -> BBox {
    match geometry {
        Geometry::LineString(l) => l.bbox(),
        Geometry::MultiLineString(parts) => {
            let mut b = BBox::empty();
            for part in parts {
                b.merge(&part.bbox());
            }
            b
        }
    }
}

/// Orientation-independent exact geometry key (coordinate bit patterns).
fn canonical_key(line: &Polyline) -> Vec<(u64, u64, u64)> {
    let fwd: Vec<(u64, u64, u64)> = line
        .points
        .iter()
        .map(|p| (p.lng.to_bits(), p.lat.to_bits(), p.elev.to_bits()))
        .collect();
    let mut rev = fwd.clone();
    rev.reverse();
    fwd.min(rev)
}

/// Greedy endpoint-joining merge of line pieces.
///
/// Pieces whose endpoints coincide exactly (2D) are chained, reversing as
/// needed; pieces that connect to nothing come back as separate lines.
/// Deterministic: pieces are consumed in input order.
fn line_merge(parts: Vec<Polyline>) -> Vec<Polyline> {
    // Homogenize: drop degenerate parts up front.
    let mut pool: Vec<Polyline> = parts
        .into_iter()
        .map(|p| p.dedup_consecutive())
        .filter(|p| p.point_count() >= 2)
        .collect();

    let mut merged: Vec<Polyline> = Vec::with_capacity(pool.len());
    while !pool.is_empty() {
        let mut chain = pool.remove(0);
        loop {
            let chain_start = chain.points[0];
            let chain_end = chain.points[chain.points.len() - 1];
            let next = pool.iter().position(|p| {
                let s = p.points[0];
                let e = p.points[p.points.len() - 1];
                s.same_xy(chain_end)
                    || e.same_xy(chain_end)
                    || s.same_xy(chain_start)
                    || e.same_xy(chain_start)
            });
            let Some(idx) = next else { break };
            let part = pool.remove(idx);
            chain = join(chain, part);
        }
        merged.push(chain);
    }
    merged
}

/// Join two polylines that share at least one endpoint.
fn join(chain: Polyline, part: Polyline) -> Polyline {
    let cs = chain.points[0];
    let ce = chain.points[chain.points.len() - 1];
    let ps = part.points[0];
    let pe = part.points[part.points.len() - 1];

    let (mut left, right) = if ps.same_xy(ce) {
        (chain.points, part.points)
    } else if pe.same_xy(ce) {
        let mut r = part.points;
        r.reverse();
        (chain.points, r)
    } else if pe.same_xy(cs) {
        (part.points, chain.points)
    } else {
        // ps == cs: reverse the part so it leads into the chain.
        let mut l = part.points;
        l.reverse();
        (l, chain.points)
    };
    left.extend(right.into_iter().skip(1));
    Polyline::new(left)
}
