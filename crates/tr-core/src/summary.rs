//! Run summary — the structured report returned alongside successful output.
//!
//! Data-level problems never abort the batch; they are counted here, with up
//! to [`SampleCounter::SAMPLE_CAP`] offending record ids kept per kind so a
//! user can inspect representatives without the summary growing unbounded.

use serde::Serialize;

// ── SampleCounter ─────────────────────────────────────────────────────────────

/// A drop/skip counter with a capped list of sample record ids.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SampleCounter {
    pub count:   u64,
    pub samples: Vec<String>,
}

impl SampleCounter {
    /// Sample ids retained per counter.
    pub const SAMPLE_CAP: usize = 20;

    /// Count one occurrence, keeping the id if the sample list has room.
    pub fn record(&mut self, id: impl Into<String>) {
        self.count += 1;
        if self.samples.len() < Self::SAMPLE_CAP {
            self.samples.push(id.into());
        }
    }

    /// Count occurrences that have no meaningful record id.
    pub fn bump(&mut self, n: u64) {
        self.count += n;
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Fold another counter into this one, respecting the sample cap.
    pub fn absorb(&mut self, other: &SampleCounter) {
        self.count += other.count;
        for s in &other.samples {
            if self.samples.len() >= Self::SAMPLE_CAP {
                break;
            }
            self.samples.push(s.clone());
        }
    }
}

// ── StageTiming ───────────────────────────────────────────────────────────────

/// Wall-clock duration of one pipeline stage.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StageTiming {
    pub stage:  String,
    pub millis: u64,
}

// ── PatternRouteCount ─────────────────────────────────────────────────────────

/// Accepted routes per pattern.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PatternRouteCount {
    pub pattern:  String,
    pub accepted: usize,
}

// ── RunSummary ────────────────────────────────────────────────────────────────

/// Aggregated per-run report: counts per error kind, per-stage timings, and
/// per-pattern route counts.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunSummary {
    /// Records dropped for missing fields, bad geometry, non-finite coords.
    pub invalid_input: SampleCounter,
    /// Patterns that yielded nothing even at the loosest tolerance level.
    pub tolerance_exhausted: SampleCounter,
    /// Components skipped for having too few vertices or endpoints.
    pub graph_isolated: SampleCounter,
    /// Hard caps hit (cycle rows, KSP, anchors); partial results were used.
    pub capacity: SampleCounter,
    /// The run was cancelled; outputs are partial and were not persisted.
    pub cancelled: bool,
    /// Manual trailheads with no graph vertex within tolerance.
    pub trailhead_misses: Vec<String>,

    pub stage_timings:  Vec<StageTiming>,
    pub pattern_routes: Vec<PatternRouteCount>,
}

impl RunSummary {
    pub fn record_stage(&mut self, stage: &str, elapsed: std::time::Duration) {
        self.stage_timings.push(StageTiming {
            stage:  stage.to_owned(),
            millis: elapsed.as_millis() as u64,
        });
    }

    pub fn record_pattern(&mut self, pattern: &str, accepted: usize) {
        self.pattern_routes.push(PatternRouteCount {
            pattern:  pattern.to_owned(),
            accepted,
        });
    }

    /// Total data-level drops across all kinds.
    pub fn total_dropped(&self) -> u64 {
        self.invalid_input.count
            + self.tolerance_exhausted.count
            + self.graph_isolated.count
            + self.capacity.count
    }
}
