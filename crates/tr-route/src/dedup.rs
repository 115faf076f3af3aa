//! Near-duplicate route suppression (Layer 3c).
//!
//! Two keys, checked in order: exact identity on the sorted trail-name
//! tuple, then Jaccard similarity above the threshold against any already
//! accepted route.  First acceptance wins, so the outcome depends only on
//! candidate order — which the search keeps deterministic.

use std::collections::BTreeSet;

use rustc_hash::FxHashSet;

/// Jaccard similarity |A ∩ B| / |A ∪ B| over trail-name sets.
///
/// Two empty sets are identical (1.0).
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

// ── RouteDeduper ──────────────────────────────────────────────────────────────

/// Accepts or rejects candidate routes against everything admitted so far.
pub struct RouteDeduper {
    threshold: f64,
    accepted:  Vec<BTreeSet<String>>,
    identity:  FxHashSet<Vec<String>>,
}

impl RouteDeduper {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            accepted: Vec::new(),
            identity: FxHashSet::default(),
        }
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }

    /// Try to admit a route by its trail-name set.
    ///
    /// Returns `Some(similarity)` — the max Jaccard vs. previously accepted
    /// routes — when admitted, `None` when suppressed.
    pub fn admit(&mut self, names: &BTreeSet<String>) -> Option<f64> {
        let key: Vec<String> = names.iter().cloned().collect();
        if self.identity.contains(&key) {
            return None;
        }
        let mut max_similarity: f64 = 0.0;
        for prior in &self.accepted {
            let s = jaccard(names, prior);
            if s > self.threshold {
                return None;
            }
            max_similarity = max_similarity.max(s);
        }
        self.identity.insert(key);
        self.accepted.push(names.clone());
        Some(max_similarity)
    }
}
