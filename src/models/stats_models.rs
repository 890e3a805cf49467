// src/models/stats_models.rs
use serde::{Deserialize, Serialize};

/// Aggregate counters for a batch matching run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchingStats {
    pub targets_total: usize,
    pub targets_matched: usize,
    pub targets_unmatched: usize,
    pub installations_total: usize,
    /// Pairs that reached the full scorer after pre-filtering.
    pub pairs_scored: usize,
    /// Pairs the pre-filter kept out of the full scorer.
    pub pairs_prefiltered: usize,
    pub avg_confidence: f64,
    pub cache_hits: usize,
    pub cache_misses: usize,
}

impl MatchingStats {
    pub fn new(targets_total: usize, installations_total: usize) -> Self {
        Self {
            targets_total,
            installations_total,
            ..Default::default()
        }
    }

    /// Folds another chunk's counters into this one. `avg_confidence` is recomputed by the
    /// caller once all best-match confidences are known.
    pub fn absorb(&mut self, other: &MatchingStats) {
        self.targets_matched += other.targets_matched;
        self.targets_unmatched += other.targets_unmatched;
        self.pairs_scored += other.pairs_scored;
        self.pairs_prefiltered += other.pairs_prefiltered;
        self.cache_hits += other.cache_hits;
        self.cache_misses += other.cache_misses;
    }

    pub fn match_rate(&self) -> f64 {
        if self.targets_total == 0 {
            0.0
        } else {
            self.targets_matched as f64 / self.targets_total as f64 * 100.0
        }
    }
}
