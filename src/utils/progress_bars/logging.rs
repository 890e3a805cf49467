// src/utils/progress_bars/logging.rs - Logging helpers for batch matching runs
use log::{debug, info, warn};
use std::time::Instant;

use crate::models::stats_models::MatchingStats;

#[derive(Clone)]
pub struct MatchingLogger {
    run_tag: String,
    start_time: Instant,
}

impl MatchingLogger {
    pub fn new(run_id: &str) -> Self {
        let short_id: String = run_id.chars().take(8).collect();
        Self {
            run_tag: format!("LINKAGE {}", short_id),
            start_time: Instant::now(),
        }
    }

    pub fn log_start(&self, targets: usize, installations: usize, concurrency_limit: usize) {
        info!(
            "[{}] 🏥 🚀 Starting institution matching: {} targets against {} installations",
            self.run_tag, targets, installations
        );
        info!(
            "[{}] 🏥 ⚙️  Configuration: {} concurrent scoring batches, geographic pre-filter enabled",
            self.run_tag, concurrency_limit
        );
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        let msg = if let Some(details) = details {
            format!(
                "[{}] 🏥 🔄 Phase: {} - {} [+{:.1}s]",
                self.run_tag, phase, details, elapsed.as_secs_f32()
            )
        } else {
            format!(
                "[{}] 🏥 🔄 Phase: {} [+{:.1}s]",
                self.run_tag, phase, elapsed.as_secs_f32()
            )
        };
        info!("{}", msg);
    }

    pub fn log_index_built(&self, entries: usize, provinces: usize, districts: usize, unplaced: usize) {
        info!(
            "[{}] 🏥 📊 Indexed {} installations: {} provinces, {} districts",
            self.run_tag, entries, provinces, districts
        );
        if unplaced > 0 {
            warn!(
                "[{}] 🏥 ⚠️  Data quality: {} installations without a province code (reachable through name bigrams only, no region signal)",
                self.run_tag, unplaced
            );
        }
    }

    pub fn log_batch_processing_start(&self, total_targets: usize, chunk_size: usize) {
        let chunk_count = (total_targets + chunk_size - 1) / chunk_size.max(1);
        info!(
            "[{}] 🏥 ⚙️  Scoring {} targets in {} chunks (chunk size: {})",
            self.run_tag, total_targets, chunk_count, chunk_size
        );
    }

    pub fn log_batch_progress(&self, chunk_num: usize, total_chunks: usize, targets_in_chunk: usize) {
        if chunk_num % 5 == 0 || chunk_num == 1 || chunk_num == total_chunks {
            info!(
                "[{}] 🏥 📦 Finished chunk {}/{} ({} targets)",
                self.run_tag, chunk_num, total_chunks, targets_in_chunk
            );
        }
    }

    pub fn log_filtering_results(&self, scored_pairs: usize, prefiltered_pairs: usize) {
        let total = scored_pairs + prefiltered_pairs;
        let percent_kept = if total > 0 {
            (scored_pairs as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        info!(
            "[{}] 🏥 🎯 Pair filtering: {} possible → {} scored ({:.1}% kept)",
            self.run_tag, total, scored_pairs, percent_kept
        );
    }

    pub fn log_cache_results(&self, cache_hits: usize, cache_misses: usize) {
        let total = cache_hits + cache_misses;
        if total > 0 {
            let hit_rate = (cache_hits as f64 / total as f64) * 100.0;
            info!(
                "[{}] 🏥 💾 Cache results: {} hits, {} misses ({:.1}% hit rate)",
                self.run_tag, cache_hits, cache_misses, hit_rate
            );
        }
    }

    pub fn log_completion(&self, stats: &MatchingStats) {
        let duration = self.start_time.elapsed();
        info!(
            "[{}] 🏥 🎉 COMPLETED: {}/{} targets matched ({:.1}%) in {:.2?}",
            self.run_tag,
            stats.targets_matched,
            stats.targets_total,
            stats.match_rate(),
            duration
        );
        info!(
            "[{}] 🏥 📊 Results: {} unmatched, avg best confidence: {:.1}, {} pairs scored",
            self.run_tag, stats.targets_unmatched, stats.avg_confidence, stats.pairs_scored
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!("[{}] 🏥 ⚠️  {}", self.run_tag, message);
    }

    pub fn log_debug(&self, message: &str) {
        debug!("[{}] 🏥 {}", self.run_tag, message);
    }

    pub fn get_elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}
