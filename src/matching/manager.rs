// src/matching/manager.rs
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use indicatif::ProgressBar;
use log::info;
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};
use tokio::sync::Semaphore;

use crate::matching::confidence::score_pair;
use crate::matching::normalize::normalize_admin_text;
use crate::matching::result_cache::MatchResultCache;
use crate::models::matching::{InstitutionEntry, MatchCandidate, TargetMatches};
use crate::models::stats_models::MatchingStats;
use crate::utils::match_config::{MatchConfig, NormalizationRules, PrefilterConfig};
use crate::utils::progress_bars::logging::MatchingLogger;

static MAX_CONCURRENT_BATCHES: Lazy<usize> = Lazy::new(|| {
    std::env::var("MAX_CONCURRENT_BATCHES")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|n: &usize| *n > 0)
        .unwrap_or_else(num_cpus::get)
});
const TARGET_CHUNK_SIZE: usize = 64;

/// Installations bucketed by region codes plus a name-bigram index for records that
/// carry no province code. Built once per candidate set and shared read-only.
pub struct CandidateIndex {
    entries: Vec<InstitutionEntry>,
    name_grams: Vec<HashSet<String>>,
    by_province: HashMap<String, Vec<usize>>,
    by_district: HashMap<(String, String), Vec<usize>>,
    by_gram: HashMap<String, Vec<usize>>,
    unplaced: Vec<usize>,
    fingerprint: String,
}

/// Candidates that survived the pre-filter, with the count kept out of scoring.
pub struct Prefiltered<'a> {
    pub candidates: Vec<&'a InstitutionEntry>,
    pub excluded: usize,
}

fn name_bigrams(name: &str, rules: &NormalizationRules) -> HashSet<String> {
    let chars: Vec<char> = normalize_admin_text(name, rules).chars().collect();
    if chars.len() < 2 {
        return chars.iter().map(|c| c.to_string()).collect();
    }
    chars.windows(2).map(|w| w.iter().collect()).collect()
}

impl CandidateIndex {
    pub fn build(entries: Vec<InstitutionEntry>, rules: &NormalizationRules) -> Self {
        let mut by_province: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_district: HashMap<(String, String), Vec<usize>> = HashMap::new();
        let mut by_gram: HashMap<String, Vec<usize>> = HashMap::new();
        let mut name_grams = Vec::with_capacity(entries.len());
        let mut unplaced = Vec::new();
        let mut hasher = Sha256::new();

        for (idx, entry) in entries.iter().enumerate() {
            let record = &entry.record;
            if let Some(province) = record.province() {
                by_province.entry(province.to_string()).or_default().push(idx);
                if let Some(district) = record.district() {
                    by_district
                        .entry((province.to_string(), district.to_string()))
                        .or_default()
                        .push(idx);
                }
            } else {
                unplaced.push(idx);
            }
            let grams = name_bigrams(&record.name, rules);
            for gram in &grams {
                by_gram.entry(gram.clone()).or_default().push(idx);
            }
            name_grams.push(grams);

            hasher.update(entry.id.as_bytes());
            hasher.update([0x1e]);
        }

        Self {
            entries,
            name_grams,
            by_province,
            by_district,
            by_gram,
            unplaced,
            fingerprint: hex::encode(hasher.finalize()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn province_count(&self) -> usize {
        self.by_province.len()
    }

    pub fn district_count(&self) -> usize {
        self.by_district.len()
    }

    pub fn unplaced_count(&self) -> usize {
        self.unplaced.len()
    }

    /// Identity of the candidate set, used to scope cache keys.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Cheap geographic/substring pre-filter bounding how many candidates reach the
    /// full scorer.
    ///
    /// A target with a province code sees installations in that province (and, when both
    /// sides know it, the same district) plus uncoded installations sharing enough name
    /// bigrams. A target without one falls back to the name bigrams over the whole set.
    /// Either way the survivors are ordered by name-bigram overlap and capped.
    pub fn prefilter(
        &self,
        target: &InstitutionEntry,
        rules: &NormalizationRules,
        limits: &PrefilterConfig,
    ) -> Prefiltered<'_> {
        let target_grams = name_bigrams(&target.record.name, rules);
        let record = &target.record;

        let shared = |idx: usize| self.name_grams[idx].intersection(&target_grams).count();

        let mut scored: Vec<(usize, usize)> = match record.province() {
            Some(province) => {
                let in_region = self
                    .by_province
                    .get(province)
                    .into_iter()
                    .flatten()
                    .copied()
                    .filter(|&idx| {
                        match (record.district(), self.entries[idx].record.district()) {
                            (Some(td), Some(cd)) => td == cd,
                            _ => true,
                        }
                    })
                    .map(|idx| (idx, shared(idx)));
                let uncoded = self
                    .unplaced
                    .iter()
                    .map(|&idx| (idx, shared(idx)))
                    .filter(|&(_, n)| n >= limits.min_shared_bigrams);
                in_region.chain(uncoded).collect()
            }
            None => {
                let mut overlap: HashMap<usize, usize> = HashMap::new();
                for gram in &target_grams {
                    if let Some(indices) = self.by_gram.get(gram) {
                        for &idx in indices {
                            *overlap.entry(idx).or_insert(0) += 1;
                        }
                    }
                }
                overlap
                    .into_iter()
                    .filter(|(_, shared)| *shared >= limits.min_shared_bigrams)
                    .collect()
            }
        };

        scored.sort_by_key(|&(idx, shared)| (Reverse(shared), idx));
        scored.truncate(limits.max_candidates_per_target);

        let candidates: Vec<&InstitutionEntry> =
            scored.into_iter().map(|(idx, _)| &self.entries[idx]).collect();
        Prefiltered {
            excluded: self.entries.len() - candidates.len(),
            candidates,
        }
    }
}

/// Scores the target against each candidate, keeps accepted pairs and ranks them by
/// confidence, then match level, then candidate id.
pub fn rank_candidates(
    target: &InstitutionEntry,
    candidates: &[&InstitutionEntry],
    config: &MatchConfig,
) -> Vec<MatchCandidate> {
    let mut matches: Vec<MatchCandidate> = candidates
        .iter()
        .filter_map(|candidate| {
            let result = score_pair(&target.record, &candidate.record, config);
            result.confidence.map(|confidence| MatchCandidate {
                target_id: target.id.clone(),
                candidate_id: candidate.id.clone(),
                confidence,
                match_level: result.match_level,
                result,
            })
        })
        .collect();

    matches.sort_by(|a, b| {
        b.confidence
            .cmp(&a.confidence)
            .then_with(|| b.match_level.cmp(&a.match_level))
            .then_with(|| a.candidate_id.cmp(&b.candidate_id))
    });
    matches.truncate(config.max_results);
    matches
}

pub fn match_target(target: &InstitutionEntry, index: &CandidateIndex, config: &MatchConfig) -> TargetMatches {
    let prefiltered = index.prefilter(target, &config.normalization, &config.prefilter);
    TargetMatches {
        target_id: target.id.clone(),
        candidates_considered: prefiltered.candidates.len(),
        matches: rank_candidates(target, &prefiltered.candidates, config),
    }
}

/// `match_target` through a caller-owned cache. Returns whether the result was a hit.
pub fn match_target_cached(
    target: &InstitutionEntry,
    index: &CandidateIndex,
    config: &MatchConfig,
    cache: &mut MatchResultCache,
    now: DateTime<Utc>,
) -> (TargetMatches, bool) {
    let key = MatchResultCache::key_for(&target.record, index.fingerprint());
    if let Some(cached) = cache.get(&key, now) {
        let matches = cached
            .matches
            .iter()
            .cloned()
            .map(|mut m| {
                m.target_id = target.id.clone();
                m
            })
            .collect();
        return (
            TargetMatches {
                target_id: target.id.clone(),
                candidates_considered: cached.candidates_considered,
                matches,
            },
            true,
        );
    }

    let result = match_target(target, index, config);
    cache.put(key, result.matches.clone(), result.candidates_considered, now);
    (result, false)
}

fn score_chunk(
    chunk: &[InstitutionEntry],
    index: &CandidateIndex,
    config: &MatchConfig,
) -> (Vec<TargetMatches>, MatchingStats) {
    let mut cache = MatchResultCache::new(config.cache_size, config.cache_ttl());
    let mut stats = MatchingStats::default();
    let mut results = Vec::with_capacity(chunk.len());

    for target in chunk {
        let (matches, hit) = match_target_cached(target, index, config, &mut cache, Utc::now());
        if !hit {
            stats.pairs_scored += matches.candidates_considered;
            stats.pairs_prefiltered += index.len() - matches.candidates_considered;
        }
        if matches.is_unmatched() {
            stats.targets_unmatched += 1;
        } else {
            stats.targets_matched += 1;
        }
        results.push(matches);
    }

    stats.cache_hits = cache.hits;
    stats.cache_misses = cache.misses;
    (results, stats)
}

/// Matches every target against the installation set.
///
/// Scoring is CPU-bound, so chunks of targets run on the blocking pool with at most
/// `MAX_CONCURRENT_BATCHES` in flight. Output order follows `targets`.
pub async fn run_matching_batch(
    run_id: &str,
    targets: Vec<InstitutionEntry>,
    installations: Vec<InstitutionEntry>,
    config: Arc<MatchConfig>,
    progress: Option<ProgressBar>,
) -> Result<(Vec<TargetMatches>, MatchingStats)> {
    let logger = MatchingLogger::new(run_id);
    let concurrency = *MAX_CONCURRENT_BATCHES;
    logger.log_start(targets.len(), installations.len(), concurrency);
    let mut stats = MatchingStats::new(targets.len(), installations.len());

    logger.log_phase("Indexing installations", Some("bucketing by region and name bigrams"));
    let index = Arc::new(CandidateIndex::build(installations, &config.normalization));
    logger.log_index_built(
        index.len(),
        index.province_count(),
        index.district_count(),
        index.unplaced_count(),
    );

    if targets.is_empty() {
        logger.log_warning("No targets supplied, nothing to match");
        logger.log_completion(&stats);
        return Ok((Vec::new(), stats));
    }

    logger.log_phase("Scoring targets", None);
    logger.log_batch_processing_start(targets.len(), TARGET_CHUNK_SIZE);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let total_chunks = (targets.len() + TARGET_CHUNK_SIZE - 1) / TARGET_CHUNK_SIZE;

    let handles: Vec<_> = targets
        .chunks(TARGET_CHUNK_SIZE)
        .map(|chunk| chunk.to_vec())
        .enumerate()
        .map(|(chunk_idx, chunk)| {
            let semaphore_clone = Arc::clone(&semaphore);
            let index_clone = Arc::clone(&index);
            let config_clone = Arc::clone(&config);
            let pb_clone = progress.clone();
            let logger_clone = logger.clone();

            tokio::spawn(async move {
                let _permit = semaphore_clone
                    .acquire_owned()
                    .await
                    .context("Scoring semaphore closed")?;
                let chunk_len = chunk.len();
                let scored = tokio::task::spawn_blocking(move || {
                    score_chunk(&chunk, &index_clone, &config_clone)
                })
                .await
                .context("Scoring worker failed")?;

                if let Some(pb) = &pb_clone {
                    pb.inc(chunk_len as u64);
                }
                logger_clone.log_batch_progress(chunk_idx + 1, total_chunks, chunk_len);
                Ok::<_, anyhow::Error>(scored)
            })
        })
        .collect();

    let mut all_results = Vec::with_capacity(targets.len());
    for handle_result in join_all(handles).await {
        let (results, chunk_stats) = handle_result.context("Scoring task panicked")??;
        stats.absorb(&chunk_stats);
        all_results.extend(results);
    }

    let best: Vec<u32> = all_results
        .iter()
        .filter_map(|t| t.best().map(|m| m.confidence))
        .collect();
    stats.avg_confidence = if best.is_empty() {
        0.0
    } else {
        best.iter().map(|&c| c as f64).sum::<f64>() / best.len() as f64
    };

    if let Some(pb) = &progress {
        pb.finish_with_message(format!("{} of {} targets matched", stats.targets_matched, stats.targets_total));
    }
    logger.log_filtering_results(stats.pairs_scored, stats.pairs_prefiltered);
    logger.log_cache_results(stats.cache_hits, stats.cache_misses);
    logger.log_completion(&stats);
    logger.log_debug(&format!("Batch finished in {:.2?}", logger.get_elapsed()));
    info!(
        "Matched {}/{} targets ({} unmatched)",
        stats.targets_matched, stats.targets_total, stats.targets_unmatched
    );

    Ok((all_results, stats))
}
