//! Tunable weights, thresholds and word lists for institution matching.
//! Everything the scorer calibrates against lives in one value so it can be tuned
//! from the environment or a JSON file without touching control flow.

use anyhow::{Context, Result};
use chrono::Duration;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::models::matching::WeightingMode;

/// Weight tuple and acceptance threshold for one weighting mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendWeights {
    pub name: f64,
    pub address: f64,
    pub region: f64,
    pub threshold: u32,
}

impl BlendWeights {
    pub const WITH_ADDRESS: BlendWeights = BlendWeights {
        name: 0.15,
        address: 0.70,
        region: 0.15,
        threshold: 50,
    };

    pub const WITHOUT_ADDRESS: BlendWeights = BlendWeights {
        name: 0.6,
        address: 0.0,
        region: 0.4,
        threshold: 70,
    };

    pub fn blend(&self, name_score: u32, address_score: u32, region_score: u32) -> u32 {
        let raw = name_score as f64 * self.name
            + address_score as f64 * self.address
            + region_score as f64 * self.region;
        raw.round().clamp(0.0, 100.0) as u32
    }

    pub fn sum(&self) -> f64 {
        self.name + self.address + self.region
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameScoreTiers {
    pub exact: u32,
    /// One whitespace-stripped name contains the other. Kept well below `exact`
    /// since containment alone produced too many false positives.
    pub containment: u32,
    pub normalized_exact: u32,
}

impl Default for NameScoreTiers {
    fn default() -> Self {
        Self {
            exact: 100,
            containment: 75,
            normalized_exact: 95,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressScoreTiers {
    pub exact: u32,
    pub sub_district_mismatch: u32,
    pub partial_specificity: u32,
    pub containment: u32,
    pub min_similarity: u32,
}

impl Default for AddressScoreTiers {
    fn default() -> Self {
        Self {
            exact: 100,
            sub_district_mismatch: 30,
            partial_specificity: 40,
            containment: 90,
            min_similarity: 80,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordBonusConfig {
    /// Bonuses are only considered when the address score reaches this value.
    pub min_address_score: u32,
    pub health_center_keyword: String,
    pub health_center: u32,
    pub same_district: u32,
    pub shared_street_token: u32,
    pub medical_keywords: Vec<String>,
    pub medical_keyword: u32,
}

impl Default for KeywordBonusConfig {
    fn default() -> Self {
        Self {
            min_address_score: 50,
            health_center_keyword: "보건소".to_string(),
            health_center: 3,
            same_district: 5,
            shared_street_token: 2,
            medical_keywords: to_strings(&["센터", "의료원"]),
            medical_keyword: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationRules {
    /// Substring substitutions, applied once each in order.
    pub abbreviations: Vec<(String, String)>,
    /// Tried in order at the end of the string; only the first hit is stripped.
    pub institutional_suffixes: Vec<String>,
    pub punctuation: Vec<char>,
}

impl Default for NormalizationRules {
    fn default() -> Self {
        Self {
            abbreviations: vec![
                ("광역시".to_string(), "광시".to_string()),
                ("특별시".to_string(), "특시".to_string()),
                ("자치도".to_string(), "도".to_string()),
            ],
            institutional_suffixes: to_strings(&[
                "보건지소",
                "보건소",
                "센터",
                "지소",
                "의료원",
                "병원",
                "의원",
                "주민센터",
                "행정복지센터",
            ]),
            punctuation: vec!['(', ')', ',', '.', '-', '·'],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefilterConfig {
    /// Minimum number of shared name bigrams for candidates without region codes.
    pub min_shared_bigrams: usize,
    pub max_candidates_per_target: usize,
}

impl Default for PrefilterConfig {
    fn default() -> Self {
        Self {
            min_shared_bigrams: 2,
            max_candidates_per_target: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub with_address: BlendWeights,
    pub without_address: BlendWeights,
    pub name_tiers: NameScoreTiers,
    pub address_tiers: AddressScoreTiers,
    pub keyword_bonus: KeywordBonusConfig,
    pub normalization: NormalizationRules,
    pub branch_suffixes: Vec<String>,
    pub prefilter: PrefilterConfig,
    /// Ranked candidates kept per target.
    pub max_results: usize,
    pub cache_size: usize,
    pub cache_ttl_secs: i64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            with_address: BlendWeights::WITH_ADDRESS,
            without_address: BlendWeights::WITHOUT_ADDRESS,
            name_tiers: NameScoreTiers::default(),
            address_tiers: AddressScoreTiers::default(),
            keyword_bonus: KeywordBonusConfig::default(),
            normalization: NormalizationRules::default(),
            branch_suffixes: to_strings(&["보건지소", "분소", "출장소", "지소", "지부", "분원"]),
            prefilter: PrefilterConfig::default(),
            max_results: 5,
            cache_size: 1000,
            cache_ttl_secs: 300,
        }
    }
}

impl MatchConfig {
    pub fn weights_for(&self, mode: WeightingMode) -> &BlendWeights {
        match mode {
            WeightingMode::WithAddress => &self.with_address,
            WeightingMode::WithoutAddress => &self.without_address,
        }
    }

    /// Result cache lifetime. Negative values expire immediately and values beyond
    /// chrono's range saturate instead of panicking.
    pub fn cache_ttl(&self) -> Duration {
        Duration::try_seconds(self.cache_ttl_secs.max(0)).unwrap_or(Duration::MAX)
    }

    /// Defaults overridden by environment variables, when set and parseable.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Loads a JSON config file; missing keys fall back to defaults. Environment
    /// overrides are applied on top.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read match config {}", path.display()))?;
        let mut config: MatchConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse match config {}", path.display()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse("MATCH_THRESHOLD_WITH_ADDRESS") {
            self.with_address.threshold = v;
        }
        if let Some(v) = env_parse("MATCH_THRESHOLD_WITHOUT_ADDRESS") {
            self.without_address.threshold = v;
        }
        if let Some(v) = env_parse("MATCH_MAX_RESULTS") {
            self.max_results = v;
        }
        if let Some(v) = env_parse("MATCH_MAX_CANDIDATES_PER_TARGET") {
            self.prefilter.max_candidates_per_target = v;
        }
        if let Some(v) = env_parse("MATCH_CACHE_SIZE") {
            self.cache_size = v;
        }
        if let Some(v) = env_parse("MATCH_CACHE_TTL_SECS") {
            self.cache_ttl_secs = v;
        }
        debug!(
            "Match config thresholds: with_address={}, without_address={}",
            self.with_address.threshold, self.without_address.threshold
        );
    }

    pub fn log_config(&self) {
        info!("⚖️  Match weighting");
        info!(
            "   With address: name={:.2} address={:.2} region={:.2} (accept >= {})",
            self.with_address.name,
            self.with_address.address,
            self.with_address.region,
            self.with_address.threshold
        );
        info!(
            "   Without address: name={:.2} region={:.2} (accept >= {})",
            self.without_address.name, self.without_address.region, self.without_address.threshold
        );
        info!(
            "   Keyword bonus gate: address score >= {}",
            self.keyword_bonus.min_address_score
        );
        info!(
            "   Pre-filter: max {} candidates/target, {} results kept",
            self.prefilter.max_candidates_per_target, self.max_results
        );
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_cache_ttl_saturates() {
        let mut config = MatchConfig::default();
        assert_eq!(config.cache_ttl(), Duration::seconds(300));

        config.cache_ttl_secs = i64::MAX;
        assert_eq!(config.cache_ttl(), Duration::MAX);

        config.cache_ttl_secs = -5;
        assert_eq!(config.cache_ttl(), Duration::zero());
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        assert!((BlendWeights::WITH_ADDRESS.sum() - 1.0).abs() < 1e-9);
        assert!((BlendWeights::WITHOUT_ADDRESS.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_blend_rounds_half_away_from_zero() {
        // 11 * 0.6 + 100 * 0.4 = 46.6
        assert_eq!(BlendWeights::WITHOUT_ADDRESS.blend(11, 0, 100), 47);
        // 100 * 0.15 + 30 * 0.7 + 100 * 0.15 = 51
        assert_eq!(BlendWeights::WITH_ADDRESS.blend(100, 30, 100), 51);
    }

    #[test]
    fn test_weights_for_mode() {
        let config = MatchConfig::default();
        assert_eq!(config.weights_for(WeightingMode::WithAddress).threshold, 50);
        assert_eq!(config.weights_for(WeightingMode::WithoutAddress).threshold, 70);
    }

    #[test]
    fn test_env_overrides() {
        env::set_var("MATCH_THRESHOLD_WITHOUT_ADDRESS", "75");
        env::set_var("MATCH_MAX_RESULTS", "not-a-number");

        let config = MatchConfig::from_env();
        assert_eq!(config.without_address.threshold, 75);
        assert_eq!(config.max_results, 5);

        // Cleanup
        env::remove_var("MATCH_THRESHOLD_WITHOUT_ADDRESS");
        env::remove_var("MATCH_MAX_RESULTS");
    }

    #[test]
    fn test_partial_config_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"max_results": 3, "with_address": {{"name": 0.2, "address": 0.6, "region": 0.2, "threshold": 55}}}}"#
        )
        .unwrap();

        let config = MatchConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_results, 3);
        assert_eq!(config.with_address.threshold, 55);
        assert!((config.without_address.name - 0.6).abs() < 1e-9);
        assert_eq!(config.normalization.institutional_suffixes.len(), 9);
    }

    #[test]
    fn test_unreadable_config_file_is_an_error() {
        let err = MatchConfig::from_file(Path::new("/nonexistent/match.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read match config"));
    }
}
