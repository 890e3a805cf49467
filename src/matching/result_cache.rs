// src/matching/result_cache.rs
use chrono::{DateTime, Duration, Utc};
use log::debug;
use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;

use crate::models::matching::{InstitutionRecord, MatchCandidate};

#[derive(Debug, Clone)]
pub struct CachedMatches {
    pub matches: Vec<MatchCandidate>,
    pub candidates_considered: usize,
    pub stored_at: DateTime<Utc>,
}

/// Key → (ranked matches, timestamp) store for request-scoped matching.
///
/// The cache is owned by the caller and handed to the matching functions; the current
/// time is passed in explicitly so expiry is deterministic.
pub struct MatchResultCache {
    entries: LruCache<String, CachedMatches>,
    ttl: Duration,
    pub hits: usize,
    pub misses: usize,
}

impl MatchResultCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            ttl,
            hits: 0,
            misses: 0,
        }
    }

    /// Cache key for a target record against one candidate set.
    pub fn key_for(target: &InstitutionRecord, candidate_set_fingerprint: &str) -> String {
        let mut hasher = Sha256::new();
        for field in [
            Some(target.name.as_str()),
            target.address(),
            target.province(),
            target.district(),
        ] {
            hasher.update(field.unwrap_or("").as_bytes());
            hasher.update([0x1f]);
        }
        hasher.update(candidate_set_fingerprint.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn get(&mut self, key: &str, now: DateTime<Utc>) -> Option<&CachedMatches> {
        let expired = match self.entries.peek(key) {
            Some(entry) => now - entry.stored_at > self.ttl,
            None => {
                self.misses += 1;
                return None;
            }
        };
        if expired {
            debug!("Match cache entry expired: {}", key);
            self.entries.pop(key);
            self.misses += 1;
            return None;
        }
        self.hits += 1;
        self.entries.get(key)
    }

    pub fn put(
        &mut self,
        key: String,
        matches: Vec<MatchCandidate>,
        candidates_considered: usize,
        now: DateTime<Utc>,
    ) {
        self.entries.put(
            key,
            CachedMatches {
                matches,
                candidates_considered,
                stored_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_hit_then_expiry() {
        let mut cache = MatchResultCache::new(10, Duration::seconds(60));
        cache.put("k".to_string(), Vec::new(), 3, at(0));

        let hit = cache.get("k", at(60)).map(|e| e.candidates_considered);
        assert_eq!(hit, Some(3));
        assert!(cache.get("k", at(61)).is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.hits, 1);
        assert_eq!(cache.misses, 1);
    }

    #[test]
    fn test_capacity_evicts_least_recent() {
        let mut cache = MatchResultCache::new(2, Duration::seconds(60));
        cache.put("a".to_string(), Vec::new(), 0, at(0));
        cache.put("b".to_string(), Vec::new(), 0, at(0));
        assert!(cache.get("a", at(1)).is_some());
        cache.put("c".to_string(), Vec::new(), 0, at(1));
        assert!(cache.get("b", at(2)).is_none());
        assert!(cache.get("a", at(2)).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_zero_capacity_still_usable() {
        let mut cache = MatchResultCache::new(0, Duration::seconds(60));
        cache.put("a".to_string(), Vec::new(), 0, at(0));
        assert!(cache.get("a", at(0)).is_some());
    }

    #[test]
    fn test_key_depends_on_record_and_candidate_set() {
        let record = InstitutionRecord::new("군위군보건소").with_region("27", Some("27720"));
        let spaced = InstitutionRecord {
            address: Some("  ".to_string()),
            ..record.clone()
        };
        let k1 = MatchResultCache::key_for(&record, "set-1");
        assert_eq!(k1, MatchResultCache::key_for(&spaced, "set-1"));
        assert_ne!(k1, MatchResultCache::key_for(&record, "set-2"));
        assert_ne!(
            k1,
            MatchResultCache::key_for(&record.clone().with_address("대구 군위군"), "set-1")
        );
        assert_eq!(k1.len(), 64);
    }
}
