// src/matching/confidence.rs
use log::{debug, trace};

use crate::matching::address::{address_match_level, compare_addresses, shares_street_token};
use crate::matching::edit_distance::similarity_score;
use crate::matching::normalize::{normalize_admin_text, strip_whitespace};
use crate::matching::subsidiary::is_subsidiary_pair;
use crate::models::matching::{InstitutionRecord, MatchResult, Rejection, WeightingMode};
use crate::utils::match_config::MatchConfig;

/// Any positive address score switches to the address-dominated blend.
pub fn select_weighting(address_score: u32) -> WeightingMode {
    if address_score > 0 {
        WeightingMode::WithAddress
    } else {
        WeightingMode::WithoutAddress
    }
}

pub fn name_score(name_a: &str, name_b: &str, config: &MatchConfig) -> u32 {
    let tiers = &config.name_tiers;
    let a = strip_whitespace(name_a);
    let b = strip_whitespace(name_b);
    if a == b {
        return tiers.exact;
    }
    if a.contains(&b) || b.contains(&a) {
        return tiers.containment;
    }

    let normalized_a = normalize_admin_text(name_a, &config.normalization);
    let normalized_b = normalize_admin_text(name_b, &config.normalization);
    if normalized_a == normalized_b {
        tiers.normalized_exact
    } else {
        similarity_score(&normalized_a, &normalized_b)
    }
}

/// Absent codes give no region signal rather than being inferred.
pub fn region_score(a: &InstitutionRecord, b: &InstitutionRecord) -> u32 {
    match (a.province(), b.province()) {
        (Some(pa), Some(pb)) if pa == pb => 100,
        _ => 0,
    }
}

/// Bonus points for corroborating keywords. Returns 0 below the address-score gate so
/// geography that was already rejected is never rewarded.
pub fn keyword_bonus(
    a: &InstitutionRecord,
    b: &InstitutionRecord,
    address_score: u32,
    config: &MatchConfig,
) -> u32 {
    let bonus = &config.keyword_bonus;
    if address_score < bonus.min_address_score {
        return 0;
    }

    let mut total = 0;
    let keyword = bonus.health_center_keyword.as_str();
    if !keyword.is_empty() && a.name.contains(keyword) && b.name.contains(keyword) {
        total += bonus.health_center;
    }
    if matches!((a.district(), b.district()), (Some(da), Some(db)) if da == db) {
        total += bonus.same_district;
    }
    if let (Some(addr_a), Some(addr_b)) = (a.address(), b.address()) {
        if shares_street_token(addr_a, addr_b) {
            total += bonus.shared_street_token;
        }
    }
    if bonus
        .medical_keywords
        .iter()
        .any(|k| !k.is_empty() && a.name.contains(k.as_str()) && b.name.contains(k.as_str()))
    {
        total += bonus.medical_keyword;
    }
    total
}

/// Compares two institution records and returns the full signal breakdown.
///
/// Order matters: missing names and parent/branch pairs short-circuit before any
/// scoring, then the blend for the active weighting mode is gated by that mode's
/// threshold. A rejected pair has `confidence == None` and a `rejection` reason.
pub fn score_pair(a: &InstitutionRecord, b: &InstitutionRecord, config: &MatchConfig) -> MatchResult {
    if a.name.trim().is_empty() || b.name.trim().is_empty() {
        return MatchResult::rejected(Rejection::MissingName);
    }
    if is_subsidiary_pair(&a.name, &b.name, &config.branch_suffixes) {
        debug!("Subsidiary veto: '{}' / '{}'", a.name, b.name);
        return MatchResult::rejected(Rejection::Subsidiary);
    }

    let name_score = name_score(&a.name, &b.name, config);
    let address_score = match (a.address(), b.address()) {
        (Some(addr_a), Some(addr_b)) => compare_addresses(addr_a, addr_b, &config.address_tiers),
        _ => 0,
    };
    let region_score = region_score(a, b);
    let match_level = address_match_level(
        a.address(),
        b.address(),
        a.province(),
        b.province(),
        a.district(),
        b.district(),
    );

    let weighting = select_weighting(address_score);
    let weights = config.weights_for(weighting);
    let blended = weights.blend(name_score, address_score, region_score);
    let keyword_bonus = keyword_bonus(a, b, address_score, config);
    let confidence = (blended + keyword_bonus).min(100);

    trace!(
        "'{}' / '{}': name={} address={} region={} bonus={} -> {} ({:?})",
        a.name,
        b.name,
        name_score,
        address_score,
        region_score,
        keyword_bonus,
        confidence,
        weighting
    );

    let accepted = confidence >= weights.threshold;
    MatchResult {
        name_score,
        address_score,
        region_score,
        keyword_bonus,
        confidence: accepted.then_some(confidence),
        match_level,
        weighting,
        rejection: (!accepted).then_some(Rejection::BelowThreshold {
            threshold: weights.threshold,
        }),
    }
}

pub fn match_confidence(a: &InstitutionRecord, b: &InstitutionRecord, config: &MatchConfig) -> Option<u32> {
    score_pair(a, b, config).confidence
}
