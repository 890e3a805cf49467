// src/matching/address.rs
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::matching::edit_distance::similarity_score;
use crate::matching::normalize::strip_whitespace;
use crate::models::matching::MatchLevel;
use crate::utils::match_config::AddressScoreTiers;

static SUB_DISTRICT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[가-힣]+(?:읍|면|동|가|리)").expect("valid sub-district pattern"));

static STREET_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[가-힣0-9]+(?:동|로|가)").expect("valid street token pattern"));

/// First run of Hangul syllables directly followed by 읍/면/동/가/리, suffix included.
pub fn extract_sub_district_token(address: &str) -> Option<&str> {
    SUB_DISTRICT_RE.find(address).map(|m| m.as_str())
}

/// dong/ro/ga-suffixed tokens, used for the shared-street keyword bonus.
pub fn street_tokens(address: &str) -> HashSet<&str> {
    STREET_TOKEN_RE
        .find_iter(address)
        .map(|m| m.as_str())
        .collect()
}

pub fn shares_street_token(a: &str, b: &str) -> bool {
    let tokens_a = street_tokens(a);
    street_tokens(b).iter().any(|t| tokens_a.contains(t))
}

/// Province → district → sub-district agreement. Each tier requires every tier above it.
pub fn address_match_level(
    address_a: Option<&str>,
    address_b: Option<&str>,
    province_a: Option<&str>,
    province_b: Option<&str>,
    district_a: Option<&str>,
    district_b: Option<&str>,
) -> MatchLevel {
    match (province_a, province_b) {
        (Some(pa), Some(pb)) if pa == pb => {}
        _ => return MatchLevel::None,
    }
    match (district_a, district_b) {
        (Some(da), Some(db)) if da == db => {}
        _ => return MatchLevel::Province,
    }
    let tokens = (
        address_a.and_then(extract_sub_district_token),
        address_b.and_then(extract_sub_district_token),
    );
    match tokens {
        (Some(ta), Some(tb)) if ta == tb => MatchLevel::SubDistrict,
        _ => MatchLevel::District,
    }
}

/// Scores two free-text addresses on 0..=100.
///
/// Sub-district tokens are checked before containment: two addresses that share a
/// `대구 군위군` prefix but name different 면 are different places, and an address that
/// stops at the district cannot confirm one that names a sub-district.
pub fn compare_addresses(a: &str, b: &str, tiers: &AddressScoreTiers) -> u32 {
    let stripped_a = strip_whitespace(a);
    let stripped_b = strip_whitespace(b);
    if stripped_a == stripped_b {
        return tiers.exact;
    }

    match (extract_sub_district_token(a), extract_sub_district_token(b)) {
        (Some(ta), Some(tb)) if ta != tb => return tiers.sub_district_mismatch,
        (Some(_), None) | (None, Some(_)) => return tiers.partial_specificity,
        _ => {}
    }

    if stripped_a.contains(&stripped_b) || stripped_b.contains(&stripped_a) {
        return tiers.containment;
    }

    let similarity = similarity_score(&stripped_a, &stripped_b);
    if similarity >= tiers.min_similarity {
        similarity
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compare(a: &str, b: &str) -> u32 {
        compare_addresses(a, b, &AddressScoreTiers::default())
    }

    #[test]
    fn test_sub_district_token_extraction() {
        assert_eq!(extract_sub_district_token("서울 강남구 역삼동"), Some("역삼동"));
        assert_eq!(extract_sub_district_token("대구 군위군 의흥면 읍내리"), Some("의흥면"));
        assert_eq!(extract_sub_district_token("경기도 가평군 가평읍"), Some("가평읍"));
        assert_eq!(extract_sub_district_token("서울 종로구 종로5가"), None);
        assert_eq!(extract_sub_district_token("대구광역시 군위군"), None);
        assert_eq!(extract_sub_district_token(""), None);
    }

    #[test]
    fn test_exact_after_whitespace_strip() {
        assert_eq!(compare("서울 강남구 역삼동", "서울강남구 역삼동"), 100);
    }

    #[test]
    fn test_sub_district_mismatch_penalty() {
        assert_eq!(compare("대구 군위군 의흥면", "대구 군위군 효령면"), 30);
    }

    #[test]
    fn test_one_sided_sub_district_penalty() {
        // containment would otherwise score 90
        assert_eq!(compare("대구 군위군 의흥면", "대구 군위군"), 40);
        assert_eq!(compare("대구 군위군", "대구 군위군 의흥면"), 40);
    }

    #[test]
    fn test_containment_with_equal_tokens() {
        assert_eq!(compare("대구 군위군 의흥면", "대구 군위군 의흥면 읍내리 123"), 90);
        assert_eq!(compare("대구 군위군", "대구광역시 군위군 군위읍 x"), 40);
    }

    #[test]
    fn test_similarity_floor() {
        assert_eq!(compare("서울 강남구 역삼동 123", "서울 강남구 역삼동 124"), 91);
        assert_eq!(compare("서울 강남구 테헤란로 1", "부산 해운대구 우동"), 40);
        assert_eq!(compare("서울 강남구 테헤란로 1", "부산 해운대구 센텀로 9"), 0);
    }

    #[test]
    fn test_match_level_tiers() {
        let addr = Some("서울 강남구 역삼동");
        assert_eq!(
            address_match_level(addr, addr, None, Some("11"), Some("11680"), Some("11680")),
            MatchLevel::None
        );
        assert_eq!(
            address_match_level(addr, addr, Some("11"), Some("26"), Some("11680"), Some("11680")),
            MatchLevel::None
        );
        assert_eq!(
            address_match_level(addr, addr, Some("11"), Some("11"), None, Some("11680")),
            MatchLevel::Province
        );
        assert_eq!(
            address_match_level(None, addr, Some("11"), Some("11"), Some("11680"), Some("11680")),
            MatchLevel::District
        );
        assert_eq!(
            address_match_level(addr, addr, Some("11"), Some("11"), Some("11680"), Some("11680")),
            MatchLevel::SubDistrict
        );
    }

    #[test]
    fn test_match_level_monotone_in_specificity() {
        let a = Some("서울 강남구 역삼동 1");
        let b = Some("서울 강남구 역삼동 2");
        let province_only = address_match_level(a, b, Some("11"), Some("11"), None, None);
        let with_district = address_match_level(
            a,
            Some("서울 강남구"),
            Some("11"),
            Some("11"),
            Some("11680"),
            Some("11680"),
        );
        let with_sub_district =
            address_match_level(a, b, Some("11"), Some("11"), Some("11680"), Some("11680"));
        assert_eq!(province_only, MatchLevel::Province);
        assert_eq!(with_district, MatchLevel::District);
        assert_eq!(with_sub_district, MatchLevel::SubDistrict);
        assert!(province_only <= with_district);
        assert!(with_district <= with_sub_district);

        let other_dong = address_match_level(
            a,
            Some("서울 강남구 삼성동"),
            Some("11"),
            Some("11"),
            Some("11680"),
            Some("11680"),
        );
        assert_eq!(other_dong, MatchLevel::District);
    }

    #[test]
    fn test_shared_street_tokens() {
        assert!(shares_street_token("서울 강남구 테헤란로 1", "강남구 테헤란로 152"));
        assert!(shares_street_token("서울 종로구 종로5가 3", "종로구 종로5가"));
        assert!(!shares_street_token("서울 강남구 역삼동", "서울 강남구 삼성동"));
        assert!(!shares_street_token("", ""));
    }
}
