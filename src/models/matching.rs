// src/models/matching.rs
use serde::{Deserialize, Serialize};

/// One side of a comparison: a device-installation record or a mandated-installation
/// target. Region codes are consumed as already normalized by the region lookup service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InstitutionRecord {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub province_code: Option<String>,
    #[serde(default)]
    pub district_code: Option<String>,
}

impl InstitutionRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_region(
        mut self,
        province_code: impl Into<String>,
        district_code: Option<&str>,
    ) -> Self {
        self.province_code = Some(province_code.into());
        self.district_code = district_code.map(str::to_string);
        self
    }

    /// Address with blank values treated as absent.
    pub fn address(&self) -> Option<&str> {
        non_blank(self.address.as_deref())
    }

    pub fn province(&self) -> Option<&str> {
        non_blank(self.province_code.as_deref())
    }

    pub fn district(&self) -> Option<&str> {
        non_blank(self.district_code.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A record with the identifier the calling application knows it by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionEntry {
    pub id: String,
    #[serde(flatten)]
    pub record: InstitutionRecord,
}

impl InstitutionEntry {
    pub fn new(id: impl Into<String>, record: InstitutionRecord) -> Self {
        Self {
            id: id.into(),
            record,
        }
    }
}

/// How far up the province → district → sub-district hierarchy two records agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum MatchLevel {
    #[default]
    None = 0,
    Province = 1,
    District = 2,
    SubDistrict = 3,
}

impl MatchLevel {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl From<MatchLevel> for u8 {
    fn from(level: MatchLevel) -> Self {
        level.as_u8()
    }
}

impl TryFrom<u8> for MatchLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MatchLevel::None),
            1 => Ok(MatchLevel::Province),
            2 => Ok(MatchLevel::District),
            3 => Ok(MatchLevel::SubDistrict),
            other => Err(format!("match level out of range: {}", other)),
        }
    }
}

/// Which blend produced the confidence. Address data, when both sides have it and it
/// scores above zero, dominates the blend and permits a lower acceptance threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightingMode {
    WithAddress,
    #[default]
    WithoutAddress,
}

/// Why a pair produced no confidence. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    MissingName,
    Subsidiary,
    BelowThreshold { threshold: u32 },
}

/// Full signal breakdown for a single pairwise comparison.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchResult {
    pub name_score: u32,
    pub address_score: u32,
    pub region_score: u32,
    pub keyword_bonus: u32,
    pub confidence: Option<u32>,
    pub match_level: MatchLevel,
    pub weighting: WeightingMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
}

impl MatchResult {
    pub fn rejected(reason: Rejection) -> Self {
        Self {
            rejection: Some(reason),
            ..Default::default()
        }
    }

    pub fn is_match(&self) -> bool {
        self.confidence.is_some()
    }
}

/// An accepted candidate for a target, ready to be serialized by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub target_id: String,
    pub candidate_id: String,
    pub confidence: u32,
    pub match_level: MatchLevel,
    pub result: MatchResult,
}

/// Ranked candidates for one target. An empty list is the "unmatched" outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetMatches {
    pub target_id: String,
    pub candidates_considered: usize,
    pub matches: Vec<MatchCandidate>,
}

impl TargetMatches {
    pub fn is_unmatched(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn best(&self) -> Option<&MatchCandidate> {
        self.matches.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_fields_read_as_absent() {
        let record = InstitutionRecord {
            name: "군위군보건소".to_string(),
            address: Some("   ".to_string()),
            province_code: Some("".to_string()),
            district_code: Some(" 47720 ".to_string()),
        };
        assert_eq!(record.address(), None);
        assert_eq!(record.province(), None);
        assert_eq!(record.district(), Some("47720"));
    }

    #[test]
    fn test_match_level_serializes_as_number() {
        let json = serde_json::to_string(&MatchLevel::District).unwrap();
        assert_eq!(json, "2");
        let level: MatchLevel = serde_json::from_str("3").unwrap();
        assert_eq!(level, MatchLevel::SubDistrict);
        assert!(serde_json::from_str::<MatchLevel>("4").is_err());
    }

    #[test]
    fn test_entry_reads_flat_json() {
        let json = r#"{"id":"T-1","name":"서울강남구보건소","address":"서울 강남구 역삼동","province_code":"11"}"#;
        let entry: InstitutionEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.id, "T-1");
        assert_eq!(entry.record.province(), Some("11"));
        assert_eq!(entry.record.district(), None);
    }
}
