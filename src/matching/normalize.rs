// src/matching/normalize.rs
//! Canonical form of Korean administrative text, used only for comparison.

use crate::utils::match_config::NormalizationRules;

pub fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Abbreviates region words, strips one trailing institutional suffix, then drops
/// whitespace and punctuation.
///
/// Suffix stripping is a single pass over the priority-ordered list: the first suffix the
/// text ends with is removed and nothing else is tried, so stacked suffixes such as
/// `행정복지센터` only lose `센터`. Match scores are calibrated against this.
pub fn normalize_admin_text(text: &str, rules: &NormalizationRules) -> String {
    let mut normalized = text.to_string();
    for (pattern, replacement) in &rules.abbreviations {
        normalized = normalized.replace(pattern.as_str(), replacement);
    }

    if let Some(suffix) = rules
        .institutional_suffixes
        .iter()
        .find(|suffix| !suffix.is_empty() && normalized.ends_with(suffix.as_str()))
    {
        normalized.truncate(normalized.len() - suffix.len());
    }

    normalized
        .chars()
        .filter(|c| !c.is_whitespace() && !rules.punctuation.contains(c))
        .collect()
}
