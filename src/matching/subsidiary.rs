// src/matching/subsidiary.rs
use crate::matching::normalize::strip_whitespace;

/// True when one name strictly contains the other and the longer one ends with a
/// branch-type suffix, e.g. `군위군보건소` / `군위군보건소의흥면보건지소`. Works in either
/// direction.
///
/// Names are compared whitespace-stripped with institutional suffixes kept. Identical
/// names are never a parent/branch pair.
pub fn is_subsidiary_pair<S: AsRef<str>>(name_a: &str, name_b: &str, branch_suffixes: &[S]) -> bool {
    let a = strip_whitespace(name_a);
    let b = strip_whitespace(name_b);
    let (shorter, longer) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    if shorter.is_empty() || shorter.len() == longer.len() || !longer.contains(&shorter) {
        return false;
    }

    branch_suffixes
        .iter()
        .map(AsRef::as_ref)
        .any(|suffix| !suffix.is_empty() && longer.ends_with(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BRANCH_SUFFIXES: [&str; 6] = ["보건지소", "분소", "출장소", "지소", "지부", "분원"];

    fn subsidiary(a: &str, b: &str) -> bool {
        is_subsidiary_pair(a, b, &BRANCH_SUFFIXES)
    }

    #[test]
    fn test_parent_and_branch_in_either_order() {
        assert!(subsidiary("군위군보건소", "군위군보건소의흥면보건지소"));
        assert!(subsidiary("군위군보건소의흥면보건지소", "군위군보건소"));
        assert!(subsidiary("서울의료원", "서울의료원 강남분원"));
        assert!(subsidiary("한국교통안전공단 대구", "한국교통안전공단대구 북부출장소"));
    }

    #[test]
    fn test_identical_names_are_not_subsidiary() {
        assert!(!subsidiary("의흥면보건지소", "의흥면보건지소"));
        assert!(!subsidiary("의흥면 보건지소", "의흥면보건지소"));
    }

    #[test]
    fn test_longer_name_suffix_decides() {
        // the shorter name may carry the branch suffix itself
        assert!(subsidiary("의흥면보건지소", "군위군의흥면보건지소"));
        assert!(subsidiary("군위군의흥면보건지소", "의흥면 보건지소"));
        // containment alone is not enough
        assert!(!subsidiary("강남구보건소", "서울강남구보건소"));
    }

    #[test]
    fn test_unrelated_or_empty_names() {
        assert!(!subsidiary("군위군보건소", "효령면보건지소"));
        assert!(!subsidiary("", "의흥면보건지소"));
        assert!(!subsidiary("군위군보건소", "군위군보건소 별관"));
    }
}
