// src/matching/edit_distance.rs
use strsim::levenshtein;

/// Unit-cost insert/delete/substitute distance, counted in characters.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    levenshtein(a, b)
}

/// Edit distance scaled to 0..=100, where 100 means identical.
pub fn similarity_score(a: &str, b: &str) -> u32 {
    if a == b {
        return 100;
    }
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 100;
    }
    let distance = levenshtein_distance(a, b) as f64;
    (100.0 - distance / max_len as f64 * 100.0).round().max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_counts_characters_not_bytes() {
        assert_eq!(levenshtein_distance("보건소", "보건지소"), 1);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("", "의흥면"), 3);
    }

    #[test]
    fn test_identical_strings_score_full() {
        for s in ["", "군위군", "서울강남구역삼동123", "a"] {
            assert_eq!(similarity_score(s, s), 100);
        }
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let pairs = [
            ("강남구", "서초구정신건강복지"),
            ("서울강남구역삼동123", "서울강남구역삼동124"),
            ("", "abc"),
            ("의흥면", "효령면"),
        ];
        for (a, b) in pairs {
            assert_eq!(similarity_score(a, b), similarity_score(b, a));
        }
    }

    #[test]
    fn test_similarity_values() {
        // one substitution over eleven characters
        assert_eq!(similarity_score("서울강남구역삼동123", "서울강남구역삼동124"), 91);
        assert_eq!(similarity_score("강남구", "서초구정신건강복지"), 11);
        assert_eq!(similarity_score("", "abc"), 0);
        assert_eq!(similarity_score("의흥면", "효령면"), 33);
    }
}
