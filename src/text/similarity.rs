//! Edit-distance similarity for matching native TOC entries to body text.

use unicode_normalization::UnicodeNormalization;

/// A candidate must score strictly above this to count as a match.
pub const SIMILARITY_THRESHOLD: f64 = 0.3;

/// `1 - levenshtein / max_len`, computed over characters.
pub fn calc_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - strsim::levenshtein(a, b) as f64 / max_len as f64
}

/// NFKC-fold and collapse whitespace so full-width and half-width forms of
/// the same title compare equal.
pub fn normalize_for_match(text: &str) -> String {
    let folded: String = text.nfkc().collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Index of the best-scoring candidate after position `after`.
///
/// Ties keep the earliest candidate, so the search is order-preserving.
pub fn best_match_after<'a, I>(needle: &str, candidates: I, after: Option<usize>) -> Option<usize>
where
    I: IntoIterator<Item = (usize, &'a str)>,
{
    let needle = normalize_for_match(needle);
    let mut best = SIMILARITY_THRESHOLD;
    let mut found = None;
    for (idx, text) in candidates {
        if after.is_some_and(|a| idx <= a) {
            continue;
        }
        let score = calc_similarity(&needle, &normalize_for_match(text));
        if score > best {
            best = score;
            found = Some(idx);
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_one() {
        assert!((calc_similarity("Introduction", "Introduction") - 1.0).abs() < 1e-9);
        assert!((calc_similarity("", "") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn counts_characters_not_bytes() {
        // one substitution out of four CJK characters
        let s = calc_similarity("第一章节", "第二章节");
        assert!((s - 0.75).abs() < 1e-9);
    }

    #[test]
    fn disjoint_strings_score_low() {
        assert!(calc_similarity("abc", "xyz") <= SIMILARITY_THRESHOLD);
    }

    #[test]
    fn normalization_folds_fullwidth() {
        assert_eq!(normalize_for_match("Ｃｈａｐｔｅｒ  １"), "Chapter 1");
    }

    #[test]
    fn best_match_respects_start_and_ties() {
        let lines = ["Preface", "Chapter 1 Basics", "Chapter 2 Advanced", "Chapter 1 Basics"];
        let candidates = || lines.iter().enumerate().map(|(i, s)| (i, *s));
        assert_eq!(best_match_after("Chapter 1 Basics", candidates(), None), Some(1));
        assert_eq!(best_match_after("Chapter 1 Basics", candidates(), Some(1)), Some(3));
        assert_eq!(best_match_after("Zzzz", candidates(), None), None);
    }
}
