use std::collections::BTreeSet;
use std::collections::HashSet;

use unicode_segmentation::UnicodeSegmentation;

/// Word overlap at or above which two normalized texts count as the same.
pub const NEAR_IDENTICAL_OVERLAP: f64 = 0.9;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "in", "is",
    "it", "its", "of", "on", "or", "our", "the", "their", "this", "to", "was", "we", "were",
    "will", "with", "you", "your",
];

/// Lower-case, drop punctuation and collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    text.unicode_words()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized words of `text`, in order.
pub fn words(text: &str) -> Vec<String> {
    text.unicode_words().map(|w| w.to_lowercase()).collect()
}

/// Compute a simple word-overlap score between two strings (Jaccard-like).
/// Returns a value between 0.0 (no overlap) and 1.0 (identical word sets).
pub fn content_overlap_score(a: &str, b: &str) -> f64 {
    let words_a: HashSet<String> = words(a).into_iter().collect();
    let words_b: HashSet<String> = words(b).into_iter().collect();

    if words_a.is_empty() && words_b.is_empty() {
        return 1.0;
    }
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();

    intersection as f64 / union as f64
}

/// Tokens that carry a value: anything with a digit, and single letters
/// that are not stop words ("suite b", "5", "9am").
pub fn value_tokens(text: &str) -> BTreeSet<String> {
    words(text)
        .into_iter()
        .filter(|w| {
            w.chars().any(|c| c.is_numeric())
                || (w.chars().count() == 1 && !STOP_WORDS.contains(&w.as_str()))
        })
        .collect()
}

/// Equal after normalization, or overlapping almost entirely with exactly
/// the same values. A changed number is never near-identical.
pub fn is_near_identical(a: &str, b: &str) -> bool {
    if normalize_text(a) == normalize_text(b) {
        return true;
    }
    value_tokens(a) == value_tokens(b) && content_overlap_score(a, b) >= NEAR_IDENTICAL_OVERLAP
}

/// Content words of `text`: normalized, without stop words or single letters.
pub fn significant_words(text: &str) -> BTreeSet<String> {
    words(text)
        .into_iter()
        .filter(|w| w.chars().count() > 1 && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// Cosine similarity of two equal-length vectors. Zero for empty or mismatched input.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_punctuation_and_case() {
        assert_eq!(
            normalize_text("  We're OPEN:   9am–5pm, Mon-Fri! "),
            "we're open 9am 5pm mon fri"
        );
    }

    #[test]
    fn test_content_overlap_identical() {
        let s1 = "hello world foo";
        let s2 = "Hello, world. Foo";
        assert!((content_overlap_score(s1, s2) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_content_overlap_none() {
        assert!(content_overlap_score("hello world", "foo bar baz").abs() < f64::EPSILON);
    }

    #[test]
    fn test_near_identical() {
        assert!(is_near_identical(
            "Our phone number is 555-0100.",
            "our phone number is 555 0100"
        ));
        assert!(!is_near_identical(
            "Our phone number is 555-0100",
            "Our phone number is 555-0199"
        ));
    }

    #[test]
    fn test_single_digit_change_is_not_near_identical() {
        assert!(!is_near_identical(
            "Delivery fee is 5 dollars",
            "Delivery fee is 7 dollars"
        ));
        assert!(!is_near_identical("Parking is in lot A", "Parking is in lot B"));
    }

    #[test]
    fn test_long_text_with_changed_value_is_not_near_identical() {
        let before = "Customers may park in the rear lot behind the bakery on weekdays and \
                      weekends, overnight parking is not permitted, and the daily parking \
                      fee for visitors who stay longer than two hours is 20 dollars payable \
                      at the front counter or by phone before leaving the premises";
        let after = before.replace("20 dollars", "35 dollars");
        assert!(content_overlap_score(before, &after) >= NEAR_IDENTICAL_OVERLAP);
        assert!(!is_near_identical(before, &after));
    }

    #[test]
    fn test_long_text_with_same_values_is_near_identical() {
        let before = "Customers may park in the rear lot behind the bakery on weekdays and \
                      weekends and the daily parking fee for visitors is 20 dollars payable \
                      at the front counter before leaving the premises";
        let after = format!("{before} today");
        assert!(is_near_identical(before, &after));
    }

    #[test]
    fn test_value_tokens_keep_digits_and_single_letters() {
        let values = value_tokens("Suite B is open 9am to 5 pm, a short walk");
        assert_eq!(
            values.into_iter().collect::<Vec<_>>(),
            vec!["5", "9am", "b"]
        );
    }

    #[test]
    fn test_significant_words_drop_stop_words() {
        let words = significant_words("The store is open on Sundays");
        assert_eq!(
            words.into_iter().collect::<Vec<_>>(),
            vec!["open", "store", "sundays"]
        );
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
