use serde::{Deserialize, Serialize};

use crate::intelligence::utils::{content_overlap_score, normalize_text, words};

/// Result of a heuristic contradiction check between two facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContradictionSignal {
    /// No contradiction detected
    None,
    /// Weak signal, e.g. the same subject with a different value
    Weak,
    /// Pattern-matched negation or antonym on otherwise matching text
    Strong,
}

impl ContradictionSignal {
    pub fn is_strong(&self) -> bool {
        matches!(self, Self::Strong)
    }
}

impl std::fmt::Display for ContradictionSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Weak => write!(f, "weak"),
            Self::Strong => write!(f, "strong"),
        }
    }
}

/// Opposites that commonly flip a business fact.
const ANTONYM_PAIRS: &[(&str, &str)] = &[
    ("open", "closed"),
    ("opened", "closed"),
    ("available", "unavailable"),
    ("accept", "decline"),
    ("accepts", "declines"),
    ("include", "exclude"),
    ("includes", "excludes"),
    ("included", "excluded"),
    ("allowed", "prohibited"),
    ("allow", "forbid"),
    ("free", "paid"),
    ("active", "inactive"),
    ("enabled", "disabled"),
    ("always", "never"),
    ("yes", "no"),
    ("offer", "discontinue"),
    ("offers", "discontinued"),
];

/// Negations, as single words or as word sequences.
const NEGATIONS: &[&[&str]] = &[
    &["not"],
    &["no"],
    &["never"],
    &["doesn't"],
    &["does", "not"],
    &["don't"],
    &["do", "not"],
    &["isn't"],
    &["aren't"],
    &["won't"],
    &["will", "not"],
    &["can't"],
    &["cannot"],
    &["no", "longer"],
];

/// Heuristic contradiction detector using word patterns.
///
/// No embeddings and no LLM calls. It only catches obvious flips so the
/// resolver can skip the classifier for them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContradictionDetector;

impl ContradictionDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn check(&self, existing: &str, new: &str) -> ContradictionSignal {
        let existing_words = words(existing);
        let new_words = words(new);

        if normalize_text(existing) == normalize_text(new) {
            return ContradictionSignal::None;
        }

        if let Some(signal) = check_negation(&existing_words, &new_words) {
            return signal;
        }

        if let Some(signal) = check_antonyms(&existing_words, &new_words) {
            return signal;
        }

        if let Some(signal) = check_value_swap(&existing_words, &new_words) {
            return signal;
        }

        ContradictionSignal::None
    }
}

/// "We deliver on Sundays" vs "We do not deliver on Sundays".
fn check_negation(existing: &[String], new: &[String]) -> Option<ContradictionSignal> {
    let existing_negated = strip_negations(existing);
    let new_negated = strip_negations(new);

    let (positive, negated) = match (existing_negated, new_negated) {
        (None, Some(stripped)) => (existing.join(" "), stripped.join(" ")),
        (Some(stripped), None) => (new.join(" "), stripped.join(" ")),
        _ => return None,
    };

    if content_overlap_score(&positive, &negated) >= 0.6 {
        Some(ContradictionSignal::Strong)
    } else {
        None
    }
}

/// "The patio is open in winter" vs "The patio is closed in winter".
fn check_antonyms(existing: &[String], new: &[String]) -> Option<ContradictionSignal> {
    for &(a, b) in ANTONYM_PAIRS {
        let a_in_existing = contains_word(existing, a);
        let b_in_existing = contains_word(existing, b);
        let a_in_new = contains_word(new, a);
        let b_in_new = contains_word(new, b);

        let crossed = (a_in_existing && b_in_new && !b_in_existing && !a_in_new)
            || (b_in_existing && a_in_new && !a_in_existing && !b_in_new);
        if !crossed {
            continue;
        }

        let without = |ws: &[String]| {
            ws.iter()
                .filter(|w| w.as_str() != a && w.as_str() != b)
                .cloned()
                .collect::<Vec<_>>()
                .join(" ")
        };
        let overlap = content_overlap_score(&without(existing), &without(new));
        if overlap > 0.5 {
            return Some(ContradictionSignal::Strong);
        } else if overlap > 0.3 {
            return Some(ContradictionSignal::Weak);
        }
    }
    None
}

/// "Delivery fee is 5 dollars" vs "Delivery fee is 7 dollars".
fn check_value_swap(existing: &[String], new: &[String]) -> Option<ContradictionSignal> {
    for pivot in ["is", "are", "costs", "at"] {
        let (Some(ex_pos), Some(new_pos)) = (
            existing.iter().position(|w| w == pivot),
            new.iter().position(|w| w == pivot),
        ) else {
            continue;
        };

        let ex_subject = existing[..ex_pos].join(" ");
        let new_subject = new[..new_pos].join(" ");
        let ex_value = &existing[ex_pos + 1..];
        let new_value = &new[new_pos + 1..];

        if ex_value.is_empty() || new_value.is_empty() || ex_value == new_value {
            continue;
        }
        // An extension of the old value is not a contradiction
        if is_word_subset(ex_value, new_value) || is_word_subset(new_value, ex_value) {
            continue;
        }
        if content_overlap_score(&ex_subject, &new_subject) > 0.7 {
            return Some(ContradictionSignal::Weak);
        }
    }
    None
}

fn contains_word(words: &[String], word: &str) -> bool {
    words.iter().any(|w| w == word)
}

/// The words with every negation removed, or `None` if there was none.
fn strip_negations(words: &[String]) -> Option<Vec<String>> {
    // Longest phrases first so "no longer" is not read as "no"
    let mut phrases: Vec<&[&str]> = NEGATIONS.to_vec();
    phrases.sort_by_key(|p| std::cmp::Reverse(p.len()));

    let mut out = Vec::with_capacity(words.len());
    let mut found = false;
    let mut i = 0;

    'outer: while i < words.len() {
        for phrase in &phrases {
            let end = i + phrase.len();
            if end <= words.len() && words[i..end].iter().zip(phrase.iter()).all(|(w, p)| w == p) {
                found = true;
                i = end;
                continue 'outer;
            }
        }
        out.push(words[i].clone());
        i += 1;
    }

    found.then_some(out)
}

fn is_word_subset(subset: &[String], superset: &[String]) -> bool {
    subset.iter().all(|w| superset.contains(w))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> ContradictionDetector {
        ContradictionDetector::new()
    }

    #[test]
    fn test_identical_text_is_not_a_contradiction() {
        assert_eq!(
            detector().check("We open at 9am.", "we open at 9am"),
            ContradictionSignal::None
        );
    }

    #[test]
    fn test_negation_is_strong() {
        assert_eq!(
            detector().check("We deliver on Sundays", "We do not deliver on Sundays"),
            ContradictionSignal::Strong
        );
        assert_eq!(
            detector().check("We no longer deliver on Sundays", "We deliver on Sundays"),
            ContradictionSignal::Strong
        );
    }

    #[test]
    fn test_negation_on_unrelated_text_is_ignored() {
        assert_eq!(
            detector().check("We accept credit cards", "Parking is not available downtown"),
            ContradictionSignal::None
        );
    }

    #[test]
    fn test_antonym_is_strong() {
        assert_eq!(
            detector().check(
                "The patio is open during winter",
                "The patio is closed during winter"
            ),
            ContradictionSignal::Strong
        );
    }

    #[test]
    fn test_word_matching_is_whole_word() {
        // "now" must not be read as "no"
        assert_eq!(
            detector().check("Lunch is served until 3pm", "Lunch is now served until 4pm"),
            ContradictionSignal::Weak
        );
    }

    #[test]
    fn test_value_swap_is_weak() {
        assert_eq!(
            detector().check("The delivery fee is 5 dollars", "The delivery fee is 7 dollars"),
            ContradictionSignal::Weak
        );
    }

    #[test]
    fn test_value_extension_is_not_a_contradiction() {
        assert_eq!(
            detector().check("Our brunch menu is vegan", "Our brunch menu is vegan and gluten free"),
            ContradictionSignal::None
        );
    }
}
