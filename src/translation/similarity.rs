/*!
 * Fuzzy text similarity used to deduplicate improvement hints.
 */

use std::collections::HashSet;

const WORD_WEIGHT: f64 = 0.7;
const CHAR_WEIGHT: f64 = 0.3;

fn jaccard<T: Eq + std::hash::Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

fn word_trigrams<'a>(words: &[&'a str]) -> HashSet<Vec<&'a str>> {
    words.windows(3).map(|w| w.to_vec()).collect()
}

fn char_trigrams(text: &str) -> HashSet<String> {
    let chars: Vec<char> = text
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    chars.windows(3).map(|w| w.iter().collect()).collect()
}

/// Similarity of two texts in `[0, 1]`.
///
/// Identical texts score 1, an empty text scores 0. Texts with fewer than
/// three words are compared as word sets; longer ones blend word-trigram and
/// character-trigram Jaccard indices. Callers lowercase both sides.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let words_a: Vec<&str> = a.split_whitespace().collect();
    let words_b: Vec<&str> = b.split_whitespace().collect();

    if words_a.len() < 3 || words_b.len() < 3 {
        let set_a: HashSet<&str> = words_a.into_iter().collect();
        let set_b: HashSet<&str> = words_b.into_iter().collect();
        return jaccard(&set_a, &set_b);
    }

    let word_score = jaccard(&word_trigrams(&words_a), &word_trigrams(&words_b));
    let char_score = jaccard(&char_trigrams(a), &char_trigrams(b));

    WORD_WEIGHT * word_score + CHAR_WEIGHT * char_score
}
