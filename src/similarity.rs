//! Text similarity and near-duplicate pruning for generated candidates.
//!
//! The ratio is the Ratcliff/Obershelp "gestalt" measure: twice the number
//! of characters in recursively found longest common blocks, divided by the
//! total length of both strings.
//!
//! Once the second string reaches [`POPULAR_MIN_LEN`] characters, any
//! character occurring more than `len / 100 + 1` times in it is "popular".
//! Popular characters never seed a block, though a found block still grows
//! across equal neighbours of any kind. In long prose this excludes spaces
//! and common letters, so paraphrases score well below a plain
//! character-level comparison.

use std::collections::{HashMap, HashSet};

use crate::constants::{POPULAR_MIN_LEN, SIMILARITY_PREFIX};

/// Similarity in [0, 1] of the lower-cased first [`SIMILARITY_PREFIX`]
/// characters of each string. Not symmetric for long inputs: popularity is
/// judged on `b`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = prefix_chars(a);
    let b = prefix_chars(b);
    ratio(&a, &b)
}

fn prefix_chars(s: &str) -> Vec<char> {
    s.to_lowercase().chars().take(SIMILARITY_PREFIX).collect()
}

/// Gestalt ratio of two character sequences. Two empty sequences are identical.
pub fn ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let popular = popular_chars(b);
    2.0 * matching_chars(a, b, &popular) as f64 / total as f64
}

/// Characters of `b` too frequent to start a block; empty for short `b`.
fn popular_chars(b: &[char]) -> HashSet<char> {
    if b.len() < POPULAR_MIN_LEN {
        return HashSet::new();
    }
    let limit = b.len() / 100 + 1;
    let mut counts: HashMap<char, usize> = HashMap::new();
    for &c in b {
        *counts.entry(c).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|&(_, n)| n > limit)
        .map(|(c, _)| c)
        .collect()
}

/// Characters covered by the recursive longest-common-block decomposition.
fn matching_chars(a: &[char], b: &[char], popular: &HashSet<char>) -> usize {
    let mut matched = 0;
    let mut stack = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = stack.pop() {
        let (i, j, k) = longest_match(a, b, popular, (alo, ahi), (blo, bhi));
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            stack.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            stack.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// Longest common block in `a[alo..ahi]` and `b[blo..bhi]` built from
/// non-popular characters, earliest in `a` then earliest in `b`, then
/// widened over equal characters on both sides. Returns
/// `(start_a, start_b, len)`.
fn longest_match(
    a: &[char],
    b: &[char],
    popular: &HashSet<char>,
    (alo, ahi): (usize, usize),
    (blo, bhi): (usize, usize),
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    // run[j - blo + 1] = length of the common run ending at a[i], b[j]
    let width = bhi.saturating_sub(blo) + 1;
    let mut prev = vec![0usize; width];
    let mut cur = vec![0usize; width];
    for i in alo..ahi {
        for j in blo..bhi {
            let idx = j - blo + 1;
            if a[i] == b[j] && !popular.contains(&b[j]) {
                let k = prev[idx - 1] + 1;
                cur[idx] = k;
                if k > best_k {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_k = k;
                }
            } else {
                cur[idx] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    while best_i > alo && best_j > blo && a[best_i - 1] == b[best_j - 1] {
        best_i -= 1;
        best_j -= 1;
        best_k += 1;
    }
    while best_i + best_k < ahi && best_j + best_k < bhi && a[best_i + best_k] == b[best_j + best_k]
    {
        best_k += 1;
    }
    (best_i, best_j, best_k)
}

/// Whether `candidate` is more similar than `threshold` to any of `existing`.
pub fn is_duplicate<S: AsRef<str>>(candidate: &str, existing: &[S], threshold: f64) -> bool {
    existing
        .iter()
        .any(|e| similarity(candidate, e.as_ref()) > threshold)
}

/// Greedily keep candidates that are not near-duplicates of an already kept one.
///
/// Input order decides which of two similar candidates survives. If nothing
/// would survive, the first raw candidate is kept.
pub fn prune_similar(candidates: &[String], threshold: f64) -> Vec<String> {
    let mut kept: Vec<String> = Vec::with_capacity(candidates.len());
    for c in candidates {
        if !is_duplicate(c, &kept, threshold) {
            kept.push(c.clone());
        }
    }
    if kept.is_empty() {
        kept.extend(candidates.first().cloned());
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_and_disjoint() {
        assert_eq!(similarity("minimize cost", "minimize cost"), 1.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
        assert_eq!(similarity("", ""), 1.0);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(similarity("Maximize Profit", "maximize profit"), 1.0);
    }

    #[test]
    fn test_known_ratio() {
        // One substituted character out of twenty.
        let a = "abcdefghijklmnopqrst";
        let b = "abcdefghijklmnopqrsX";
        assert!((similarity(a, b) - 0.95).abs() < 1e-12);
        // Two blocks, "ab" and "d": 2 * 3 / 8
        assert!((similarity("abcd", "abxd") - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_only_prefix_is_compared() {
        let head = "x".repeat(SIMILARITY_PREFIX);
        let a = format!("{head}AAAA");
        let b = format!("{head}BBBB");
        assert_eq!(similarity(&a, &b), 1.0);
    }

    #[test]
    fn test_prune_keeps_first_of_duplicates() {
        let candidates = vec![
            "abcdefghijklmnopqrst".to_string(),
            "abcdefghijklmnopqrsX".to_string(),
            "completely different text".to_string(),
        ];
        let kept = prune_similar(&candidates, 0.8);
        assert_eq!(kept, vec![candidates[0].clone(), candidates[2].clone()]);
    }

    const PROFIT: &str = "maximize total profit from producing chairs and tables, where each \
        chair earns 45 dollars and each table earns 80 dollars, subject to the available wood \
        and labor hours in the workshop during a single production week with nonnegative \
        integer quantities.";

    const PROFIT_REWORDED: &str = "maximize the total profit from making chairs and tables, \
        where every chair earns 45 dollars and every table earns 80 dollars, subject to \
        available wood and labour hours in the workshop over one production week with \
        nonnegative integer amounts.";

    #[test]
    fn test_popular_characters_in_long_text() {
        assert_eq!(PROFIT.len(), 253);
        assert_eq!(PROFIT_REWORDED.len(), 243);
        // difflib SequenceMatcher(None, a, b).ratio() on the same inputs
        assert!((similarity(PROFIT_REWORDED, PROFIT) - 0.6975806451612904).abs() < 1e-12);

        // Below the length cutoff every character may seed a block.
        assert!(popular_chars(&prefix_chars(&PROFIT[..199])).is_empty());
        let popular = popular_chars(&prefix_chars(PROFIT));
        assert!(popular.contains(&' '));
        assert!(popular.contains(&'e'));
        assert!(!popular.contains(&'q'));
    }

    #[test]
    fn test_long_paraphrase_survives_pruning() {
        let candidates = vec![PROFIT.to_string(), PROFIT_REWORDED.to_string()];
        assert_eq!(prune_similar(&candidates, 0.8), candidates);
    }

    #[test]
    fn test_found_block_extends_over_popular_characters() {
        // Every character of b is popular, so only the widening step matches.
        let a: Vec<char> = "ab".repeat(100).chars().collect();
        assert_eq!(popular_chars(&a).len(), 2);
        assert_eq!(ratio(&a, &a), 1.0);
    }

    #[test]
    fn test_prune_empty_input() {
        assert!(prune_similar(&[], 0.8).is_empty());
    }
}
