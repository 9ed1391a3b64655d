//! Fuzzy title similarity
//!
//! Token-set ratio on a 0-100 scale: titles are lowercased, punctuation is
//! dropped, and the scores of the shared tokens against each title's
//! remainder are compared. A title whose tokens are a subset of the other's
//! scores 100 ("EcoClean Spray" vs "EcoClean Spray 16 oz").

use std::collections::BTreeSet;

/// Lowercase and replace every non-alphanumeric character with a space
fn normalize(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect()
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut prev_row = vec![0usize; b.len() + 1];
    let mut curr_row = vec![0usize; b.len() + 1];

    for a_char in a {
        for (j, b_char) in b.iter().enumerate() {
            curr_row[j + 1] = if a_char == b_char {
                prev_row[j] + 1
            } else {
                prev_row[j + 1].max(curr_row[j])
            };
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b.len()]
}

/// Normalized indel similarity of two strings, 0-100
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(&a, &b) as f64 / total as f64
}

fn score_from_distance(distance: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    100.0 - 100.0 * distance as f64 / total as f64
}

fn join(tokens: &BTreeSet<&str>) -> String {
    tokens.iter().copied().collect::<Vec<_>>().join(" ")
}

/// Token-set similarity of two titles, 0-100
///
/// Empty titles score 0.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();

    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersection: BTreeSet<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let diff_ab: BTreeSet<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let diff_ba: BTreeSet<&str> = tokens_b.difference(&tokens_a).copied().collect();

    if !intersection.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
        return 100.0;
    }

    let diff_ab_joined = join(&diff_ab);
    let diff_ba_joined = join(&diff_ba);
    let ab_len = diff_ab_joined.chars().count();
    let ba_len = diff_ba_joined.chars().count();
    let sect_len = join(&intersection).chars().count();

    let result = ratio(&diff_ab_joined, &diff_ba_joined);
    if sect_len == 0 {
        return result;
    }

    // "sect" vs "sect + ' ' + diff" differs only by the appended remainder
    let sect_ab_dist = 1 + ab_len;
    let sect_ba_dist = 1 + ba_len;
    let sect_ab_ratio = score_from_distance(sect_ab_dist, 2 * sect_len + sect_ab_dist);
    let sect_ba_ratio = score_from_distance(sect_ba_dist, 2 * sect_len + sect_ba_dist);

    result.max(sect_ab_ratio).max(sect_ba_ratio)
}
