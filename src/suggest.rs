//! Nearest-name suggestions
//!
//! Every suggestion here is advisory: it ends up in an issue message or payload and
//! never changes what gets reported.

use std::collections::HashSet;

/// Maximum number of similar names attached to a stale reference
pub const MAX_SIMILAR: usize = 5;

/// Levenshtein distance over chars
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Edit distance, or `None` once it is known to exceed `max`
pub fn bounded_edit_distance(a: &str, b: &str, max: usize) -> Option<usize> {
    let (la, lb) = (a.chars().count(), b.chars().count());
    if la.abs_diff(lb) > max {
        return None;
    }
    let d = edit_distance(a, b);
    (d <= max).then_some(d)
}

/// Distance bound used for a value of the given length
pub fn default_bound(value: &str) -> usize {
    (value.chars().count() / 3).max(2)
}

/// Closest candidate within the default bound, compared case-insensitively.
///
/// Ties go to the candidate that comes first, so callers should pass a stable order.
pub fn closest<'a, I>(value: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let needle = value.to_lowercase();
    let bound = default_bound(value);
    let mut best: Option<(usize, &'a str)> = None;
    for candidate in candidates {
        if candidate == value {
            continue;
        }
        let Some(d) = bounded_edit_distance(&needle, &candidate.to_lowercase(), bound) else {
            continue;
        };
        if best.map(|(bd, _)| d < bd).unwrap_or(true) {
            best = Some((d, candidate));
        }
    }
    best.map(|(_, c)| c)
}

fn tokens(s: &str) -> HashSet<String> {
    s.split(|c: char| c.is_whitespace() || c == '-' || c == '_' || c == '/' || c == '.')
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Similarity of `candidate` to `target`; zero means unrelated
pub fn similarity(target: &str, candidate: &str) -> u32 {
    let t = target.to_lowercase();
    let c = candidate.to_lowercase();
    if t.is_empty() || c.is_empty() {
        return 0;
    }

    let mut score = 0;
    if c.starts_with(&t) || t.starts_with(&c) {
        score += 100;
    } else if c.contains(&t) || t.contains(&c) {
        score += 60;
    }

    let shared = tokens(&t).intersection(&tokens(&c)).count() as u32;
    score += shared * 20;

    if let Some(d) = bounded_edit_distance(&t, &c, default_bound(&t)) {
        score += 50u32.saturating_sub(d as u32 * 10);
    }
    score
}

/// Up to `limit` candidates ranked by [`similarity`], best first, ties by name
pub fn rank_similar<'a, I>(target: &str, candidates: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut scored: Vec<(u32, &str)> = candidates
        .into_iter()
        .filter(|c| *c != target)
        .map(|c| (similarity(target, c), c))
        .filter(|(score, _)| *score > 0)
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored.dedup_by(|a, b| a.1 == b.1);
    scored.into_iter().take(limit).map(|(_, c)| c.to_string()).collect()
}
