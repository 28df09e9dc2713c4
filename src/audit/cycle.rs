//! Parent-cycle detection for recursive types

use std::collections::{BTreeMap, HashSet};

/// Walk `start` through the name → parent map.
///
/// Returns the full path (`[A, B, C, A]`) when the walk loops back to `start`.
/// A walk that runs into some other, pre-existing cycle returns `None`: that cycle
/// is reported on its own members, not on every note that hangs off it.
pub fn find_parent_cycle(start: &str, parents: &BTreeMap<String, String>) -> Option<Vec<String>> {
    let mut path = vec![start.to_string()];
    let mut seen: HashSet<&str> = HashSet::from([start]);
    let mut current = start;

    while let Some(next) = parents.get(current) {
        if next == start {
            path.push(next.clone());
            return Some(path);
        }
        if !seen.insert(next.as_str()) {
            return None;
        }
        path.push(next.clone());
        current = next.as_str();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(c, p)| (c.to_string(), p.to_string())).collect()
    }

    #[test]
    fn test_three_node_cycle() {
        let parents = chain(&[("A", "B"), ("B", "C"), ("C", "A")]);
        assert_eq!(
            find_parent_cycle("A", &parents),
            Some(vec!["A".into(), "B".into(), "C".into(), "A".into()])
        );
    }

    #[test]
    fn test_absent_node_has_no_cycle() {
        let parents = chain(&[("A", "B"), ("B", "C"), ("C", "A")]);
        assert_eq!(find_parent_cycle("D", &parents), None);
    }

    #[test]
    fn test_unrelated_cycle_ignored() {
        let parents = chain(&[("E", "A"), ("A", "B"), ("B", "A")]);
        assert_eq!(find_parent_cycle("E", &parents), None);
    }

    #[test]
    fn test_acyclic_chain() {
        let parents = chain(&[("A", "B"), ("B", "C")]);
        assert_eq!(find_parent_cycle("A", &parents), None);
    }
}
