//! English pluralization for deriving storage directories

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("criterion", "criteria"),
    ("analysis", "analyses"),
    ("thesis", "theses"),
];

const UNCOUNTABLE: &[&str] = &["research", "information", "software", "equipment", "news", "series", "feedback"];

/// Pluralize a type name.
///
/// Only the last word of a multi-word name is pluralized, so `"daily note"`
/// becomes `"daily notes"`.
pub fn pluralize(name: &str) -> String {
    let split = name
        .rfind(|c: char| c == ' ' || c == '-' || c == '_')
        .map(|i| i + 1)
        .unwrap_or(0);
    let (head, word) = name.split_at(split);
    format!("{}{}", head, pluralize_word(word))
}

fn pluralize_word(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    let lower = word.to_lowercase();

    if UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == lower) {
        return preserve_case(word, plural);
    }

    if let Some(stem) = lower.strip_suffix('y') {
        let before = stem.chars().last();
        if matches!(before, Some(c) if !"aeiou".contains(c)) {
            return format!("{}ies", &word[..word.len() - 1]);
        }
    }
    if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        return format!("{}es", word);
    }
    format!("{}s", word)
}

fn preserve_case(original: &str, plural: &str) -> String {
    let mut chars = original.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => {
            let mut out: String = plural.chars().take(1).flat_map(char::to_uppercase).collect();
            out.push_str(&plural[1..]);
            out
        }
        _ => plural.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_rules() {
        assert_eq!(pluralize("task"), "tasks");
        assert_eq!(pluralize("story"), "stories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("match"), "matches");
        assert_eq!(pluralize("class"), "classes");
    }

    #[test]
    fn test_irregular_and_uncountable() {
        assert_eq!(pluralize("person"), "people");
        assert_eq!(pluralize("Person"), "People");
        assert_eq!(pluralize("research"), "research");
    }

    #[test]
    fn test_multi_word_names() {
        assert_eq!(pluralize("daily note"), "daily notes");
        assert_eq!(pluralize("user-story"), "user-stories");
    }
}
