//! Service name normalization
//!
//! Managed platforms cap resource name length and reject names that end in a
//! separator, so derived names are shortened once when a spec is emitted.

use crate::constants::naming::MAX_SERVICE_NAME_LENGTH;

/// Shorten `name` to at most `max_length` characters.
///
/// Names that already fit are returned unchanged. Longer names are truncated
/// and then stripped of trailing non-alphanumeric characters.
pub fn shorten(name: &str, max_length: usize) -> String {
    if name.chars().count() <= max_length {
        return name.to_string();
    }

    let truncated: String = name.chars().take(max_length).collect();
    truncated
        .trim_end_matches(|c: char| !c.is_alphanumeric())
        .to_string()
}

/// Shorten using the Cloud Run limit
pub fn shorten_default(name: &str) -> String {
    shorten(name, MAX_SERVICE_NAME_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_names_unchanged() {
        assert_eq!(shorten_default("ollama-cr-service"), "ollama-cr-service");
        assert_eq!(shorten_default(""), "");

        let exact = "a".repeat(50);
        assert_eq!(shorten_default(&exact), exact);
    }

    #[test]
    fn test_long_name_truncated() {
        let name = "a".repeat(60);
        assert_eq!(shorten_default(&name), "a".repeat(50));
    }

    #[test]
    fn test_trailing_separator_stripped() {
        // 49 alphanumerics, then a hyphen at position 50, then more
        let name = format!("{}-{}", "b".repeat(49), "c".repeat(5));
        assert_eq!(name.len(), 55);

        let short = shorten_default(&name);
        assert_eq!(short, "b".repeat(49));
        assert!(short.len() < 50);
        assert!(short.chars().last().unwrap().is_alphanumeric());
    }

    #[test]
    fn test_multiple_trailing_separators_stripped() {
        let name = format!("{}--_-{}", "x".repeat(46), "y".repeat(10));
        let short = shorten_default(&name);
        assert_eq!(short, "x".repeat(46));
    }

    #[test]
    fn test_all_separators_becomes_empty() {
        let name = "-".repeat(80);
        assert_eq!(shorten_default(&name), "");
    }

    #[test]
    fn test_custom_max_length() {
        assert_eq!(shorten("abc-def", 4), "abc");
        assert_eq!(shorten("abc-def", 7), "abc-def");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            String::new(),
            "short".to_string(),
            "z".repeat(51),
            format!("{}-{}", "q".repeat(49), "r".repeat(30)),
            format!("{}.-_", "m".repeat(48)),
        ];
        for input in &inputs {
            let once = shorten_default(input);
            assert_eq!(shorten_default(&once), once);
            assert!(once.chars().count() <= 50);
        }
    }
}
