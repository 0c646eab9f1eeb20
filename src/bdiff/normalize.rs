//! Line normalization
//!
//! The last cosmetic filter before diffing: trim every line, collapse each run of whitespace
//! to one space and drop lines that end up empty. Normalizing normalized lines changes
//! nothing.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Normalize one line. The result may be empty.
pub fn normalize_line(line: &str) -> String {
    WHITESPACE_RUN.replace_all(line.trim(), " ").into_owned()
}

/// Split text on `\n` and normalize every line, dropping the empty ones.
pub fn normalize_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(normalize_line)
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_trims_and_collapses() {
        assert_eq!(normalize_line("  return   x +\t1  "), "return x + 1");
    }

    #[test]
    fn test_drops_blank_lines() {
        assert_eq!(
            normalize_lines("a\n\n   \n  b  c\r\n"),
            vec!["a".to_string(), "b c".to_string()]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(normalize_lines("").is_empty());
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(text in "[ \\ta-z\\n]{0,64}") {
            let once = normalize_lines(&text);
            let twice = normalize_lines(&once.join("\n"));
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn normalized_lines_have_no_edge_or_double_whitespace(text in "\\PC{0,64}") {
            for line in normalize_lines(&text) {
                prop_assert!(!line.is_empty());
                prop_assert_eq!(line.trim(), line.as_str());
                prop_assert!(!line.contains("  "));
            }
        }
    }
}
