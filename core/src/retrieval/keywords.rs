//! Keyword extraction from issue and query text
//!
//! Tokens are case-folded and hyphen-normalized ("failed-solution" yields
//! "failed" and "solution"), short tokens and common words are dropped, and
//! order of first appearance is preserved.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Words too common to carry retrieval signal.
///
/// TODO: `test`, `data`, `file`, `error` and `result` are load-bearing in
/// real issue text; measure recall impact before relying on keyword search
/// for error-shaped issues.
static COMMON_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "about", "after", "all", "also", "and", "any", "are", "because", "been", "before",
        "but", "can", "code", "could", "data", "did", "does", "error", "file", "files",
        "for", "from", "function", "get", "had", "has", "have", "how", "into", "its",
        "just", "like", "line", "more", "new", "not", "now", "one", "only", "other",
        "our", "out", "over", "result", "results", "return", "set", "should", "some",
        "test", "tests", "than", "that", "the", "their", "them", "then", "there", "these",
        "they", "this", "type", "use", "used", "using", "value", "was", "were", "what",
        "when", "where", "which", "will", "with", "would", "you", "your",
    ]
    .into_iter()
    .collect()
});

/// True if the word is too common to search for.
pub fn is_common_word(word: &str) -> bool {
    COMMON_WORDS.contains(word)
}

/// Case-folded, hyphen-normalized tokens of at least three characters,
/// common words removed. Duplicates are kept; callers dedupe as needed.
pub fn normalize_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 3)
        .map(str::to_ascii_lowercase)
        .filter(|t| !is_common_word(t))
        .collect()
}

/// Distinct keywords for search fan-out, capped at `max`.
pub fn extract_keywords(text: &str, max: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keywords = Vec::new();
    for token in normalize_tokens(text) {
        if seen.insert(token.clone()) {
            keywords.push(token);
            if keywords.len() == max {
                break;
            }
        }
    }
    keywords
}

#[allow(clippy::expect_used)]
static FILE_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    // Path-shaped tokens with a code-ish extension
    Regex::new(r"[A-Za-z0-9_./-]+\.(?:rs|go|ts|tsx|js|jsx|py|java|rb|c|h|cpp|hpp|toml|yaml|yml|json)\b")
        .expect("file reference pattern is valid")
});

/// File paths mentioned verbatim in the text, in order of first appearance.
pub fn extract_file_references(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    FILE_REFERENCE
        .find_iter(text)
        .map(|m| m.as_str().trim_start_matches("./").to_string())
        .filter(|p| seen.insert(p.clone()))
        .collect()
}

#[allow(clippy::expect_used)]
static SYMBOL_CANDIDATE: Lazy<Regex> = Lazy::new(|| {
    // CamelCase or snake_case identifiers of some substance
    Regex::new(r"\b(?:[A-Z][a-z0-9]+(?:[A-Z][a-z0-9]+)+|[a-z][a-z0-9]+(?:_[a-z0-9]+)+)\b")
        .expect("symbol candidate pattern is valid")
});

/// Identifier-shaped tokens worth a definition search.
pub fn extract_symbol_candidates(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    SYMBOL_CANDIDATE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_common_words_filtered() {
        assert!(is_common_word("the"));
        assert!(is_common_word("error"));
        assert!(is_common_word("test"));
        assert!(!is_common_word("handler"));
    }

    #[test]
    fn test_normalize_splits_hyphens_and_folds_case() {
        let tokens = normalize_tokens("Original-Error in Handler");
        assert_eq!(tokens, vec!["original", "handler"]);
    }

    #[test]
    fn test_extract_keywords_dedupes_and_caps() {
        let keywords = extract_keywords("cache cache invalidation cache eviction", 2);
        assert_eq!(keywords, vec!["cache", "invalidation"]);
    }

    #[test]
    fn test_extract_file_references() {
        let refs = extract_file_references(
            "panic in ./src/handler.go after editing config.toml; see src/handler.go again",
        );
        assert_eq!(refs, vec!["src/handler.go", "config.toml"]);
    }

    #[test]
    fn test_extract_symbol_candidates() {
        let symbols = extract_symbol_candidates("ResolveModel fails when parse_model_string runs");
        assert!(symbols.contains(&"ResolveModel".to_string()));
        assert!(symbols.contains(&"parse_model_string".to_string()));
    }
}
