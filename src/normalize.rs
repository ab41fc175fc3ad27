//! Title cleaning and the tokenizers built on top of it.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Word tokens of two or more characters, as used for TF-IDF.
static TERM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").unwrap());

/// Any word token, as used by the co-occurrence tokenizer.
static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b").unwrap());

/// Replaces missing titles with an empty string and lowercases the rest.
///
/// Output is index-aligned with the input.
pub fn normalize_titles<S: AsRef<str>>(titles: &[Option<S>]) -> Vec<String> {
    titles
        .iter()
        .map(|title| match title {
            Some(text) => text.as_ref().to_lowercase(),
            None => String::new(),
        })
        .collect()
}

/// Splits a normalized title into vectorizer terms, dropping excluded ones.
pub fn vectorizer_terms<'a>(text: &'a str, excluded: &HashSet<String>) -> Vec<&'a str> {
    TERM_RE
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|term| !excluded.contains(*term))
        .collect()
}

/// Extracts the meaningful words of a title: no noise words, nothing shorter
/// than three characters, nothing containing a digit.
pub fn content_words(text: &str, excluded: &HashSet<String>) -> Vec<String> {
    let lowered = text.to_lowercase();
    WORD_RE
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|word| {
            !excluded.contains(*word)
                && word.chars().count() > 2
                && !word.chars().any(|c| c.is_ascii_digit() || c.is_numeric())
        })
        .map(|word| word.to_string())
        .collect()
}

/// Whitespace tokens used by the word-frequency chart.
pub fn frequency_words<'a>(text: &'a str, excluded: &HashSet<String>) -> Vec<&'a str> {
    text.split_whitespace()
        .filter(|word| {
            !excluded.contains(&word.to_lowercase())
                && word.chars().count() > 2
                && !word.chars().all(|c| c.is_ascii_digit())
        })
        .collect()
}
