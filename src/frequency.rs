//! Most frequent words in ticket titles.

use std::collections::HashSet;

use counter::Counter;
use serde::Serialize;

use crate::normalize::{content_words, frequency_words};
use crate::stopwords::RESOLVED_STATUSES;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

/// Ranks words by count descending, ties alphabetically.
fn ranked(counts: Counter<String>, top: usize) -> Vec<WordCount> {
    counts
        .most_common_ordered()
        .into_iter()
        .take(top)
        .map(|(word, count)| WordCount { word, count })
        .collect()
}

/// Frequent words over normalized titles (whitespace split, numbers dropped).
pub fn frequent_words(titles: &[String], excluded: &HashSet<String>, top: usize) -> Vec<WordCount> {
    let mut counts: Counter<String> = Counter::new();
    for title in titles {
        for word in frequency_words(title, excluded) {
            counts[&word.to_string()] += 1;
        }
    }
    ranked(counts, top)
}

pub fn is_unresolved(status: Option<&str>) -> bool {
    match status {
        Some(status) => !RESOLVED_STATUSES.contains(&status.trim()),
        None => true,
    }
}

/// Frequent content words among tickets that are still open.
///
/// `tickets` pairs each raw title with its status; missing titles are skipped.
pub fn unresolved_frequent_words<'a, I>(tickets: I, excluded: &HashSet<String>, top: usize) -> Vec<WordCount>
where
    I: IntoIterator<Item = (Option<&'a str>, Option<&'a str>)>,
{
    let mut counts: Counter<String> = Counter::new();
    for (title, status) in tickets {
        let Some(title) = title else { continue };
        if !is_unresolved(status) {
            continue;
        }
        for word in content_words(title, excluded) {
            counts[&word] += 1;
        }
    }
    ranked(counts, top)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wc(word: &str, count: usize) -> WordCount {
        WordCount {
            word: word.to_string(),
            count,
        }
    }

    #[test]
    fn test_frequent_words_ranked_with_ties_alphabetical() {
        let titles: Vec<String> = ["wifi lent", "imprimante wifi", "imprimante écran", "2024 ok"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        let words = frequent_words(&titles, &HashSet::new(), 3);
        assert_eq!(words, vec![wc("imprimante", 2), wc("wifi", 2), wc("lent", 1)]);
    }

    #[test]
    fn test_unresolved_ignores_closed_tickets() {
        let tickets = vec![
            (Some("Panne wifi"), Some("En cours (Attribué)")),
            (Some("Panne imprimante"), Some("Clos")),
            (Some("wifi lent"), None),
            (None, Some("Nouveau")),
        ];
        let words = unresolved_frequent_words(tickets, &HashSet::new(), 15);
        assert_eq!(words, vec![wc("wifi", 2), wc("lent", 1), wc("panne", 1)]);
    }

    #[test]
    fn test_resolved_statuses() {
        assert!(!is_unresolved(Some("Résolu")));
        assert!(!is_unresolved(Some(" Fermé ")));
        assert!(is_unresolved(Some("Nouveau")));
        assert!(is_unresolved(None));
    }
}
