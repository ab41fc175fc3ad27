//! Word co-occurrence graph over ticket titles.
//!
//! Runs on its own tokenization path (see [`content_words`]) rather than on
//! the TF-IDF vocabulary.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use counter::Counter;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{AnalysisError, Result};
use crate::normalize::content_words;

/// Unordered token pair, stored with the smaller token first.
pub type TokenPair = (String, String);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightedEdge {
    pub source: String,
    pub target: String,
    /// Number of titles containing both tokens.
    pub weight: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CooccurrenceGraph {
    /// Tokens touched by at least one retained edge, sorted.
    pub nodes: Vec<String>,
    /// Retained edges sorted by `(source, target)`.
    pub edges: Vec<WeightedEdge>,
    pub density: f64,
    pub degree_centrality: BTreeMap<String, f64>,
    pub most_central: String,
    pub most_central_score: f64,
}

impl CooccurrenceGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// Adds one title's pairs to `counts`. Duplicate tokens in the title count once.
pub fn record_title(counts: &mut Counter<TokenPair>, tokens: &[String]) {
    let unique: BTreeSet<&String> = tokens.iter().collect();
    let unique: Vec<&String> = unique.into_iter().collect();
    for i in 0..unique.len() {
        for j in (i + 1)..unique.len() {
            // BTreeSet order already puts the smaller token first
            let pair = (unique[i].clone(), unique[j].clone());
            counts[&pair] += 1;
        }
    }
}

/// Counts unordered pairs across all titles.
pub fn count_pairs(titles: &[String], excluded: &HashSet<String>) -> Counter<TokenPair> {
    let mut counts: Counter<TokenPair> = Counter::new();
    for title in titles {
        let tokens = content_words(title, excluded);
        record_title(&mut counts, &tokens);
    }
    debug!("Counted {} distinct co-occurring pairs", counts.len());
    counts
}

/// Keeps pairs seen in at least `threshold` titles and derives graph statistics.
pub fn build_graph(counts: &Counter<TokenPair>, threshold: usize) -> Result<CooccurrenceGraph> {
    let mut edges: Vec<WeightedEdge> = counts
        .iter()
        .filter(|(_, &count)| count >= threshold)
        .map(|((a, b), &count)| WeightedEdge {
            source: a.clone(),
            target: b.clone(),
            weight: count,
        })
        .collect();
    if edges.is_empty() {
        return Err(AnalysisError::NoCooccurrenceEdges { threshold });
    }
    edges.sort_by(|x, y| (&x.source, &x.target).cmp(&(&y.source, &y.target)));

    let graph = token_graph(&edges);
    let n = graph.node_count();
    let possible = n * n.saturating_sub(1) / 2;
    let density = if possible > 0 {
        graph.edge_count() as f64 / possible as f64
    } else {
        0.0
    };
    let norm = n.saturating_sub(1).max(1) as f64;

    // Nodes were added in sorted order, so index order is token order
    let mut degree_centrality: BTreeMap<String, f64> = BTreeMap::new();
    let mut most_central = String::new();
    let mut most_central_score = f64::NEG_INFINITY;
    for idx in graph.node_indices() {
        let score = graph.neighbors(idx).count() as f64 / norm;
        if score > most_central_score {
            most_central = graph[idx].clone();
            most_central_score = score;
        }
        degree_centrality.insert(graph[idx].clone(), score);
    }

    info!(
        "Co-occurrence graph - nodes={}, edges={}, density={:.3}, most_central={}",
        n,
        graph.edge_count(),
        density,
        most_central
    );

    Ok(CooccurrenceGraph {
        nodes: graph.node_weights().cloned().collect(),
        edges,
        density,
        degree_centrality,
        most_central,
        most_central_score,
    })
}

/// Undirected token graph over the retained edges, nodes inserted in sorted order.
pub fn token_graph(edges: &[WeightedEdge]) -> UnGraph<String, usize> {
    let tokens: BTreeSet<&String> = edges
        .iter()
        .flat_map(|edge| [&edge.source, &edge.target])
        .collect();

    let mut graph: UnGraph<String, usize> = UnGraph::with_capacity(tokens.len(), edges.len());
    let mut index: HashMap<&str, NodeIndex> = HashMap::new();
    for token in tokens {
        index.insert(token.as_str(), graph.add_node(token.clone()));
    }
    for edge in edges {
        graph.add_edge(
            index[edge.source.as_str()],
            index[edge.target.as_str()],
            edge.weight,
        );
    }
    graph
}

pub fn cooccurrence_graph(
    titles: &[String],
    excluded: &HashSet<String>,
    threshold: usize,
) -> Result<CooccurrenceGraph> {
    build_graph(&count_pairs(titles, excluded), threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pair(a: &str, b: &str) -> TokenPair {
        (a.to_string(), b.to_string())
    }

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_three_tokens_make_three_pairs() {
        let mut counts = Counter::new();
        record_title(&mut counts, &tokens(&["reseau", "wifi", "panne"]));

        assert_eq!(counts.len(), 3);
        assert_eq!(counts[&pair("reseau", "wifi")], 1);
        assert_eq!(counts[&pair("panne", "reseau")], 1);
        assert_eq!(counts[&pair("panne", "wifi")], 1);
    }

    #[test]
    fn test_repeated_tokens_count_once_per_title() {
        let mut counts = Counter::new();
        record_title(&mut counts, &tokens(&["wifi", "wifi", "panne"]));
        record_title(&mut counts, &tokens(&["panne", "wifi"]));
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[&pair("panne", "wifi")], 2);
    }

    #[test]
    fn test_threshold_filters_edges_and_nodes() {
        let mut counts: Counter<TokenPair> = Counter::new();
        counts[&pair("a", "b")] += 5;
        counts[&pair("c", "d")] += 2;

        let graph = build_graph(&counts, 3).unwrap();
        assert_eq!(graph.nodes, vec!["a", "b"]);
        assert_eq!(
            graph.edges,
            vec![WeightedEdge {
                source: "a".into(),
                target: "b".into(),
                weight: 5
            }]
        );
        assert!((graph.density - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_most_central_tie_breaks_lexicographically() {
        let mut counts: Counter<TokenPair> = Counter::new();
        counts[&pair("vpn", "wifi")] += 4;
        counts[&pair("imprimante", "toner")] += 4;

        let graph = build_graph(&counts, 3).unwrap();
        assert_eq!(graph.most_central, "imprimante");
        assert!((graph.most_central_score - 1.0 / 3.0).abs() < 1e-12);
        assert!((graph.density - 2.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_hub_is_most_central() {
        let mut counts: Counter<TokenPair> = Counter::new();
        counts[&pair("panne", "wifi")] += 3;
        counts[&pair("panne", "vpn")] += 3;
        counts[&pair("imprimante", "panne")] += 3;

        let graph = build_graph(&counts, 3).unwrap();
        assert_eq!(graph.most_central, "panne");
        assert!((graph.most_central_score - 1.0).abs() < 1e-12);
        assert!((graph.degree_centrality["wifi"] - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_token_graph_matches_retained_edges() {
        let mut counts: Counter<TokenPair> = Counter::new();
        counts[&pair("panne", "wifi")] += 4;
        counts[&pair("panne", "vpn")] += 3;
        counts[&pair("vpn", "wifi")] += 1;

        let graph = build_graph(&counts, 3).unwrap();
        let undirected = token_graph(&graph.edges);
        assert_eq!(undirected.node_count(), graph.node_count());
        assert_eq!(undirected.edge_count(), graph.edge_count());
        assert_eq!(undirected.node_weights().cloned().collect::<Vec<_>>(), vec!["panne", "vpn", "wifi"]);

        let hub = undirected.node_indices().find(|&idx| undirected[idx] == "panne").unwrap();
        assert_eq!(undirected.neighbors(hub).count(), 2);
        assert!((graph.density - 2.0 / 3.0).abs() < 1e-12);
        assert!((graph.degree_centrality["vpn"] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_no_edges_is_reported() {
        let titles = vec!["wifi panne".to_string(), "vpn lent".to_string()];
        let result = cooccurrence_graph(&titles, &HashSet::new(), 2);
        assert!(matches!(
            result,
            Err(AnalysisError::NoCooccurrenceEdges { threshold: 2 })
        ));
    }

    #[test]
    fn test_end_to_end_from_titles() {
        let titles: Vec<String> = ["Panne wifi bureau", "panne WIFI salle 12", "wifi en panne", "vpn"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        let excluded: HashSet<String> = ["en".to_string()].into_iter().collect();
        let graph = cooccurrence_graph(&titles, &excluded, 3).unwrap();
        assert_eq!(graph.nodes, vec!["panne", "wifi"]);
        assert_eq!(graph.edges[0].weight, 3);
    }

    proptest! {
        #[test]
        fn prop_distinct_tokens_give_all_pairs(words in prop::collection::btree_set("[a-z]{3,6}", 0..8)) {
            let list: Vec<String> = words.iter().cloned().collect();
            let mut counts = Counter::new();
            record_title(&mut counts, &list);
            let m = list.len();
            prop_assert_eq!(counts.len(), m * m.saturating_sub(1) / 2);
            prop_assert!(counts.values().all(|&c| c == 1));
            prop_assert!(counts.keys().all(|(a, b)| a < b));
        }
    }
}
