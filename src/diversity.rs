//! Thematic diversity of a clustering, measured as Shannon entropy.

use serde::Serialize;

/// Shannon entropy (natural log) of the cluster-size distribution.
///
/// Only clusters with at least one document contribute. The value lies in
/// `[0, ln k]`: zero when a single cluster holds everything, `ln k` when all
/// `k` clusters are the same size.
pub fn cluster_entropy(assignment: &[usize], n_clusters: usize) -> f64 {
    if assignment.is_empty() {
        return 0.0;
    }
    let mut sizes = vec![0usize; n_clusters];
    for &cluster in assignment {
        sizes[cluster] += 1;
    }
    entropy_of_counts(&sizes)
}

pub fn entropy_of_counts(counts: &[usize]) -> f64 {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    let h: f64 = counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.ln()
        })
        .sum();
    // Guard against -0.0 and tiny negative rounding
    h.max(0.0)
}

/// Entropy together with its ceiling for the chosen cluster count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diversity {
    pub entropy: f64,
    pub max_entropy: f64,
    /// `entropy / max_entropy * 100`.
    pub percent: f64,
}

impl Diversity {
    pub fn from_assignment(assignment: &[usize], n_clusters: usize) -> Self {
        let entropy = cluster_entropy(assignment, n_clusters);
        let max_entropy = (n_clusters as f64).ln();
        let percent = if max_entropy > 0.0 {
            entropy / max_entropy * 100.0
        } else {
            0.0
        };
        Diversity {
            entropy,
            max_entropy,
            percent,
        }
    }
}
