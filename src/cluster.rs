//! K-means clustering of TF-IDF rows and keyword extraction per cluster.
//!
//! Lloyd's algorithm with k-means++ seeding. Rows stay sparse, centroids are
//! dense vectors over the vocabulary.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::KMeansConfig;
use crate::error::{AnalysisError, Diagnostic, Result};
use crate::tfidf::{DocumentTermMatrix, Vocabulary};

type SparseRow = Vec<(usize, f64)>;

/// Output of a k-means fit.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterModel {
    /// Cluster id per document, aligned with the corpus.
    pub assignment: Vec<usize>,
    /// One dense vector per cluster over the vocabulary.
    pub centroids: Vec<Vec<f64>>,
    pub inertia: f64,
    pub iterations: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl ClusterModel {
    pub fn n_clusters(&self) -> usize {
        self.centroids.len()
    }

    /// Document count per cluster id.
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters()];
        for &cluster in &self.assignment {
            sizes[cluster] += 1;
        }
        sizes
    }

    /// Top `n` terms of each centroid, heaviest first, ties by vocabulary index.
    pub fn keywords(&self, vocabulary: &Vocabulary, n: usize) -> Vec<Vec<String>> {
        self.centroids
            .iter()
            .map(|centroid| vocabulary.top_terms(centroid, n))
            .collect()
    }

    /// Documents belonging to `cluster`, in corpus order.
    pub fn members(&self, cluster: usize) -> Vec<usize> {
        self.assignment
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == cluster)
            .map(|(doc, _)| doc)
            .collect()
    }
}

pub struct KMeans {
    n_clusters: usize,
    config: KMeansConfig,
    seed: u64,
}

struct Run {
    assignment: Vec<usize>,
    centroids: Vec<Vec<f64>>,
    inertia: f64,
    iterations: usize,
    diagnostics: Vec<Diagnostic>,
}

impl KMeans {
    pub fn new(n_clusters: usize, config: KMeansConfig, seed: u64) -> Self {
        KMeans {
            n_clusters,
            config,
            seed,
        }
    }

    pub fn fit(&self, dtm: &DocumentTermMatrix) -> Result<ClusterModel> {
        let distinct = dtm.distinct_rows();
        if self.n_clusters < 2 || self.n_clusters > distinct {
            return Err(AnalysisError::InvalidClusterCount {
                requested: self.n_clusters,
                distinct_documents: distinct,
            });
        }

        let rows = dtm.rows();
        let n_features = dtm.n_terms();
        let norms: Vec<f64> = rows.iter().map(|row| sq_norm(row)).collect();
        let tolerance = self.config.tolerance * mean_column_variance(&rows, n_features);

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<Run> = None;

        for restart in 0..self.config.restarts {
            let run = self.run_once(&rows, &norms, n_features, tolerance, &mut rng);
            debug!(
                "K-means restart {} - inertia={:.6}, iterations={}",
                restart, run.inertia, run.iterations
            );
            let better = match &best {
                Some(current) => run.inertia < current.inertia,
                None => true,
            };
            if better {
                best = Some(run);
            }
        }

        let Some(mut run) = best else {
            return Err(AnalysisError::invalid_config("kmeans restarts must be >= 1"));
        };

        let mut sizes = vec![0usize; self.n_clusters];
        for &cluster in &run.assignment {
            sizes[cluster] += 1;
        }
        run.diagnostics.extend(empty_clusters(&sizes));

        info!(
            "K-means fitted - k={}, documents={}, inertia={:.4}, sizes={:?}",
            self.n_clusters,
            rows.len(),
            run.inertia,
            sizes
        );

        Ok(ClusterModel {
            assignment: run.assignment,
            centroids: run.centroids,
            inertia: run.inertia,
            iterations: run.iterations,
            diagnostics: run.diagnostics,
        })
    }

    fn run_once(
        &self,
        rows: &[SparseRow],
        norms: &[f64],
        n_features: usize,
        tolerance: f64,
        rng: &mut StdRng,
    ) -> Run {
        let k = self.n_clusters;
        let mut centroids = self.init_plus_plus(rows, norms, n_features, rng);
        let mut assignment = vec![0usize; rows.len()];
        let mut distances = vec![0.0f64; rows.len()];
        let mut diagnostics = Vec::new();
        let mut iterations = 0;

        for iteration in 0..self.config.max_iterations {
            iterations = iteration + 1;
            assign(rows, norms, &centroids, &mut assignment, &mut distances);

            let updated = update_centroids(
                rows,
                &assignment,
                &mut distances,
                k,
                n_features,
                iteration,
                &mut diagnostics,
            );

            let shift: f64 = centroids
                .iter()
                .zip(updated.iter())
                .map(|(old, new)| {
                    old.iter()
                        .zip(new.iter())
                        .map(|(a, b)| (a - b) * (a - b))
                        .sum::<f64>()
                })
                .sum();
            centroids = updated;

            if shift <= tolerance {
                break;
            }
        }

        assign(rows, norms, &centroids, &mut assignment, &mut distances);
        let inertia = distances.iter().sum();

        Run {
            assignment,
            centroids,
            inertia,
            iterations,
            diagnostics,
        }
    }

    /// k-means++ seeding: each new centre is drawn with probability
    /// proportional to the squared distance to the nearest chosen centre.
    fn init_plus_plus(
        &self,
        rows: &[SparseRow],
        norms: &[f64],
        n_features: usize,
        rng: &mut StdRng,
    ) -> Vec<Vec<f64>> {
        let n = rows.len();
        let first = rng.gen_range(0..n);
        let mut centroids = vec![densify(&rows[first], n_features)];
        let mut closest: Vec<f64> = (0..n)
            .map(|doc| sq_distance(&rows[doc], norms[doc], &centroids[0], norms[first]))
            .collect();

        while centroids.len() < self.n_clusters {
            let total: f64 = closest.iter().sum();
            let chosen = if total > 0.0 {
                let target = rng.gen::<f64>() * total;
                let mut cumulative = 0.0;
                let mut pick = None;
                for (doc, &d) in closest.iter().enumerate() {
                    cumulative += d;
                    if d > 0.0 && cumulative >= target {
                        pick = Some(doc);
                        break;
                    }
                }
                // Rounding can leave target just above the final sum
                pick.or_else(|| closest.iter().rposition(|&d| d > 0.0))
                    .unwrap_or(0)
            } else {
                rng.gen_range(0..n)
            };

            let centre = densify(&rows[chosen], n_features);
            for doc in 0..n {
                let d = sq_distance(&rows[doc], norms[doc], &centre, norms[chosen]);
                if d < closest[doc] {
                    closest[doc] = d;
                }
            }
            centroids.push(centre);
        }
        centroids
    }
}

/// Member means per cluster. An empty cluster is moved onto the document
/// farthest from its current centroid, one document per empty cluster.
fn update_centroids(
    rows: &[SparseRow],
    assignment: &[usize],
    distances: &mut [f64],
    k: usize,
    n_features: usize,
    iteration: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Vec<f64>> {
    let mut sums = vec![vec![0.0f64; n_features]; k];
    let mut counts = vec![0usize; k];
    for (doc, row) in rows.iter().enumerate() {
        let cluster = assignment[doc];
        counts[cluster] += 1;
        for &(col, w) in row {
            sums[cluster][col] += w;
        }
    }

    let mut taken: Vec<usize> = Vec::new();
    for cluster in 0..k {
        if counts[cluster] > 0 {
            let n = counts[cluster] as f64;
            for value in sums[cluster].iter_mut() {
                *value /= n;
            }
            continue;
        }
        let far = (0..rows.len())
            .filter(|doc| !taken.contains(doc))
            .max_by(|&a, &b| distances[a].total_cmp(&distances[b]).then(b.cmp(&a)));
        if let Some(doc) = far {
            taken.push(doc);
            sums[cluster] = densify(&rows[doc], n_features);
            distances[doc] = 0.0;
            warn!("Re-seeded empty cluster {} on document {}", cluster, doc);
            diagnostics.push(Diagnostic::ReseededCluster { cluster, iteration });
        }
    }
    sums
}

fn empty_clusters(sizes: &[usize]) -> Vec<Diagnostic> {
    sizes
        .iter()
        .enumerate()
        .filter(|(_, &size)| size == 0)
        .map(|(cluster, _)| {
            warn!("Cluster {} ended the fit with no members", cluster);
            Diagnostic::EmptyCluster { cluster }
        })
        .collect()
}

fn assign(
    rows: &[SparseRow],
    norms: &[f64],
    centroids: &[Vec<f64>],
    assignment: &mut [usize],
    distances: &mut [f64],
) {
    let centroid_norms: Vec<f64> = centroids
        .iter()
        .map(|c| c.iter().map(|v| v * v).sum())
        .collect();
    for (doc, row) in rows.iter().enumerate() {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (cluster, centroid) in centroids.iter().enumerate() {
            let dot: f64 = row.iter().map(|&(col, w)| w * centroid[col]).sum();
            let d = (norms[doc] - 2.0 * dot + centroid_norms[cluster]).max(0.0);
            if d < best_dist {
                best_dist = d;
                best = cluster;
            }
        }
        assignment[doc] = best;
        distances[doc] = best_dist;
    }
}

fn sq_norm(row: &[(usize, f64)]) -> f64 {
    row.iter().map(|(_, w)| w * w).sum()
}

/// `row_norm` and `c_norm` are the squared norms of the row and the centroid.
fn sq_distance(row: &[(usize, f64)], row_norm: f64, centroid: &[f64], c_norm: f64) -> f64 {
    let dot: f64 = row.iter().map(|&(col, w)| w * centroid[col]).sum();
    (row_norm - 2.0 * dot + c_norm).max(0.0)
}

fn densify(row: &[(usize, f64)], n_features: usize) -> Vec<f64> {
    let mut dense = vec![0.0; n_features];
    for &(col, w) in row {
        dense[col] = w;
    }
    dense
}

fn mean_column_variance(rows: &[SparseRow], n_features: usize) -> f64 {
    if rows.is_empty() || n_features == 0 {
        return 0.0;
    }
    let n = rows.len() as f64;
    let mut sums = vec![0.0; n_features];
    let mut sq_sums = vec![0.0; n_features];
    for row in rows {
        for &(col, w) in row {
            sums[col] += w;
            sq_sums[col] += w * w;
        }
    }
    let total: f64 = sums
        .iter()
        .zip(sq_sums.iter())
        .map(|(s, sq)| (sq / n - (s / n) * (s / n)).max(0.0))
        .sum();
    total / n_features as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tfidf::TfidfVectorizer;
    use std::collections::HashSet;

    fn matrix(texts: &[&str]) -> DocumentTermMatrix {
        let corpus: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        TfidfVectorizer::new(HashSet::new()).fit_transform(&corpus).unwrap()
    }

    fn helpdesk_titles() -> Vec<&'static str> {
        vec![
            "imprimante bourrage papier",
            "imprimante papier coincé",
            "imprimante toner vide",
            "vpn connexion refusée",
            "vpn connexion impossible",
            "vpn accès refusé",
            "mot passe oublié",
            "mot passe expiré",
            "réinitialiser mot passe",
        ]
    }

    #[test]
    fn test_separates_obvious_groups() {
        let dtm = matrix(&helpdesk_titles());
        let model = KMeans::new(3, KMeansConfig::default(), 42).fit(&dtm).unwrap();

        assert_eq!(model.assignment.len(), 9);
        assert_eq!(model.sizes().iter().sum::<usize>(), 9);
        for group in [[0, 1, 2], [3, 4, 5], [6, 7, 8]] {
            let c = model.assignment[group[0]];
            assert!(group.iter().all(|&doc| model.assignment[doc] == c));
        }
        assert!(model.diagnostics.is_empty());
    }

    #[test]
    fn test_keywords_come_from_centroids() {
        let dtm = matrix(&helpdesk_titles());
        let model = KMeans::new(3, KMeansConfig::default(), 42).fit(&dtm).unwrap();
        let keywords = model.keywords(&dtm.vocabulary, 2);

        let printer_cluster = model.assignment[0];
        assert_eq!(keywords[printer_cluster][0], "imprimante");
        let password_cluster = model.assignment[6];
        assert_eq!(keywords[password_cluster], vec!["mot", "passe"]);
    }

    #[test]
    fn test_fixed_seed_is_deterministic() {
        let dtm = matrix(&helpdesk_titles());
        let first = KMeans::new(4, KMeansConfig::default(), 7).fit(&dtm).unwrap();
        let second = KMeans::new(4, KMeansConfig::default(), 7).fit(&dtm).unwrap();
        assert_eq!(first.assignment, second.assignment);
        assert_eq!(first.centroids, second.centroids);
    }

    #[test]
    fn test_cluster_count_bounds() {
        let dtm = matrix(&["vpn refusé", "vpn refusé", "imprimante"]);
        assert!(matches!(
            KMeans::new(3, KMeansConfig::default(), 42).fit(&dtm),
            Err(AnalysisError::InvalidClusterCount {
                requested: 3,
                distinct_documents: 2
            })
        ));
        assert!(matches!(
            KMeans::new(1, KMeansConfig::default(), 42).fit(&dtm),
            Err(AnalysisError::InvalidClusterCount { .. })
        ));
        let model = KMeans::new(2, KMeansConfig::default(), 42).fit(&dtm).unwrap();
        assert_eq!(model.assignment[0], model.assignment[1]);
        assert_ne!(model.assignment[0], model.assignment[2]);
    }

    #[test]
    fn test_empty_cluster_is_reseeded_on_farthest_document() {
        let rows: Vec<SparseRow> = vec![vec![(0, 1.0)], vec![(0, 0.8), (1, 0.6)], vec![(1, 1.0)]];
        let assignment = vec![0, 0, 0];
        let mut distances = vec![0.1, 0.3, 0.9];
        let mut diagnostics = Vec::new();

        let centroids = update_centroids(&rows, &assignment, &mut distances, 2, 2, 4, &mut diagnostics);

        assert_eq!(
            diagnostics,
            vec![Diagnostic::ReseededCluster {
                cluster: 1,
                iteration: 4
            }]
        );
        assert_eq!(centroids[1], vec![0.0, 1.0]);
        assert!((centroids[0][0] - 0.6).abs() < 1e-12);
        assert!((centroids[0][1] - 1.6 / 3.0).abs() < 1e-12);
        assert_eq!(distances[2], 0.0);
    }

    #[test]
    fn test_empty_clusters_become_diagnostics() {
        assert_eq!(
            empty_clusters(&[3, 0, 2, 0]),
            vec![
                Diagnostic::EmptyCluster { cluster: 1 },
                Diagnostic::EmptyCluster { cluster: 3 }
            ]
        );
        assert!(empty_clusters(&[1, 1]).is_empty());
    }

    #[test]
    fn test_sq_distance_uses_given_centroid_norm() {
        let row = vec![(0, 0.6), (1, 0.8)];
        let centroid = vec![1.0, 0.0];
        let d = sq_distance(&row, sq_norm(&row), &centroid, 1.0);
        assert!((d - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_members_in_corpus_order() {
        let model = ClusterModel {
            assignment: vec![1, 0, 1, 1],
            centroids: vec![vec![0.0], vec![1.0]],
            inertia: 0.0,
            iterations: 1,
            diagnostics: Vec::new(),
        };
        assert_eq!(model.members(1), vec![0, 2, 3]);
        assert_eq!(model.sizes(), vec![1, 3]);
    }
}
