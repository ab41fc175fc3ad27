//! Self-consistency check for a clustering: can a linear classifier learn
//! the cluster labels back from the same TF-IDF rows?

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ProbeConfig;
use crate::error::{AnalysisError, Diagnostic, Result};
use crate::tfidf::{DocumentTermMatrix, Vocabulary};

type SparseRow = Vec<(usize, f64)>;

#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    /// Fraction of held-out documents whose cluster was predicted correctly.
    pub accuracy: f64,
    /// Rows = true cluster, columns = predicted cluster.
    pub confusion: Vec<Vec<usize>>,
    pub train_size: usize,
    pub test_size: usize,
    pub iterations: usize,
    pub final_loss: f64,
    pub diagnostics: Vec<Diagnostic>,
}

/// Multinomial logistic regression over sparse rows.
#[derive(Debug, Clone)]
pub struct ClusterProbe {
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

/// Indices of the stratified train and test sides.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Splits each class separately so every class lands on both sides.
///
/// A class needs at least two documents; there must be at least two classes.
pub fn stratified_split(labels: &[usize], n_classes: usize, train_fraction: f64, seed: u64) -> Result<Split> {
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (doc, &label) in labels.iter().enumerate() {
        by_class[label].push(doc);
    }

    let present = by_class.iter().filter(|members| !members.is_empty()).count();
    if present < 2 {
        return Err(AnalysisError::degenerate_split(format!(
            "need at least 2 non-empty clusters, found {}",
            present
        )));
    }
    if let Some((class, members)) = by_class
        .iter()
        .enumerate()
        .find(|(_, members)| members.len() == 1)
    {
        return Err(AnalysisError::degenerate_split(format!(
            "cluster {} has {} document, cannot appear in both train and test",
            class,
            members.len()
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut split = Split {
        train: Vec::new(),
        test: Vec::new(),
    };
    for members in by_class.iter_mut().filter(|m| !m.is_empty()) {
        members.shuffle(&mut rng);
        let n = members.len();
        let n_test = ((n as f64 * (1.0 - train_fraction)).round() as usize).clamp(1, n - 1);
        split.test.extend_from_slice(&members[..n_test]);
        split.train.extend_from_slice(&members[n_test..]);
    }
    split.train.sort_unstable();
    split.test.sort_unstable();
    Ok(split)
}

impl ClusterProbe {
    /// Full-batch gradient descent on the L2-penalized cross-entropy.
    pub fn fit(
        rows: &[&SparseRow],
        labels: &[usize],
        n_classes: usize,
        n_features: usize,
        config: &ProbeConfig,
    ) -> (Self, usize, f64, bool) {
        let mut probe = ClusterProbe {
            weights: vec![vec![0.0; n_features]; n_classes],
            bias: vec![0.0; n_classes],
        };
        let n = rows.len() as f64;
        let penalty = 1.0 / (config.c * n);
        let mut last_loss = f64::INFINITY;
        let mut iterations = 0;
        let mut converged = false;

        for iteration in 0..config.max_iterations {
            iterations = iteration + 1;
            let mut grad_w = vec![vec![0.0; n_features]; n_classes];
            let mut grad_b = vec![0.0; n_classes];
            let mut loss = 0.0;

            for (row, &label) in rows.iter().zip(labels.iter()) {
                let probs = probe.probabilities(row);
                loss -= probs[label].max(1e-300).ln();
                for class in 0..n_classes {
                    let error = probs[class] - if class == label { 1.0 } else { 0.0 };
                    grad_b[class] += error;
                    for &(col, x) in row.iter() {
                        grad_w[class][col] += error * x;
                    }
                }
            }

            let sq_weights: f64 = probe.weights.iter().flatten().map(|w| w * w).sum();
            loss = loss / n + 0.5 * penalty * sq_weights;

            for class in 0..n_classes {
                probe.bias[class] -= config.learning_rate * grad_b[class] / n;
                for col in 0..n_features {
                    let g = grad_w[class][col] / n + penalty * probe.weights[class][col];
                    probe.weights[class][col] -= config.learning_rate * g;
                }
            }

            if (last_loss - loss).abs() < config.tolerance {
                converged = true;
                last_loss = loss;
                break;
            }
            last_loss = loss;
        }

        (probe, iterations, last_loss, converged)
    }

    fn scores(&self, row: &[(usize, f64)]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(self.bias.iter())
            .map(|(w, b)| b + row.iter().map(|&(col, x)| w[col] * x).sum::<f64>())
            .collect()
    }

    fn probabilities(&self, row: &[(usize, f64)]) -> Vec<f64> {
        let scores = self.scores(row);
        let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exp: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
        let total: f64 = exp.iter().sum();
        exp.into_iter().map(|e| e / total).collect()
    }

    /// Most likely cluster for a TF-IDF row; ties go to the lower id.
    pub fn predict(&self, row: &[(usize, f64)]) -> usize {
        let scores = self.scores(row);
        let mut best = 0;
        for (class, &score) in scores.iter().enumerate() {
            if score > scores[best] {
                best = class;
            }
        }
        best
    }

    /// Predicts the cluster of an unseen normalized title.
    pub fn predict_title(&self, vocabulary: &Vocabulary, title: &str) -> usize {
        self.predict(&vocabulary.transform(&title.to_lowercase()))
    }
}

/// Trains on the stratified train side and scores the held-out side.
pub fn run_probe(
    dtm: &DocumentTermMatrix,
    labels: &[usize],
    n_classes: usize,
    config: &ProbeConfig,
    seed: u64,
) -> Result<(ClusterProbe, ProbeReport)> {
    let split = stratified_split(labels, n_classes, config.train_fraction, seed)?;
    let rows = dtm.rows();

    let train_rows: Vec<&SparseRow> = split.train.iter().map(|&doc| &rows[doc]).collect();
    let train_labels: Vec<usize> = split.train.iter().map(|&doc| labels[doc]).collect();
    debug!(
        "Probe split - train={}, test={}",
        split.train.len(),
        split.test.len()
    );

    let (probe, iterations, final_loss, converged) =
        ClusterProbe::fit(&train_rows, &train_labels, n_classes, dtm.n_terms(), config);

    let mut diagnostics = Vec::new();
    if !converged {
        warn!(
            "Probe stopped at the iteration bound ({}) with loss {:.6}",
            iterations, final_loss
        );
        diagnostics.push(Diagnostic::ProbeNotConverged {
            iterations,
            final_loss,
        });
    }

    let mut confusion = vec![vec![0usize; n_classes]; n_classes];
    let mut correct = 0;
    for &doc in &split.test {
        let predicted = probe.predict(&rows[doc]);
        confusion[labels[doc]][predicted] += 1;
        if predicted == labels[doc] {
            correct += 1;
        }
    }
    let accuracy = correct as f64 / split.test.len() as f64;

    info!(
        "Probe evaluated - accuracy={:.3}, test={}, iterations={}",
        accuracy,
        split.test.len(),
        iterations
    );

    Ok((
        probe,
        ProbeReport {
            accuracy,
            confusion,
            train_size: split.train.len(),
            test_size: split.test.len(),
            iterations,
            final_loss,
            diagnostics,
        },
    ))
}
