//! Latent Dirichlet Allocation over the TF-IDF matrix.
//!
//! Batch variational Bayes: each epoch runs a per-document E-step against the
//! current topic-word parameters, then replaces them with prior plus expected
//! counts. Works on real-valued weights, so it consumes the same matrix the
//! clustering does.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Gamma};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::LDAConfig;
use crate::error::{AnalysisError, Result};
use crate::tfidf::{top_indices, DocumentTermMatrix};

const EPS: f64 = 1e-100;

#[derive(Debug, Clone, Serialize)]
pub struct ModeledTopic {
    pub id: usize,
    /// Top terms and their share of the topic's weight, heaviest first.
    pub words: Vec<(String, f64)>,
    /// Documents whose dominant topic is this one.
    pub documents: Vec<usize>,
    pub coherence_score: f64,
}

impl ModeledTopic {
    pub fn keywords(&self) -> Vec<String> {
        self.words.iter().map(|(word, _)| word.clone()).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicModel {
    pub topics: Vec<ModeledTopic>,
    /// Topics x vocabulary variational parameters.
    pub topic_word: Vec<Vec<f64>>,
    /// Documents x topics, each row sums to one.
    pub doc_topic: Vec<Vec<f64>>,
    pub dominant_topic: Vec<usize>,
}

pub struct SimpleLDA {
    num_topics: usize,
    num_words: usize,
    seed: u64,
    config: LDAConfig,
}

impl SimpleLDA {
    pub fn new(num_topics: usize, num_words: usize, seed: u64, config: LDAConfig) -> Self {
        SimpleLDA {
            num_topics,
            num_words,
            seed,
            config,
        }
    }

    pub fn fit(&self, dtm: &DocumentTermMatrix) -> Result<TopicModel> {
        let distinct = dtm.distinct_rows();
        if self.num_topics < 2 || self.num_topics > distinct {
            return Err(AnalysisError::InvalidTopicCount {
                requested: self.num_topics,
                distinct_documents: distinct,
            });
        }

        let k = self.num_topics;
        let vocab_size = dtm.n_terms();
        let alpha = self.config.alpha.unwrap_or(1.0 / k as f64);
        let beta = self.config.beta.unwrap_or(1.0 / k as f64);
        let rows = dtm.rows();

        // Step 1: random topic-word parameters around 1
        let mut rng = StdRng::seed_from_u64(self.seed);
        let init = Gamma::new(100.0, 0.01)
            .map_err(|e| AnalysisError::invalid_config(format!("LDA init: {}", e)))?;
        let mut lambda: Vec<Vec<f64>> = (0..k)
            .map(|_| (0..vocab_size).map(|_| init.sample(&mut rng)).collect())
            .collect();
        let mut exp_beta = exp_dirichlet_rows(&lambda);
        let mut gammas = vec![vec![1.0; k]; rows.len()];

        // Step 2: variational EM epochs
        for epoch in 0..self.config.max_iterations {
            let mut suff = vec![vec![0.0; vocab_size]; k];
            for (doc_id, row) in rows.iter().enumerate() {
                let gamma = self.update_document(row, &exp_beta, alpha, &mut suff);
                gammas[doc_id] = gamma;
            }
            for topic in 0..k {
                for word in 0..vocab_size {
                    lambda[topic][word] = beta + suff[topic][word] * exp_beta[topic][word];
                }
            }
            exp_beta = exp_dirichlet_rows(&lambda);
            debug!("LDA epoch {} done", epoch + 1);
        }

        // Step 3: document mixtures and topic summaries
        let doc_topic: Vec<Vec<f64>> = gammas
            .iter()
            .map(|gamma| {
                let total: f64 = gamma.iter().sum();
                gamma.iter().map(|g| g / total).collect()
            })
            .collect();
        let dominant_topic: Vec<usize> = doc_topic
            .iter()
            .map(|mix| top_indices(mix, 1).first().copied().unwrap_or(0))
            .collect();

        let topics = self.extract_topics(&lambda, dtm, &dominant_topic);
        info!(
            "LDA fitted - topics={}, vocabulary={}, epochs={}",
            k, vocab_size, self.config.max_iterations
        );

        Ok(TopicModel {
            topics,
            topic_word: lambda,
            doc_topic,
            dominant_topic,
        })
    }

    /// E-step for one document; adds its expected counts into `suff` and
    /// returns the document's variational Dirichlet parameters.
    fn update_document(
        &self,
        row: &[(usize, f64)],
        exp_beta: &[Vec<f64>],
        alpha: f64,
        suff: &mut [Vec<f64>],
    ) -> Vec<f64> {
        let k = self.num_topics;
        let mut gamma = vec![1.0; k];
        if row.is_empty() {
            return vec![alpha; k];
        }

        let mut exp_theta = exp_dirichlet(&gamma);
        let mut norm_phi = phi_norm(row, &exp_theta, exp_beta);

        for _ in 0..self.config.max_doc_iterations {
            let last = gamma.clone();
            for topic in 0..k {
                let dot: f64 = row
                    .iter()
                    .zip(norm_phi.iter())
                    .map(|(&(word, weight), norm)| weight / norm * exp_beta[topic][word])
                    .sum();
                gamma[topic] = alpha + exp_theta[topic] * dot;
            }
            exp_theta = exp_dirichlet(&gamma);
            norm_phi = phi_norm(row, &exp_theta, exp_beta);

            let change = last
                .iter()
                .zip(gamma.iter())
                .map(|(a, b)| (a - b).abs())
                .sum::<f64>()
                / k as f64;
            if change < self.config.doc_tolerance {
                break;
            }
        }

        for topic in 0..k {
            for (&(word, weight), norm) in row.iter().zip(norm_phi.iter()) {
                suff[topic][word] += exp_theta[topic] * weight / norm;
            }
        }
        gamma
    }

    fn extract_topics(
        &self,
        lambda: &[Vec<f64>],
        dtm: &DocumentTermMatrix,
        dominant_topic: &[usize],
    ) -> Vec<ModeledTopic> {
        lambda
            .iter()
            .enumerate()
            .map(|(topic_id, weights)| {
                let total: f64 = weights.iter().sum();
                let words: Vec<(String, f64)> = top_indices(weights, self.num_words)
                    .into_iter()
                    .map(|word| (dtm.vocabulary.term(word).to_string(), weights[word] / total))
                    .collect();
                let documents: Vec<usize> = dominant_topic
                    .iter()
                    .enumerate()
                    .filter(|(_, &t)| t == topic_id)
                    .map(|(doc, _)| doc)
                    .collect();
                let coherence_score = self.calculate_coherence(&words);
                ModeledTopic {
                    id: topic_id,
                    words,
                    documents,
                    coherence_score,
                }
            })
            .collect()
    }

    fn calculate_coherence(&self, word_probs: &[(String, f64)]) -> f64 {
        // Average share of the topic held by its top words
        if word_probs.is_empty() {
            return 0.0;
        }
        let total_prob: f64 = word_probs.iter().map(|(_, prob)| prob).sum();
        total_prob / word_probs.len() as f64
    }
}

fn phi_norm(row: &[(usize, f64)], exp_theta: &[f64], exp_beta: &[Vec<f64>]) -> Vec<f64> {
    row.iter()
        .map(|&(word, _)| {
            exp_theta
                .iter()
                .enumerate()
                .map(|(topic, t)| t * exp_beta[topic][word])
                .sum::<f64>()
                + EPS
        })
        .collect()
}

/// `exp(E[log X])` for `X ~ Dirichlet(params)`.
fn exp_dirichlet(params: &[f64]) -> Vec<f64> {
    let total = digamma(params.iter().sum());
    params.iter().map(|&p| (digamma(p) - total).exp()).collect()
}

fn exp_dirichlet_rows(params: &[Vec<f64>]) -> Vec<Vec<f64>> {
    params.iter().map(|row| exp_dirichlet(row)).collect()
}

/// Digamma via upward recurrence and the asymptotic series.
pub(crate) fn digamma(mut x: f64) -> f64 {
    let mut result = 0.0;
    while x < 6.0 {
        result -= 1.0 / x;
        x += 1.0;
    }
    let f = 1.0 / (x * x);
    result + x.ln()
        - 0.5 / x
        - f * (1.0 / 12.0 - f * (1.0 / 120.0 - f * (1.0 / 252.0 - f * (1.0 / 240.0 - f / 132.0))))
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

    fn titles() -> Vec<&'static str> {
        vec![
            "vpn connexion refusée",
            "connexion vpn lente",
            "vpn coupure connexion",
            "imprimante papier bourrage",
            "papier imprimante toner",
            "imprimante papier",
            "",
        ]
    }

    #[test]
    fn test_digamma_known_values() {
        assert!((digamma(1.0) + 0.577_215_664_901_532_9).abs() < 1e-10);
        assert!((digamma(0.5) + 1.963_510_026_021_423).abs() < 1e-10);
        assert!((digamma(10.0) - 2.251_752_589_066_721).abs() < 1e-10);
    }

    #[test]
    fn test_topics_have_ranked_vocabulary_terms() {
        let dtm = matrix(&titles());
        let model = SimpleLDA::new(2, 3, 42, LDAConfig::default()).fit(&dtm).unwrap();

        assert_eq!(model.topics.len(), 2);
        for topic in &model.topics {
            assert_eq!(topic.words.len(), 3);
            for pair in topic.words.windows(2) {
                assert!(pair[0].1 >= pair[1].1);
            }
            for (word, _) in &topic.words {
                assert!(dtm.vocabulary.index_of(word).is_some());
            }
        }
    }

    #[test]
    fn test_document_mixtures_are_distributions() {
        let dtm = matrix(&titles());
        let model = SimpleLDA::new(3, 2, 42, LDAConfig::default()).fit(&dtm).unwrap();

        assert_eq!(model.doc_topic.len(), 7);
        for mix in &model.doc_topic {
            assert!((mix.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
        // Empty title keeps the uniform prior mixture
        assert!(model.doc_topic[6].iter().all(|p| (p - 1.0 / 3.0).abs() < 1e-9));
        let assigned: usize = model.topics.iter().map(|t| t.documents.len()).sum();
        assert_eq!(assigned, 7);
    }

    #[test]
    fn test_fixed_seed_is_deterministic() {
        let dtm = matrix(&titles());
        let a = SimpleLDA::new(2, 4, 3, LDAConfig::default()).fit(&dtm).unwrap();
        let b = SimpleLDA::new(2, 4, 3, LDAConfig::default()).fit(&dtm).unwrap();
        assert_eq!(a.topic_word, b.topic_word);
        assert_eq!(a.topics[0].keywords(), b.topics[0].keywords());
    }

    #[test]
    fn test_topic_count_bounds() {
        let dtm = matrix(&["vpn", "vpn", "imprimante"]);
        assert!(matches!(
            SimpleLDA::new(3, 2, 42, LDAConfig::default()).fit(&dtm),
            Err(AnalysisError::InvalidTopicCount {
                requested: 3,
                distinct_documents: 2
            })
        ));
        assert!(matches!(
            SimpleLDA::new(1, 2, 42, LDAConfig::default()).fit(&dtm),
            Err(AnalysisError::InvalidTopicCount { .. })
        ));
    }
}
