use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::stopwords::build_exclusion_set;

/// Noise words shared by every tokenizer in the pipeline.
///
/// The vectorizer, the co-occurrence tokenizer and the word-frequency counter
/// all start from the same base set. Each one gets its own `*_extra` list so a
/// consumer can ignore more words without the others drifting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    pub include_helpdesk_junk: bool,
    pub custom_junk: Vec<String>,
    pub exclude_day_numbers: bool,
    pub year_range: Option<(u16, u16)>,
    pub vectorizer_extra: Vec<String>,
    pub cooccurrence_extra: Vec<String>,
    pub frequency_extra: Vec<String>,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        NoiseConfig {
            include_helpdesk_junk: true,
            custom_junk: Vec::new(),
            exclude_day_numbers: true,
            year_range: Some((2020, 2034)),
            vectorizer_extra: Vec::new(),
            cooccurrence_extra: Vec::new(),
            frequency_extra: Vec::new(),
        }
    }
}

impl NoiseConfig {
    pub fn vectorizer_set(&self) -> HashSet<String> {
        build_exclusion_set(self, &self.vectorizer_extra)
    }

    pub fn cooccurrence_set(&self) -> HashSet<String> {
        build_exclusion_set(self, &self.cooccurrence_extra)
    }

    pub fn frequency_set(&self) -> HashSet<String> {
        build_exclusion_set(self, &self.frequency_extra)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LDAConfig {
    pub max_iterations: usize,
    pub max_doc_iterations: usize,
    pub doc_tolerance: f64,
    /// Document-topic concentration; `None` means `1 / num_topics`.
    pub alpha: Option<f64>,
    /// Topic-word concentration; `None` means `1 / num_topics`.
    pub beta: Option<f64>,
}

impl Default for LDAConfig {
    fn default() -> Self {
        LDAConfig {
            max_iterations: 10,
            max_doc_iterations: 100,
            doc_tolerance: 1e-3,
            alpha: None,
            beta: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansConfig {
    pub max_iterations: usize,
    pub tolerance: f64,
    pub restarts: usize,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        KMeansConfig {
            max_iterations: 300,
            tolerance: 1e-4,
            restarts: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub train_fraction: f64,
    pub max_iterations: usize,
    pub learning_rate: f64,
    /// Inverse L2 regularization strength.
    pub c: f64,
    pub tolerance: f64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            train_fraction: 0.8,
            max_iterations: 1000,
            learning_rate: 1.0,
            c: 1.0,
            tolerance: 1e-6,
        }
    }
}

/// Everything the title pipeline needs besides the titles themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub num_clusters: usize,
    pub num_topics: usize,
    pub keywords_per_group: usize,
    pub cooccurrence_threshold: usize,
    pub frequent_words: usize,
    pub examples_per_cluster: usize,
    pub seed: u64,
    pub noise: NoiseConfig,
    pub kmeans: KMeansConfig,
    pub lda: LDAConfig,
    pub probe: ProbeConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            num_clusters: 6,
            num_topics: 6,
            keywords_per_group: 5,
            cooccurrence_threshold: 3,
            frequent_words: 20,
            examples_per_cluster: 10,
            seed: 42,
            noise: NoiseConfig::default(),
            kmeans: KMeansConfig::default(),
            lda: LDAConfig::default(),
            probe: ProbeConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Loads a JSON config file; missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&raw)?;
        debug!("Loaded pipeline config from {}", path.display());
        Ok(config)
    }

    /// Checks the ranges the pipeline relies on.
    ///
    /// Cluster and topic counts are only checked against their lower bound
    /// here; the upper bound depends on the corpus.
    pub fn validate(&self) -> Result<()> {
        if self.keywords_per_group == 0 {
            return Err(AnalysisError::invalid_config("keywords_per_group must be >= 1"));
        }
        if self.cooccurrence_threshold == 0 {
            return Err(AnalysisError::invalid_config("cooccurrence_threshold must be >= 1"));
        }
        let fraction = self.probe.train_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(AnalysisError::invalid_config(format!(
                "train_fraction must be in (0, 1), got {}",
                fraction
            )));
        }
        if self.kmeans.max_iterations == 0 || self.kmeans.restarts == 0 {
            return Err(AnalysisError::invalid_config(
                "kmeans max_iterations and restarts must be >= 1",
            ));
        }
        if self.probe.learning_rate <= 0.0 || self.probe.c <= 0.0 {
            return Err(AnalysisError::invalid_config(
                "probe learning_rate and c must be positive",
            ));
        }
        if let Some((first, last)) = self.noise.year_range {
            if first > last {
                return Err(AnalysisError::invalid_config(format!(
                    "year_range start {} is after end {}",
                    first, last
                )));
            }
        }
        Ok(())
    }
}
