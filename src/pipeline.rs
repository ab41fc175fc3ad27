//! The title analysis pipeline: one pure call from titles and configuration
//! to a result bundle, plus a cache keyed on those inputs.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::cluster::{ClusterModel, KMeans};
use crate::config::PipelineConfig;
use crate::cooccurrence::{cooccurrence_graph, CooccurrenceGraph};
use crate::diversity::Diversity;
use crate::error::{Diagnostic, Result};
use crate::frequency::{frequent_words, WordCount};
use crate::normalize::normalize_titles;
use crate::probe::{run_probe, ClusterProbe, ProbeReport};
use crate::tfidf::{DocumentTermMatrix, TfidfVectorizer};
use crate::topic_modeling::{SimpleLDA, TopicModel};

/// Outcome of one report section. A skipped section carries the reason so
/// the caller can show it instead of the section.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Section<T> {
    Ready { value: T },
    Skipped { reason: String },
}

impl<T> Section<T> {
    fn from_result(name: &str, result: Result<T>) -> Self {
        match result {
            Ok(value) => Section::Ready { value },
            Err(e) => {
                warn!("Skipping {} section: {}", name, e);
                Section::Skipped {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Section::Ready { value } => Some(value),
            Section::Skipped { .. } => None,
        }
    }

    pub fn skipped_reason(&self) -> Option<&str> {
        match self {
            Section::Ready { .. } => None,
            Section::Skipped { reason } => Some(reason),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterSection {
    pub model: ClusterModel,
    pub keywords: Vec<Vec<String>>,
    pub sizes: Vec<usize>,
    /// First few raw titles of each cluster.
    pub examples: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub corpus: Vec<String>,
    pub dtm: DocumentTermMatrix,
    pub frequent_words: Vec<WordCount>,
    pub clusters: Section<ClusterSection>,
    pub diversity: Section<Diversity>,
    pub topics: Section<TopicModel>,
    pub probe: Section<ProbeReport>,
    pub cooccurrence: Section<CooccurrenceGraph>,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip)]
    classifier: Option<ClusterProbe>,
}

impl AnalysisReport {
    /// Predicts the cluster of a new ticket title with the fitted probe.
    pub fn predict_cluster(&self, title: &str) -> Option<usize> {
        self.classifier
            .as_ref()
            .map(|probe| probe.predict_title(&self.dtm.vocabulary, title))
    }
}

/// Runs every stage over `titles`.
///
/// Fails only when nothing can be computed (invalid configuration, empty
/// corpus, empty vocabulary). Later stages that cannot run are recorded as
/// skipped sections.
pub fn analyze_titles<S: AsRef<str>>(titles: &[Option<S>], config: &PipelineConfig) -> Result<AnalysisReport> {
    config.validate()?;
    let corpus = normalize_titles(titles);
    info!("Analyzing {} titles", corpus.len());

    let dtm = TfidfVectorizer::new(config.noise.vectorizer_set()).fit_transform(&corpus)?;
    let frequent = frequent_words(&corpus, &config.noise.frequency_set(), config.frequent_words);

    let mut diagnostics = Vec::new();

    let fitted = KMeans::new(config.num_clusters, config.kmeans.clone(), config.seed).fit(&dtm);
    let clusters = Section::from_result(
        "cluster",
        fitted.map(|model| {
            diagnostics.extend(model.diagnostics.iter().cloned());
            cluster_section(model, &dtm, titles, config)
        }),
    );

    let (diversity, probe, classifier) = match clusters.ready() {
        Some(section) => {
            let assignment = &section.model.assignment;
            let diversity = Diversity::from_assignment(assignment, config.num_clusters);
            debug!(
                "Diversity - entropy={:.4}, max={:.4}, percent={:.1}",
                diversity.entropy, diversity.max_entropy, diversity.percent
            );
            let probed = run_probe(&dtm, assignment, config.num_clusters, &config.probe, config.seed);
            let (classifier, probe) = match probed {
                Ok((classifier, report)) => {
                    diagnostics.extend(report.diagnostics.iter().cloned());
                    (Some(classifier), Ok(report))
                }
                Err(e) => (None, Err(e)),
            };
            (
                Section::Ready { value: diversity },
                Section::from_result("probe", probe),
                classifier,
            )
        }
        None => {
            let reason = clusters.skipped_reason().unwrap_or_default().to_string();
            (
                Section::Skipped {
                    reason: format!("clustering unavailable: {}", reason),
                },
                Section::Skipped {
                    reason: format!("clustering unavailable: {}", reason),
                },
                None,
            )
        }
    };

    let topics = Section::from_result(
        "topic",
        SimpleLDA::new(
            config.num_topics,
            config.keywords_per_group,
            config.seed,
            config.lda.clone(),
        )
        .fit(&dtm),
    );

    let cooccurrence = Section::from_result(
        "co-occurrence",
        cooccurrence_graph(
            &corpus,
            &config.noise.cooccurrence_set(),
            config.cooccurrence_threshold,
        ),
    );

    Ok(AnalysisReport {
        corpus,
        dtm,
        frequent_words: frequent,
        clusters,
        diversity,
        topics,
        probe,
        cooccurrence,
        diagnostics,
        classifier,
    })
}

fn cluster_section<S: AsRef<str>>(
    model: ClusterModel,
    dtm: &DocumentTermMatrix,
    titles: &[Option<S>],
    config: &PipelineConfig,
) -> ClusterSection {
    let keywords = model.keywords(&dtm.vocabulary, config.keywords_per_group);
    let sizes = model.sizes();
    let examples = (0..model.n_clusters())
        .map(|cluster| {
            model
                .members(cluster)
                .into_iter()
                .take(config.examples_per_cluster)
                .map(|doc| {
                    titles[doc]
                        .as_ref()
                        .map(|t| t.as_ref().to_string())
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();
    ClusterSection {
        model,
        keywords,
        sizes,
        examples,
    }
}

/// Memoizes reports by a SHA-256 of the configuration and the titles, so a
/// caller can redraw without recomputing.
///
/// Unbounded by default: a long-lived caller either builds it with
/// [`PipelineCache::with_capacity`], which evicts the oldest report first, or
/// calls [`PipelineCache::clear`] itself.
#[derive(Default)]
pub struct PipelineCache {
    entries: HashMap<String, Arc<AnalysisReport>>,
    /// Insertion order of `entries`, oldest first.
    order: VecDeque<String>,
    capacity: Option<usize>,
    hits: usize,
    misses: usize,
}

impl PipelineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps at most `capacity` reports (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        PipelineCache {
            capacity: Some(capacity.max(1)),
            ..Self::default()
        }
    }

    pub fn cache_key<S: AsRef<str>>(titles: &[Option<S>], config: &PipelineConfig) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_vec(config)?);
        for title in titles {
            match title {
                Some(text) => {
                    let bytes = text.as_ref().as_bytes();
                    hasher.update([1u8]);
                    hasher.update((bytes.len() as u64).to_le_bytes());
                    hasher.update(bytes);
                }
                None => hasher.update([0u8]),
            }
        }
        Ok(format!("{:x}", hasher.finalize()))
    }

    pub fn get_or_analyze<S: AsRef<str>>(
        &mut self,
        titles: &[Option<S>],
        config: &PipelineConfig,
    ) -> Result<Arc<AnalysisReport>> {
        let key = Self::cache_key(titles, config)?;
        if let Some(report) = self.entries.get(&key) {
            self.hits += 1;
            debug!("Pipeline cache hit {}", &key[..12]);
            return Ok(Arc::clone(report));
        }
        self.misses += 1;
        let report = Arc::new(analyze_titles(titles, config)?);
        if let Some(capacity) = self.capacity {
            while self.entries.len() >= capacity {
                let Some(oldest) = self.order.pop_front() else { break };
                debug!("Evicting cached report {}", &oldest[..12]);
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, Arc::clone(&report));
        Ok(report)
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_separates_inputs() {
        let config = PipelineConfig::default();
        let a = PipelineCache::cache_key(&[Some("ab"), Some("c")], &config).unwrap();
        let b = PipelineCache::cache_key(&[Some("a"), Some("bc")], &config).unwrap();
        let c = PipelineCache::cache_key(&[Some("ab"), None], &config).unwrap();
        let mut other = config.clone();
        other.num_clusters = 4;
        let d = PipelineCache::cache_key(&[Some("ab"), Some("c")], &other).unwrap();

        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a, PipelineCache::cache_key(&[Some("ab"), Some("c")], &config).unwrap());
    }

    #[test]
    fn test_section_accessors() {
        let ready: Section<u8> = Section::Ready { value: 3 };
        let skipped: Section<u8> = Section::from_result(
            "test",
            Err(crate::error::AnalysisError::NoCooccurrenceEdges { threshold: 3 }),
        );
        assert_eq!(ready.ready(), Some(&3));
        assert!(skipped.ready().is_none());
        assert!(skipped.skipped_reason().unwrap().contains(">= 3"));
    }
}
