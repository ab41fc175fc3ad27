//! Analytics over GLPI helpdesk ticket titles: TF-IDF, k-means clusters,
//! LDA topics, cluster diversity, a supervised cluster probe, and a word
//! co-occurrence graph. A loader and summary for the CSV export sit alongside.

pub mod cluster;
pub mod config;
pub mod cooccurrence;
pub mod diversity;
pub mod error;
pub mod frequency;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod probe;
pub mod report;
pub mod stopwords;
pub mod summary;
pub mod tfidf;
pub mod topic_modeling;

pub use cluster::{ClusterModel, KMeans};
pub use config::{KMeansConfig, LDAConfig, NoiseConfig, PipelineConfig, ProbeConfig};
pub use cooccurrence::{CooccurrenceGraph, WeightedEdge};
pub use diversity::{cluster_entropy, Diversity};
pub use error::{AnalysisError, Diagnostic, Result};
pub use models::{TicketExport, TicketRecord};
pub use pipeline::{analyze_titles, AnalysisReport, ClusterSection, PipelineCache, Section};
pub use probe::{ClusterProbe, ProbeReport};
pub use tfidf::{DocumentTermMatrix, TfidfVectorizer, Vocabulary};
pub use topic_modeling::{ModeledTopic, SimpleLDA, TopicModel};
