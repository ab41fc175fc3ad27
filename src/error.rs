//! Error types for the title analysis pipeline.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the analysis pipeline and the export loader.
///
/// Every variant is recoverable: the caller decides whether to abort or to
/// skip the affected section of the report.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The corpus has no documents.
    #[error("empty input: the corpus contains no titles")]
    EmptyInput,

    /// Every term was removed by the noise filter.
    #[error("empty vocabulary: every term was filtered out ({documents} documents)")]
    EmptyVocabulary { documents: usize },

    /// Requested cluster count is below 2 or above the distinct document count.
    #[error("invalid cluster count {requested}: need 2 <= k <= {distinct_documents} distinct documents")]
    InvalidClusterCount {
        requested: usize,
        distinct_documents: usize,
    },

    /// Requested topic count is below 2 or above the distinct document count.
    #[error("invalid topic count {requested}: need 2 <= topics <= {distinct_documents} distinct documents")]
    InvalidTopicCount {
        requested: usize,
        distinct_documents: usize,
    },

    /// The train/test split cannot place a class on both sides.
    #[error("degenerate split: {message}")]
    DegenerateSplit { message: String },

    /// No token pair reached the edge threshold.
    #[error("no co-occurrence edges with weight >= {threshold}")]
    NoCooccurrenceEdges { threshold: usize },

    /// A configuration value is out of range.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AnalysisError {
    pub fn degenerate_split(message: impl Into<String>) -> Self {
        Self::DegenerateSplit {
            message: message.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Non-fatal numeric warnings attached to a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A k-means cluster lost all members and was re-seeded on a far point.
    ReseededCluster { cluster: usize, iteration: usize },
    /// A cluster ended the fit with no members.
    EmptyCluster { cluster: usize },
    /// The probe hit its iteration bound before the loss settled.
    ProbeNotConverged { iterations: usize, final_loss: f64 },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ReseededCluster { cluster, iteration } => write!(
                f,
                "cluster {} was empty at iteration {} and was re-seeded",
                cluster, iteration
            ),
            Diagnostic::EmptyCluster { cluster } => write!(f, "cluster {} has no members", cluster),
            Diagnostic::ProbeNotConverged {
                iterations,
                final_loss,
            } => write!(
                f,
                "probe did not converge in {} iterations (loss {:.4})",
                iterations, final_loss
            ),
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, AnalysisError>;
