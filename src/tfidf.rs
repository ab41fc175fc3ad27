//! TF-IDF vectorization of normalized titles into a sparse CSR matrix.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Serialize, Serializer};
use sprs::{CsMat, TriMat};
use tracing::{debug, info};

use crate::error::{AnalysisError, Result};
use crate::normalize::vectorizer_terms;

/// Terms kept after noise filtering, with the term→column mapping fixed at
/// fit time. Every "top terms" lookup goes through this mapping.
#[derive(Debug, Clone, Serialize)]
pub struct Vocabulary {
    /// Column index → term, sorted lexicographically.
    pub terms: Vec<String>,
    /// Smoothed IDF per column.
    pub idf: Vec<f64>,
    /// Number of documents containing each term.
    pub doc_freq: Vec<usize>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Vocabulary {
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    pub fn term(&self, index: usize) -> &str {
        &self.terms[index]
    }

    /// Weights a new normalized title against the fitted vocabulary.
    ///
    /// Unknown terms are ignored. The returned row is L2-normalized and sorted
    /// by column.
    pub fn transform(&self, text: &str) -> Vec<(usize, f64)> {
        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for m in vectorizer_terms(text, &HashSet::new()) {
            if let Some(col) = self.index_of(m) {
                *counts.entry(col).or_insert(0) += 1;
            }
        }
        weight_row(counts, &self.idf)
    }

    /// Ranks columns by `weights` descending, ties by column ascending, and
    /// resolves the first `n` to terms.
    pub fn top_terms(&self, weights: &[f64], n: usize) -> Vec<String> {
        top_indices(weights, n)
            .into_iter()
            .map(|col| self.terms[col].clone())
            .collect()
    }
}

/// Column indices of the `n` largest weights, ties broken by lower index.
pub fn top_indices(weights: &[f64], n: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..weights.len()).collect();
    order.sort_by(|&a, &b| weights[b].total_cmp(&weights[a]).then(a.cmp(&b)));
    order.truncate(n);
    order
}

/// Rows = documents, columns = vocabulary terms, cells = TF-IDF weight.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentTermMatrix {
    #[serde(serialize_with = "serialize_rows")]
    pub matrix: CsMat<f64>,
    pub vocabulary: Vocabulary,
}

impl DocumentTermMatrix {
    pub fn n_docs(&self) -> usize {
        self.matrix.rows()
    }

    pub fn n_terms(&self) -> usize {
        self.matrix.cols()
    }

    /// Sparse row as `(column, weight)` pairs.
    pub fn row(&self, doc: usize) -> Vec<(usize, f64)> {
        match self.matrix.outer_view(doc) {
            Some(view) => view.iter().map(|(col, &w)| (col, w)).collect(),
            None => Vec::new(),
        }
    }

    pub fn rows(&self) -> Vec<Vec<(usize, f64)>> {
        (0..self.n_docs()).map(|doc| self.row(doc)).collect()
    }

    /// Number of distinct row vectors (identical titles count once).
    pub fn distinct_rows(&self) -> usize {
        let distinct: HashSet<Vec<(usize, u64)>> = (0..self.n_docs())
            .map(|doc| {
                self.row(doc)
                    .into_iter()
                    .map(|(col, w)| (col, w.to_bits()))
                    .collect()
            })
            .collect();
        distinct.len()
    }
}

fn serialize_rows<S: Serializer>(matrix: &CsMat<f64>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    let rows: Vec<Vec<(usize, f64)>> = matrix
        .outer_iterator()
        .map(|row| row.iter().map(|(col, &w)| (col, w)).collect())
        .collect();
    rows.serialize(serializer)
}

/// Raw counts × IDF, L2-normalized.
fn weight_row(counts: BTreeMap<usize, usize>, idf: &[f64]) -> Vec<(usize, f64)> {
    let mut row: Vec<(usize, f64)> = counts
        .into_iter()
        .map(|(col, count)| (col, count as f64 * idf[col]))
        .collect();
    let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for (_, w) in row.iter_mut() {
            *w /= norm;
        }
    }
    row
}

pub struct TfidfVectorizer {
    excluded: HashSet<String>,
}

impl TfidfVectorizer {
    pub fn new(excluded: HashSet<String>) -> Self {
        TfidfVectorizer { excluded }
    }

    pub fn fit_transform(&self, corpus: &[String]) -> Result<DocumentTermMatrix> {
        let n_docs = corpus.len();
        if corpus.iter().all(|text| text.trim().is_empty()) {
            return Err(AnalysisError::EmptyInput);
        }

        // Step 1: tokenize and count document frequencies
        let tokenized: Vec<Vec<&str>> = corpus
            .iter()
            .map(|text| vectorizer_terms(text, &self.excluded))
            .collect();

        let mut df: BTreeMap<&str, usize> = BTreeMap::new();
        for doc in &tokenized {
            let unique: HashSet<&str> = doc.iter().copied().collect();
            for term in unique {
                *df.entry(term).or_insert(0) += 1;
            }
        }

        if df.is_empty() {
            return Err(AnalysisError::EmptyVocabulary { documents: n_docs });
        }

        // Step 2: vocabulary in lexicographic order, smooth IDF
        let terms: Vec<String> = df.keys().map(|t| t.to_string()).collect();
        let doc_freq: Vec<usize> = df.values().copied().collect();
        let idf: Vec<f64> = doc_freq
            .iter()
            .map(|&d| ((1.0 + n_docs as f64) / (1.0 + d as f64)).ln() + 1.0)
            .collect();
        let index: HashMap<String, usize> = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();

        // Step 3: weighted rows
        let mut triplets: TriMat<f64> = TriMat::new((n_docs, terms.len()));
        for (doc_id, doc) in tokenized.iter().enumerate() {
            let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
            for term in doc {
                *counts.entry(index[*term]).or_insert(0) += 1;
            }
            for (col, weight) in weight_row(counts, &idf) {
                triplets.add_triplet(doc_id, col, weight);
            }
        }
        let matrix: CsMat<f64> = triplets.to_csr();

        info!(
            "TF-IDF matrix built - documents={}, vocabulary={}, nnz={}",
            n_docs,
            terms.len(),
            matrix.nnz()
        );
        debug!("Vocabulary: {:?}", terms);

        Ok(DocumentTermMatrix {
            matrix,
            vocabulary: Vocabulary {
                terms,
                idf,
                doc_freq,
                index,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NoiseConfig;

    fn corpus(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_excluded_terms_get_no_column() {
        let vectorizer = TfidfVectorizer::new(NoiseConfig::default().vectorizer_set());
        let dtm = vectorizer
            .fit_transform(&corpus(&["rdv avec le dr pour imprimante", "mars 2024 imprimante"]))
            .unwrap();
        assert_eq!(dtm.vocabulary.terms, vec!["imprimante"]);
    }

    #[test]
    fn test_rarer_terms_weigh_more() {
        let vectorizer = TfidfVectorizer::new(HashSet::new());
        let dtm = vectorizer
            .fit_transform(&corpus(&["vpn panne", "vpn lent", "vpn coupe"]))
            .unwrap();
        let vpn = dtm.vocabulary.index_of("vpn").unwrap();
        let panne = dtm.vocabulary.index_of("panne").unwrap();
        assert!(dtm.vocabulary.idf[panne] > dtm.vocabulary.idf[vpn]);

        let row = dtm.row(0);
        let weight = |col: usize| row.iter().find(|(c, _)| *c == col).unwrap().1;
        assert!(weight(panne) > weight(vpn));
    }

    #[test]
    fn test_rows_are_unit_length() {
        let vectorizer = TfidfVectorizer::new(HashSet::new());
        let dtm = vectorizer
            .fit_transform(&corpus(&["écran noir écran", "clavier sans fil", ""]))
            .unwrap();
        for doc in 0..2 {
            let norm: f64 = dtm.row(doc).iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-12);
        }
        assert!(dtm.row(2).is_empty());
    }

    #[test]
    fn test_empty_corpus_and_vocabulary_errors() {
        let vectorizer = TfidfVectorizer::new(NoiseConfig::default().vectorizer_set());
        assert!(matches!(vectorizer.fit_transform(&[]), Err(AnalysisError::EmptyInput)));
        assert!(matches!(
            vectorizer.fit_transform(&corpus(&["   ", "", "\t"])),
            Err(AnalysisError::EmptyInput)
        ));
        assert!(matches!(
            vectorizer.fit_transform(&corpus(&["le la les", "01 2021"])),
            Err(AnalysisError::EmptyVocabulary { documents: 2 })
        ));
    }

    #[test]
    fn test_transform_matches_fit() {
        let vectorizer = TfidfVectorizer::new(HashSet::new());
        let dtm = vectorizer
            .fit_transform(&corpus(&["session bloquée", "mot de passe bloqué"]))
            .unwrap();
        assert_eq!(dtm.vocabulary.transform("session bloquée"), dtm.row(0));
        assert!(dtm.vocabulary.transform("inconnu").is_empty());
    }

    #[test]
    fn test_top_indices_tie_break_by_index() {
        assert_eq!(top_indices(&[0.5, 0.9, 0.5, 0.9], 3), vec![1, 3, 0]);
    }

    #[test]
    fn test_distinct_rows_collapses_duplicates() {
        let vectorizer = TfidfVectorizer::new(HashSet::new());
        let dtm = vectorizer
            .fit_transform(&corpus(&["vpn refusé", "vpn refusé", "imprimante"]))
            .unwrap();
        assert_eq!(dtm.distinct_rows(), 2);
    }
}
