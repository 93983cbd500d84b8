use crate::index::LatticeIndex;
use crate::scoring::explanation::Explanation;
use crate::types::{DocId, SpanMatch};

/// BM25 over sloppy span frequency: the wrapped matcher's own relevance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpanSimilarity {
    /// Term-frequency saturation.
    pub k1: f32,
    /// Length normalization strength.
    pub b: f32,
}

impl Default for SpanSimilarity {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

impl SpanSimilarity {
    /// Positive for every document frequency, including `df == n`.
    pub fn idf(num_docs: u32, doc_freq: u32) -> f32 {
        let n = num_docs as f32;
        let df = doc_freq as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    /// Each span counts `1 / (1 + slop_width)`; exact matches count fully.
    pub fn sloppy_freq(spans: &[SpanMatch]) -> f32 {
        spans
            .iter()
            .map(|s| 1.0 / (1.0 + s.slop_width as f32))
            .sum()
    }

    fn weight(index: &LatticeIndex, terms: &[&str]) -> f32 {
        terms
            .iter()
            .map(|t| Self::idf(index.num_docs(), index.doc_frequency(t)))
            .sum()
    }

    fn tf_norm(&self, index: &LatticeIndex, doc: DocId, freq: f32) -> f32 {
        let avg = index.avg_doc_len();
        let len_ratio = if avg > 0.0 {
            index.document_length(doc) as f32 / avg
        } else {
            1.0
        };
        let norm = self.k1 * (1.0 - self.b + self.b * len_ratio);
        freq * (self.k1 + 1.0) / (freq + norm)
    }

    pub fn score(
        &self,
        index: &LatticeIndex,
        terms: &[&str],
        boost: f32,
        doc: DocId,
        spans: &[SpanMatch],
    ) -> f32 {
        let freq = Self::sloppy_freq(spans);
        if freq == 0.0 {
            return 0.0;
        }
        boost * Self::weight(index, terms) * self.tf_norm(index, doc, freq)
    }

    pub fn explain(
        &self,
        index: &LatticeIndex,
        terms: &[&str],
        boost: f32,
        doc: DocId,
        spans: &[SpanMatch],
    ) -> Explanation {
        let freq = Self::sloppy_freq(spans);
        let idfs = terms
            .iter()
            .map(|t| {
                let df = index.doc_frequency(t);
                Explanation::matched(
                    Self::idf(index.num_docs(), df),
                    format!(
                        "idf({t}), computed as ln(1 + (N - n + 0.5) / (n + 0.5)) from: n={df}, N={}",
                        index.num_docs()
                    ),
                    Vec::new(),
                )
            })
            .collect();
        let weight = Self::weight(index, terms);
        let tf = self.tf_norm(index, doc, freq);
        Explanation::matched(
            self.score(index, terms, boost, doc, spans),
            format!("weight(spans in {doc}), result of:"),
            vec![
                Explanation::matched(boost, "boost", Vec::new()),
                Explanation::matched(weight, "idf, sum of:", idfs),
                Explanation::matched(
                    tf,
                    format!(
                        "tf, computed as freq * (k1 + 1) / (freq + k1 * (1 - b + b * dl / avgdl)) from: freq={freq}, k1={}, b={}, dl={}, avgdl={}",
                        self.k1,
                        self.b,
                        index.document_length(doc),
                        index.avg_doc_len()
                    ),
                    Vec::new(),
                ),
            ],
        )
    }
}
