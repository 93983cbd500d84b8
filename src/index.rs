//! In-memory positional index with one payload per term occurrence.

use std::collections::{BTreeMap, HashMap};

use crate::error::LatticeError;
use crate::pipeline::runtime::LatticeAnalyzer;
use crate::types::{DocId, Token};

#[derive(Debug, Clone, PartialEq)]
pub struct Posting {
    pub position: u32,
    pub payload: Option<Vec<u8>>,
}

pub struct LatticeIndex {
    analyzer: LatticeAnalyzer,
    // term -> doc -> occurrences in position order
    postings: HashMap<String, BTreeMap<DocId, Vec<Posting>>>,
    doc_lengths: BTreeMap<DocId, u32>,
    total_length: u64,
}

impl LatticeIndex {
    /// Highest stored position; leaves room for a half-open span end.
    pub const MAX_POSITION: u32 = u32::MAX - 1;

    pub fn new(analyzer: LatticeAnalyzer) -> Self {
        Self {
            analyzer,
            postings: HashMap::new(),
            doc_lengths: BTreeMap::new(),
            total_length: 0,
        }
    }

    pub fn analyzer(&self) -> &LatticeAnalyzer {
        &self.analyzer
    }

    /// Analyzes `text` and indexes it under `doc`, replacing any previous version.
    ///
    /// A malformed lattice token fails the whole document; the index is left
    /// exactly as it was.
    pub fn add_document(&mut self, doc: DocId, text: &str) -> Result<(), LatticeError> {
        let tokens = self.analyzer.analyze(text)?;
        self.add_tokens(doc, &tokens);
        Ok(())
    }

    pub fn add_tokens(&mut self, doc: DocId, tokens: &[Token]) {
        self.delete_document(doc);

        let mut position: i64 = -1;
        let mut length = 0u32;
        for token in tokens {
            position = position.saturating_add(i64::from(token.position_increment));
            if token.position_increment > 0 {
                length += 1;
            }
            let posting = Posting {
                position: position.clamp(0, i64::from(Self::MAX_POSITION)) as u32,
                payload: token.payload.clone(),
            };
            self.postings
                .entry(token.term.clone())
                .or_default()
                .entry(doc)
                .or_default()
                .push(posting);
        }

        tracing::debug!(doc, tokens = tokens.len(), length, "index: added document");
        self.doc_lengths.insert(doc, length);
        self.total_length += u64::from(length);
    }

    /// Returns whether the document existed.
    pub fn delete_document(&mut self, doc: DocId) -> bool {
        let Some(length) = self.doc_lengths.remove(&doc) else {
            return false;
        };
        self.total_length -= u64::from(length);
        self.postings.retain(|_, docs| {
            docs.remove(&doc);
            !docs.is_empty()
        });
        true
    }

    pub fn num_docs(&self) -> u32 {
        self.doc_lengths.len() as u32
    }

    pub fn document_ids(&self) -> impl Iterator<Item = DocId> + '_ {
        self.doc_lengths.keys().copied()
    }

    /// Count of tokens that advanced the position; stacked alternatives are not counted.
    pub fn document_length(&self, doc: DocId) -> u32 {
        self.doc_lengths.get(&doc).copied().unwrap_or(0)
    }

    pub fn avg_doc_len(&self) -> f32 {
        if self.doc_lengths.is_empty() {
            return 0.0;
        }
        self.total_length as f32 / self.doc_lengths.len() as f32
    }

    pub fn doc_frequency(&self, term: &str) -> u32 {
        self.postings.get(term).map_or(0, |docs| docs.len() as u32)
    }

    /// Documents containing `term`, ascending.
    pub fn docs_with_term<'a>(&'a self, term: &str) -> impl Iterator<Item = DocId> + 'a {
        self.postings
            .get(term)
            .into_iter()
            .flat_map(|docs| docs.keys().copied())
    }

    pub fn postings(&self, term: &str, doc: DocId) -> &[Posting] {
        self.postings
            .get(term)
            .and_then(|docs| docs.get(&doc))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn term_frequency(&self, term: &str, doc: DocId) -> u32 {
        self.postings(term, doc).len() as u32
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> + '_ {
        self.postings.keys().map(String::as_str)
    }
}
