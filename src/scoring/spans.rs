use std::fmt;

use crate::index::{LatticeIndex, Posting};
use crate::pipeline::traits::{SpanMatcher, SpanPayloadCollector};
use crate::types::{DocId, LeafOccurrence, SpanMatch};

impl SpanMatch {
    /// Feeds every leaf payload, in match order, to `collector`.
    pub fn collect(&self, collector: &mut dyn SpanPayloadCollector) {
        for leaf in &self.leaves {
            collector.collect_leaf(leaf.payload.as_deref());
        }
    }
}

fn leaf(term: &str, posting: &Posting) -> LeafOccurrence {
    LeafOccurrence {
        term: term.to_string(),
        position: posting.position,
        payload: posting.payload.clone(),
    }
}

/// Every occurrence of a single term, each as a width-one span.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TermSpans {
    term: String,
}

impl TermSpans {
    pub fn new(term: impl Into<String>) -> Self {
        Self { term: term.into() }
    }

    pub fn term(&self) -> &str {
        &self.term
    }
}

impl SpanMatcher for TermSpans {
    fn terms(&self) -> Vec<&str> {
        vec![self.term.as_str()]
    }

    fn candidates(&self, index: &LatticeIndex) -> Vec<DocId> {
        index.docs_with_term(&self.term).collect()
    }

    fn spans(&self, index: &LatticeIndex, doc: DocId) -> Vec<SpanMatch> {
        index
            .postings(&self.term, doc)
            .iter()
            .map(|p| SpanMatch {
                start: p.position,
                end: p.position.saturating_add(1),
                slop_width: 0,
                leaves: vec![leaf(&self.term, p)],
            })
            .collect()
    }
}

/// Proximity match of several terms within `slop` skipped positions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NearSpans {
    clauses: Vec<String>,
    slop: u32,
    in_order: bool,
}

impl NearSpans {
    pub fn new(clauses: Vec<String>, slop: u32, in_order: bool) -> Self {
        Self {
            clauses,
            slop,
            in_order,
        }
    }

    pub fn clauses(&self) -> &[String] {
        &self.clauses
    }

    pub fn slop(&self) -> u32 {
        self.slop
    }

    pub fn in_order(&self) -> bool {
        self.in_order
    }

    fn gap(&self, start: u32, end: u32) -> u32 {
        end.saturating_sub(start)
            .saturating_sub(self.clauses.len() as u32)
    }

    fn build_span(&self, chosen: &[&Posting]) -> SpanMatch {
        let start = chosen.iter().map(|p| p.position).min().unwrap_or(0);
        let end = chosen.iter().map(|p| p.position.saturating_add(1)).max().unwrap_or(0);
        SpanMatch {
            start,
            end,
            slop_width: self.gap(start, end),
            leaves: self
                .clauses
                .iter()
                .zip(chosen)
                .map(|(term, p)| leaf(term, p))
                .collect(),
        }
    }

    fn ordered(&self, lists: &[&[Posting]]) -> Vec<SpanMatch> {
        let mut out = Vec::new();
        'starts: for first in lists[0] {
            let mut chosen = vec![first];
            let mut prev_end = first.position.saturating_add(1);
            for list in &lists[1..] {
                let next = list.partition_point(|p| p.position < prev_end);
                let Some(posting) = list.get(next) else {
                    // Later starts can only push the remaining clauses further right.
                    break 'starts;
                };
                prev_end = posting.position.saturating_add(1);
                chosen.push(posting);
            }
            let span = self.build_span(&chosen);
            if span.slop_width <= self.slop {
                out.push(span);
            }
        }
        out
    }

    fn unordered(&self, lists: &[&[Posting]]) -> Vec<SpanMatch> {
        let mut out = Vec::new();
        let mut cursors = vec![0usize; lists.len()];
        loop {
            let chosen: Vec<&Posting> = lists
                .iter()
                .zip(&cursors)
                .map(|(list, &i)| &list[i])
                .collect();
            let span = self.build_span(&chosen);
            if span.slop_width <= self.slop {
                out.push(span);
            }

            let Some(lowest) = (0..chosen.len()).min_by_key(|&i| (chosen[i].position, i)) else {
                break;
            };
            cursors[lowest] += 1;
            if cursors[lowest] >= lists[lowest].len() {
                break;
            }
        }
        out
    }
}

impl SpanMatcher for NearSpans {
    fn terms(&self) -> Vec<&str> {
        self.clauses.iter().map(String::as_str).collect()
    }

    fn candidates(&self, index: &LatticeIndex) -> Vec<DocId> {
        let Some((first, rest)) = self.clauses.split_first() else {
            return Vec::new();
        };
        index
            .docs_with_term(first)
            .filter(|&doc| rest.iter().all(|t| index.term_frequency(t, doc) > 0))
            .collect()
    }

    fn spans(&self, index: &LatticeIndex, doc: DocId) -> Vec<SpanMatch> {
        let lists: Vec<&[Posting]> = self
            .clauses
            .iter()
            .map(|t| index.postings(t, doc))
            .collect();
        if lists.is_empty() || lists.iter().any(|l| l.is_empty()) {
            return Vec::new();
        }
        if self.in_order {
            self.ordered(&lists)
        } else {
            self.unordered(&lists)
        }
    }
}

/// The closed set of positional matchers a payload query can wrap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SpanQuery {
    Term(TermSpans),
    Near(NearSpans),
}

impl SpanMatcher for SpanQuery {
    fn terms(&self) -> Vec<&str> {
        match self {
            Self::Term(t) => t.terms(),
            Self::Near(n) => n.terms(),
        }
    }

    fn candidates(&self, index: &LatticeIndex) -> Vec<DocId> {
        match self {
            Self::Term(t) => t.candidates(index),
            Self::Near(n) => n.candidates(index),
        }
    }

    fn spans(&self, index: &LatticeIndex, doc: DocId) -> Vec<SpanMatch> {
        match self {
            Self::Term(t) => t.spans(index, doc),
            Self::Near(n) => n.spans(index, doc),
        }
    }
}

impl fmt::Display for SpanQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Term(t) => write!(f, "{}", t.term),
            Self::Near(n) => write!(
                f,
                "spanNear([{}], {}, {})",
                n.clauses.join(", "),
                n.slop,
                n.in_order
            ),
        }
    }
}
