use std::fmt;
use std::hash::{Hash, Hasher};

use crate::encoding::payload::FloatDecoder;
use crate::index::LatticeIndex;
use crate::pipeline::traits::{ScoreFunction, SpanMatcher, SpanPayloadCollector};
use crate::scoring::explanation::Explanation;
use crate::scoring::function::PayloadScoreFunction;
use crate::scoring::similarity::SpanSimilarity;
use crate::scoring::spans::SpanQuery;
use crate::types::{DocId, ScoredDoc, SpanMatch};

/// Running score state for one document. Created fresh per document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpanMatchState {
    pub payloads_seen: u32,
    pub span_log_score: f32,
    pub aggregate: f32,
    /// Log score of every completed span, in match order.
    pub span_scores: Vec<f32>,
    pub spans_seen: u32,
}

struct DocScorer<'q, F> {
    function: &'q F,
    decoder: FloatDecoder,
    state: SpanMatchState,
}

impl<F: ScoreFunction> SpanPayloadCollector for DocScorer<'_, F> {
    fn collect_leaf(&mut self, payload: Option<&[u8]>) {
        let value = self.decoder.decode(payload);
        let state = &mut self.state;
        state.span_log_score = self.function.leaf_score(state.span_log_score, value);
        state.payloads_seen += 1;
        tracing::trace!(
            payload = value,
            span_log_score = state.span_log_score,
            "folded leaf payload"
        );
    }
}

impl<'q, F: ScoreFunction> DocScorer<'q, F> {
    fn new(function: &'q F, decoder: FloatDecoder) -> Self {
        Self {
            function,
            decoder,
            state: SpanMatchState::default(),
        }
    }

    fn score_spans(mut self, spans: &[SpanMatch]) -> SpanMatchState {
        for span in spans {
            self.state.span_log_score = 0.0;
            self.state.payloads_seen = 0;
            span.collect(&mut self);

            let state = &mut self.state;
            state.aggregate = self.function.span_score(
                state.aggregate,
                state.span_log_score,
                span.width(),
                state.spans_seen,
            );
            state.span_scores.push(state.span_log_score);
            state.spans_seen += 1;
            tracing::debug!(
                start = span.start,
                end = span.end,
                payloads = state.payloads_seen,
                span_log_score = state.span_log_score,
                aggregate = state.aggregate,
                "scored span"
            );
        }
        self.state
    }
}

fn sanitize(score: f32) -> f32 {
    if score.is_nan() || score < 0.0 {
        0.0
    } else {
        score
    }
}

/// Wraps a span matcher and scores each matching document by the confidence
/// payloads of the occurrences inside its spans.
#[derive(Debug, Clone)]
pub struct PayloadScoreQuery<F = PayloadScoreFunction> {
    matcher: SpanQuery,
    function: F,
    decoder: FloatDecoder,
    include_span_score: bool,
    boost: f32,
    similarity: SpanSimilarity,
}

impl<F: ScoreFunction> PayloadScoreQuery<F> {
    pub fn new(
        matcher: SpanQuery,
        function: F,
        decoder: FloatDecoder,
        include_span_score: bool,
    ) -> Self {
        Self {
            matcher,
            function,
            decoder,
            include_span_score,
            boost: 1.0,
            similarity: SpanSimilarity::default(),
        }
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn with_similarity(mut self, similarity: SpanSimilarity) -> Self {
        self.similarity = similarity;
        self
    }

    pub fn matcher(&self) -> &SpanQuery {
        &self.matcher
    }

    pub fn function(&self) -> &F {
        &self.function
    }

    pub fn decoder(&self) -> FloatDecoder {
        self.decoder
    }

    pub fn include_span_score(&self) -> bool {
        self.include_span_score
    }

    pub fn boost(&self) -> f32 {
        self.boost
    }

    /// Spans of `doc` together with the folded state, or `None` when nothing matched.
    pub fn match_state(
        &self,
        index: &LatticeIndex,
        doc: DocId,
    ) -> Option<(Vec<SpanMatch>, SpanMatchState)> {
        let spans = self.matcher.spans(index, doc);
        if spans.is_empty() {
            return None;
        }
        let state = DocScorer::new(&self.function, self.decoder).score_spans(&spans);
        Some((spans, state))
    }

    pub fn score_document(&self, index: &LatticeIndex, doc: DocId) -> Option<f32> {
        let (spans, state) = self.match_state(index, doc)?;
        let payload = sanitize(self.function.doc_score(state.spans_seen, state.aggregate));
        let score = if self.include_span_score {
            let terms = self.matcher.terms();
            payload * self.similarity.score(index, &terms, self.boost, doc, &spans)
        } else {
            payload
        };
        tracing::debug!(doc, spans = state.spans_seen, payload, score, "scored document");
        Some(sanitize(score))
    }

    pub fn explain(&self, index: &LatticeIndex, doc: DocId) -> Explanation {
        let Some((spans, state)) = self.match_state(index, doc) else {
            return Explanation::no_match("No match");
        };
        let payload = self.function.explain(state.spans_seen, state.aggregate);
        if !self.include_span_score {
            return payload;
        }
        let terms = self.matcher.terms();
        let span = self.similarity.explain(index, &terms, self.boost, doc, &spans);
        Explanation::matched(
            sanitize(span.value * payload.value),
            "PayloadSpanQuery, product of:",
            vec![span, payload],
        )
    }

    /// Top `k` documents by score desc, then doc id asc.
    pub fn search(&self, index: &LatticeIndex, k: usize) -> Vec<ScoredDoc> {
        if k == 0 {
            return Vec::new();
        }
        let mut results: Vec<ScoredDoc> = self
            .matcher
            .candidates(index)
            .into_iter()
            .filter_map(|doc| {
                let score = self.score_document(index, doc)?;
                score.is_finite().then_some(ScoredDoc { doc, score })
            })
            .collect();
        results.sort_unstable_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.doc.cmp(&b.doc))
        });
        results.truncate(k);
        results
    }
}

impl<F: ScoreFunction> fmt::Display for PayloadScoreQuery<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PayloadScoreQuery({}, function: {}, includeSpanScore: {})",
            self.matcher,
            self.function.name(),
            self.include_span_score
        )?;
        if self.boost != 1.0 {
            write!(f, "^{}", self.boost)?;
        }
        Ok(())
    }
}

impl<F: PartialEq> PartialEq for PayloadScoreQuery<F> {
    fn eq(&self, other: &Self) -> bool {
        self.matcher == other.matcher
            && self.function == other.function
            && self.decoder == other.decoder
            && self.include_span_score == other.include_span_score
            && self.boost.to_bits() == other.boost.to_bits()
    }
}

impl<F: Eq> Eq for PayloadScoreQuery<F> {}

impl<F: Hash> Hash for PayloadScoreQuery<F> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.matcher.hash(state);
        self.function.hash(state);
        self.decoder.hash(state);
        self.include_span_score.hash(state);
        self.boost.to_bits().hash(state);
    }
}
