use std::fmt;

use crate::error::LatticeError;
use crate::index::LatticeIndex;
use crate::scoring::explanation::Explanation;
use crate::types::{DocId, SpanMatch, Token};

/// Pull-based token source. Driven entirely by the caller; never blocks.
pub trait TokenStream {
    fn next_token(&mut self) -> Result<Option<Token>, LatticeError>;

    /// Clears all per-document state so the stream can be replayed.
    fn reset(&mut self);
}

pub trait Tokenizer: Send + Sync {
    fn token_stream(&self, text: &str) -> Box<dyn TokenStream>;
}

/// Wraps a token stream in a filter stage.
pub trait TokenTransform: Send + Sync {
    fn wrap(&self, input: Box<dyn TokenStream>) -> Box<dyn TokenStream>;
}

pub trait SpanPayloadCollector {
    fn collect_leaf(&mut self, payload: Option<&[u8]>);
}

/// Positional matcher producing spans per document.
pub trait SpanMatcher: Send + Sync + fmt::Debug {
    fn terms(&self) -> Vec<&str>;

    /// Documents holding every term of the matcher, ascending.
    fn candidates(&self, index: &LatticeIndex) -> Vec<DocId>;

    fn spans(&self, index: &LatticeIndex, doc: DocId) -> Vec<SpanMatch>;
}

/// Folds payload confidences into span scores and span scores into a document score.
///
/// Stages are invoked per document in the order `leaf_score`* per span,
/// `span_score` once per span, then `doc_score`.
pub trait ScoreFunction: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Adds one payload to the running in-span log score.
    fn leaf_score(&self, span_log_score: f32, payload: f32) -> f32;

    /// Combines a completed span into the per-document aggregate.
    fn span_score(&self, aggregate: f32, span_log_score: f32, width: u32, spans_seen: u32) -> f32;

    fn doc_score(&self, spans_seen: u32, aggregate: f32) -> f32;

    fn explain(&self, spans_seen: u32, aggregate: f32) -> Explanation {
        let expl = Explanation::matched(
            self.doc_score(spans_seen, aggregate),
            format!("{}.doc_score()", self.name()),
            Vec::new(),
        );
        clamp_payload_explanation(expl)
    }
}

fn clamp_payload_explanation(expl: Explanation) -> Explanation {
    if expl.value.is_nan() {
        Explanation::matched(
            0.0,
            "payload score, computed as (score == NaN ? 0 : score) since NaN is an illegal score from:",
            vec![expl],
        )
    } else if expl.value < 0.0 {
        Explanation::matched(
            0.0,
            "truncated score, max of:",
            vec![Explanation::matched(0.0, "minimum score", Vec::new()), expl],
        )
    } else {
        expl
    }
}
