use std::hash::{Hash, Hasher};

use crate::error::LatticeError;
use crate::pipeline::traits::ScoreFunction;

/// Smallest score a document can receive from the payload functions.
pub const MIN_SCORE: f32 = 1e-6;
/// `ln(MIN_SCORE)`: floor for running in-span log scores.
pub const MIN_LOG_SCORE: f32 = -13.815_511;
/// `ln(1e5)`: shifts span log scores up before exponentiation so short spans do not underflow.
pub const SCORE_MULT: f32 = 11.512_925;

/// How completed spans are merged into the per-document aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    Sum,
    Max,
    Min,
}

impl Combinator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Max => "max",
            Self::Min => "min",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [Self::Sum, Self::Max, Self::Min]
            .into_iter()
            .find(|c| c.as_str() == name)
    }
}

/// Log-domain payload scoring with optional span-length normalization.
#[derive(Debug, Clone, Copy)]
pub struct PayloadScoreFunction {
    combinator: Combinator,
    length_norm_factor: f32,
}

impl PayloadScoreFunction {
    /// `length_norm_factor == 0` disables length normalization.
    pub fn new(combinator: Combinator, length_norm_factor: f32) -> Result<Self, LatticeError> {
        if !length_norm_factor.is_finite() || length_norm_factor < 0.0 {
            return Err(LatticeError::invalid_config(format!(
                "payload_length_norm_factor must be >= 0, got {length_norm_factor}"
            )));
        }
        Ok(Self {
            combinator,
            length_norm_factor,
        })
    }

    /// Sum of spans, each normalized by its width.
    pub fn lattice_default() -> Self {
        Self {
            combinator: Combinator::Sum,
            length_norm_factor: 1.0,
        }
    }

    pub fn combinator(&self) -> Combinator {
        self.combinator
    }

    pub fn length_norm_factor(&self) -> f32 {
        self.length_norm_factor
    }

    fn linear_span_score(&self, span_log_score: f32, width: u32) -> f32 {
        let shifted = SCORE_MULT + span_log_score;
        if self.length_norm_factor == 0.0 {
            return shifted.exp();
        }
        let norm = width.max(1) as f32 * self.length_norm_factor;
        (shifted - norm.ln()).exp()
    }
}

impl Default for PayloadScoreFunction {
    fn default() -> Self {
        Self::lattice_default()
    }
}

impl ScoreFunction for PayloadScoreFunction {
    fn name(&self) -> &'static str {
        match self.combinator {
            Combinator::Sum => "SumPayloadFunction",
            Combinator::Max => "MaxPayloadFunction",
            Combinator::Min => "MinPayloadFunction",
        }
    }

    fn leaf_score(&self, span_log_score: f32, payload: f32) -> f32 {
        let next = span_log_score + payload.max(MIN_SCORE).ln();
        next.max(MIN_LOG_SCORE)
    }

    fn span_score(&self, aggregate: f32, span_log_score: f32, width: u32, spans_seen: u32) -> f32 {
        let span = self.linear_span_score(span_log_score, width);
        match self.combinator {
            Combinator::Sum => aggregate + span,
            _ if spans_seen == 0 => span,
            Combinator::Max => aggregate.max(span),
            Combinator::Min => aggregate.min(span),
        }
    }

    fn doc_score(&self, spans_seen: u32, aggregate: f32) -> f32 {
        if spans_seen > 0 {
            aggregate
        } else {
            MIN_SCORE
        }
    }
}

impl PartialEq for PayloadScoreFunction {
    fn eq(&self, other: &Self) -> bool {
        self.combinator == other.combinator
            && self.length_norm_factor.to_bits() == other.length_norm_factor.to_bits()
    }
}

impl Eq for PayloadScoreFunction {}

impl Hash for PayloadScoreFunction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.combinator.hash(state);
        self.length_norm_factor.to_bits().hash(state);
    }
}
