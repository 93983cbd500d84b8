use crate::encoding::payload::{encode_float, EncodedScore};
use crate::error::LatticeError;

/// Per-format field layout and position-increment policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenLayout {
    /// `word|position|rank|score`
    Base,
    /// `word|position|rank|score|start|stop`, positions spaced by elapsed time.
    Timed { increment_secs: f32 },
}

impl TokenLayout {
    const BASE_DELIMITERS: usize = 3;
    const TIMED_EXTRA_FIELDS: usize = 2;

    /// Exact number of delimiters an annotated token must carry.
    pub fn delimiter_count(self) -> usize {
        match self {
            Self::Base => Self::BASE_DELIMITERS,
            Self::Timed { .. } => Self::BASE_DELIMITERS + Self::TIMED_EXTRA_FIELDS,
        }
    }

    pub fn position_increment(self, current: &TokenRecord, previous: &TokenRecord) -> u32 {
        if current.position == previous.position {
            return 0;
        }
        match self {
            Self::Base => 1,
            Self::Timed { increment_secs } => {
                let elapsed = current.start_time - previous.start_time;
                let steps = (elapsed / increment_secs).floor();
                if steps < 0.0 {
                    tracing::warn!(
                        position = current.position,
                        previous_position = previous.position,
                        elapsed_secs = elapsed,
                        "lattice: start time moved backwards between slots"
                    );
                    return 1;
                }
                // saturates for gaps beyond u32 positions
                (steps as u32).saturating_add(1)
            }
        }
    }

    pub fn first_increment(self) -> u32 {
        1
    }
}

/// Structured fields of one raw annotated token.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TokenRecord {
    pub surface_len: usize,
    pub position: i32,
    pub rank: i32,
    pub score: Option<f32>,
    pub encoded_score: Option<EncodedScore>,
    pub start_time: f32,
    pub stop_time: f32,
}

impl TokenRecord {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Fills `self` from `raw`.
    ///
    /// Returns `Ok(false)` when the token carries no delimiter at all; the caller
    /// passes such tokens through untouched.
    pub fn parse(
        &mut self,
        raw: &str,
        layout: TokenLayout,
        delimiter: char,
    ) -> Result<bool, LatticeError> {
        let delimiters: Vec<usize> = raw.match_indices(delimiter).map(|(i, _)| i).collect();
        if delimiters.is_empty() {
            return Ok(false);
        }
        let expected = layout.delimiter_count();
        if delimiters.len() != expected {
            return Err(LatticeError::malformed_token(
                raw,
                format!(
                    "expected {expected} '{delimiter}' delimiters, found {}",
                    delimiters.len()
                ),
            ));
        }

        let width = delimiter.len_utf8();
        let field = |n: usize| {
            let start = delimiters[n - 1] + width;
            let end = delimiters.get(n).copied().unwrap_or(raw.len());
            &raw[start..end]
        };

        self.surface_len = delimiters[0];
        self.position = parse_field(raw, field(1), "position")?;
        self.rank = parse_field(raw, field(2), "rank")?;
        let score: f32 = parse_field(raw, field(3), "score")?;
        if !score.is_finite() || score <= 0.0 {
            tracing::warn!(token = raw, score, "lattice: score is not a positive finite number");
        }
        self.score = Some(score);
        self.encoded_score = Some(encode_float(score));

        if let TokenLayout::Timed { .. } = layout {
            self.start_time = parse_field(raw, field(4), "start time")?;
            self.stop_time = parse_field(raw, field(5), "stop time")?;
        }
        Ok(true)
    }
}

fn parse_field<T: std::str::FromStr>(raw: &str, text: &str, name: &str) -> Result<T, LatticeError>
where
    T::Err: std::fmt::Display,
{
    text.trim()
        .parse()
        .map_err(|e| LatticeError::malformed_token(raw, format!("bad {name} field `{text}`: {e}")))
}

/// Parses raw tokens for one lattice layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenRecordParser {
    layout: TokenLayout,
    delimiter: char,
}

impl TokenRecordParser {
    pub fn new(layout: TokenLayout, delimiter: char) -> Self {
        Self { layout, delimiter }
    }

    pub fn layout(&self) -> TokenLayout {
        self.layout
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn parse(&self, raw: &str) -> Result<Option<TokenRecord>, LatticeError> {
        let mut record = TokenRecord::default();
        Ok(self.parse_into(&mut record, raw)?.then_some(record))
    }

    pub fn parse_into(&self, record: &mut TokenRecord, raw: &str) -> Result<bool, LatticeError> {
        record.parse(raw, self.layout, self.delimiter)
    }

    pub fn position_increment(&self, current: &TokenRecord, previous: &TokenRecord) -> u32 {
        self.layout.position_increment(current, previous)
    }
}
