use crate::error::LatticeError;
use crate::pipeline::traits::{TokenStream, TokenTransform, Tokenizer};
use crate::types::{LatticeFormat, Token};

/// Tokenizer followed by an ordered chain of filter stages.
pub struct LatticeAnalyzer {
    tokenizer: Box<dyn Tokenizer>,
    filters: Vec<Box<dyn TokenTransform>>,
    format: LatticeFormat,
    position_increment_secs: f32,
}

pub(crate) struct LatticeAnalyzerParts {
    pub tokenizer: Box<dyn Tokenizer>,
    pub filters: Vec<Box<dyn TokenTransform>>,
    pub format: LatticeFormat,
    pub position_increment_secs: f32,
}

impl LatticeAnalyzer {
    pub(crate) fn from_parts(parts: LatticeAnalyzerParts) -> Self {
        Self {
            tokenizer: parts.tokenizer,
            filters: parts.filters,
            format: parts.format,
            position_increment_secs: parts.position_increment_secs,
        }
    }

    pub fn format(&self) -> LatticeFormat {
        self.format
    }

    /// Seconds per position step; only meaningful for the audio format.
    pub fn position_increment_secs(&self) -> f32 {
        self.position_increment_secs
    }

    pub fn token_stream(&self, text: &str) -> Box<dyn TokenStream> {
        let stream = self.tokenizer.token_stream(text);
        self.filters
            .iter()
            .fold(stream, |stream, filter| filter.wrap(stream))
    }

    /// Drains the full chain; the first malformed token aborts the whole text.
    pub fn analyze(&self, text: &str) -> Result<Vec<Token>, LatticeError> {
        let mut stream = self.token_stream(text);
        let mut tokens = Vec::new();
        while let Some(token) = stream.next_token()? {
            tokens.push(token);
        }
        tracing::trace!(tokens = tokens.len(), "analyzed text");
        Ok(tokens)
    }
}
