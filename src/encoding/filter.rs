use std::sync::Arc;

use crate::config::LatticeFilterConfig;
use crate::encoding::buckets::BucketTable;
use crate::encoding::token_record::{TokenRecord, TokenRecordParser};
use crate::error::LatticeError;
use crate::pipeline::traits::{TokenStream, TokenTransform};
use crate::types::Token;

/// Expands lattice-annotated tokens into positioned, payload-carrying tokens.
///
/// Annotated tokens are truncated to their surface text, given the encoded
/// score as payload and re-emitted according to the bucket table. Tokens
/// without any delimiter pass through unchanged.
pub struct LatticeTokenFilter {
    input: Box<dyn TokenStream>,
    parser: TokenRecordParser,
    buckets: Arc<BucketTable>,
    current: TokenRecord,
    previous: TokenRecord,
    first_token: bool,
    pending_repeats: u32,
    last_emitted: Option<Token>,
}

impl LatticeTokenFilter {
    pub fn new(
        input: Box<dyn TokenStream>,
        parser: TokenRecordParser,
        buckets: Arc<BucketTable>,
    ) -> Self {
        Self {
            input,
            parser,
            buckets,
            current: TokenRecord::default(),
            previous: TokenRecord::default(),
            first_token: true,
            pending_repeats: 0,
            last_emitted: None,
        }
    }

    fn repeat_last(&mut self) -> Option<Token> {
        let mut token = self.last_emitted.clone()?;
        token.position_increment = 0;
        self.pending_repeats -= 1;
        Some(token)
    }
}

impl TokenStream for LatticeTokenFilter {
    fn next_token(&mut self) -> Result<Option<Token>, LatticeError> {
        if self.pending_repeats > 0 {
            if let Some(token) = self.repeat_last() {
                return Ok(Some(token));
            }
            self.pending_repeats = 0;
        }

        let Some(mut token) = self.input.next_token()? else {
            return Ok(None);
        };

        if !self.parser.parse_into(&mut self.current, &token.term)? {
            return Ok(Some(token));
        }

        token.term.truncate(self.current.surface_len);
        token.payload = self.current.encoded_score.map(|bytes| bytes.to_vec());
        token.position_increment = if self.first_token {
            self.parser.layout().first_increment()
        } else {
            self.parser
                .position_increment(&self.current, &self.previous)
        };
        self.first_token = false;

        let score = self.current.score.unwrap_or_default();
        self.pending_repeats = self.buckets.repeat_count(score).saturating_sub(1);

        tracing::trace!(
            term = token.term.as_str(),
            position = self.current.position,
            rank = self.current.rank,
            score,
            position_increment = token.position_increment,
            repeats = self.pending_repeats,
            "lattice filter: emitted token"
        );

        std::mem::swap(&mut self.current, &mut self.previous);
        self.current.reset();
        self.last_emitted = Some(token.clone());
        Ok(Some(token))
    }

    fn reset(&mut self) {
        self.input.reset();
        self.current.reset();
        self.previous.reset();
        self.first_token = true;
        self.pending_repeats = 0;
        self.last_emitted = None;
    }
}

/// Builds [`LatticeTokenFilter`] stages from validated settings.
#[derive(Debug, Clone)]
pub struct LatticeTokenFilterFactory {
    parser: TokenRecordParser,
    buckets: Arc<BucketTable>,
}

impl LatticeTokenFilterFactory {
    pub fn new(parser: TokenRecordParser, buckets: BucketTable) -> Self {
        Self {
            parser,
            buckets: Arc::new(buckets),
        }
    }

    pub fn from_config(config: &LatticeFilterConfig) -> Result<Self, LatticeError> {
        config.validate()?;
        let parser = TokenRecordParser::new(config.token_layout()?, config.delimiter);
        Ok(Self::new(parser, config.bucket_table()?))
    }

    pub fn parser(&self) -> &TokenRecordParser {
        &self.parser
    }

    pub fn buckets(&self) -> &BucketTable {
        &self.buckets
    }
}

impl TokenTransform for LatticeTokenFilterFactory {
    fn wrap(&self, input: Box<dyn TokenStream>) -> Box<dyn TokenStream> {
        Box::new(LatticeTokenFilter::new(
            input,
            self.parser,
            Arc::clone(&self.buckets),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::payload::encode_float;
    use crate::encoding::token_record::TokenLayout;
    use crate::encoding::whitespace::WhitespaceTokenStream;

    const BASE_INPUT: &str =
        "the|0|1|0.3 quick|1|0|0.9 brick|1|1|0.01 brown|2|0|1.0 fox|3|0|0.7 box|3|1|0.2";

    fn filter(text: &str, config: &LatticeFilterConfig) -> Box<dyn TokenStream> {
        let factory = LatticeTokenFilterFactory::from_config(config).expect("valid config");
        factory.wrap(Box::new(WhitespaceTokenStream::new(text)))
    }

    fn drain(stream: &mut dyn TokenStream) -> Vec<Token> {
        let mut out = Vec::new();
        while let Some(token) = stream.next_token().expect("well-formed input") {
            out.push(token);
        }
        out
    }

    fn terms(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.term.as_str()).collect()
    }

    fn increments(tokens: &[Token]) -> Vec<u32> {
        tokens.iter().map(|t| t.position_increment).collect()
    }

    #[test]
    fn plain_tokens_pass_through() {
        let mut stream = filter("the quick brown fox", &LatticeFilterConfig::default());
        let tokens = drain(stream.as_mut());
        assert_eq!(terms(&tokens), ["the", "quick", "brown", "fox"]);
        assert_eq!(increments(&tokens), [1, 1, 1, 1]);
        assert!(tokens.iter().all(|t| t.payload.is_none()));
    }

    #[test]
    fn base_lattice_without_buckets() {
        let mut stream = filter(BASE_INPUT, &LatticeFilterConfig::default());
        let tokens = drain(stream.as_mut());
        assert_eq!(terms(&tokens), ["the", "quick", "brick", "brown", "fox", "box"]);
        assert_eq!(increments(&tokens), [1, 1, 0, 1, 1, 0]);
        let payloads: Vec<Vec<u8>> = [0.3f32, 0.9, 0.01, 1.0, 0.7, 0.2]
            .iter()
            .map(|&s| encode_float(s).to_vec())
            .collect();
        let actual: Vec<Vec<u8>> = tokens.iter().map(|t| t.payload.clone().unwrap()).collect();
        assert_eq!(actual, payloads);
    }

    #[test]
    fn base_lattice_with_buckets_repeats_tokens() {
        let config =
            LatticeFilterConfig::from_json_str(r#"{"score_buckets": "0.9, 5, 0.5, 3, 0.2, 2"}"#)
                .unwrap();
        let mut stream = filter(BASE_INPUT, &config);
        let tokens = drain(stream.as_mut());
        assert_eq!(
            terms(&tokens),
            [
                "the", "the", "quick", "quick", "quick", "quick", "quick", "brick", "brown",
                "brown", "brown", "brown", "brown", "fox", "fox", "fox", "box", "box"
            ]
        );
        assert_eq!(
            increments(&tokens),
            [1, 0, 1, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0]
        );
        assert_eq!(tokens[1].payload, Some(encode_float(0.3).to_vec()));
        assert_eq!(tokens[6].payload, Some(encode_float(0.9).to_vec()));
        assert_eq!(tokens[7].payload, Some(encode_float(0.01).to_vec()));
    }

    #[test]
    fn audio_lattice_spaces_positions_by_time() {
        let config = LatticeFilterConfig::from_json_str(
            r#"{"lattice_format": "audio", "audio_position_increment_seconds": 0.5}"#,
        )
        .unwrap();
        let input = "the|0|1|0.3|1.0|1.5 quick|1|0|0.9|2.0|2.4 brick|1|1|0.01|2.0|2.4 \
                     brown|2|0|1.0|3.5|3.9 fox|3|0|0.7|4.0|4.5 box|3|1|0.2|4.0|4.5";
        let mut stream = filter(input, &config);
        let tokens = drain(stream.as_mut());
        assert_eq!(terms(&tokens), ["the", "quick", "brick", "brown", "fox", "box"]);
        assert_eq!(increments(&tokens), [1, 3, 0, 4, 2, 0]);
    }

    #[test]
    fn malformed_token_aborts_stream() {
        let mut stream = filter("good|0|0|0.5 bad|1|0.5", &LatticeFilterConfig::default());
        assert!(stream.next_token().unwrap().is_some());
        let err = stream.next_token().unwrap_err();
        assert!(matches!(err, LatticeError::MalformedToken { .. }));
    }

    #[test]
    fn reset_restores_first_token_state() {
        let config = LatticeFilterConfig::from_json_str(r#"{"score_buckets": [0.5, 2]}"#).unwrap();
        let mut stream = filter("a|4|0|0.9 b|4|1|0.1", &config);
        let first = stream.next_token().unwrap().unwrap();
        assert_eq!(first.position_increment, 1);
        // Abandon mid-repeat, then replay from the start.
        stream.reset();
        let tokens = drain(stream.as_mut());
        assert_eq!(terms(&tokens), ["a", "a", "b"]);
        assert_eq!(increments(&tokens), [1, 0, 0]);
    }

    #[test]
    fn custom_layout_factory() {
        let factory = LatticeTokenFilterFactory::new(
            TokenRecordParser::new(TokenLayout::Base, '#'),
            BucketTable::default(),
        );
        let mut stream = factory.wrap(Box::new(WhitespaceTokenStream::new("x#0#0#0.5 y#0#1#0.4")));
        let tokens = drain(stream.as_mut());
        assert_eq!(terms(&tokens), ["x", "y"]);
        assert_eq!(increments(&tokens), [1, 0]);
    }
}
