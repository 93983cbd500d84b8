use crate::config::LatticeQueryConfig;
use crate::error::LatticeError;
use crate::index::LatticeIndex;
use crate::pipeline::runtime::LatticeAnalyzer;
use crate::scoring::query::PayloadScoreQuery;
use crate::scoring::spans::{NearSpans, SpanQuery, TermSpans};
use crate::types::{LatticeFormat, ScoredDoc};

/// Converts a time window into a position slop for audio lattices.
///
/// Slop counts skipped positions only, and each matched term beyond the
/// second occupies a position the window would otherwise skip.
pub fn secs_to_slop(slop_seconds: f32, increment_secs: f32, num_terms: usize) -> u32 {
    let steps = (slop_seconds / increment_secs).floor() as i64;
    let slop = steps - (num_terms as i64 - 2) - 1;
    slop.clamp(0, i64::from(u32::MAX)) as u32
}

/// Free-text query against a lattice field.
#[derive(Debug, Clone)]
pub struct MatchLatticeQuery {
    text: String,
    config: LatticeQueryConfig,
}

impl MatchLatticeQuery {
    pub fn new(text: impl Into<String>, config: LatticeQueryConfig) -> Result<Self, LatticeError> {
        config.validate()?;
        Ok(Self {
            text: text.into(),
            config,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn config(&self) -> &LatticeQueryConfig {
        &self.config
    }

    /// Returns `None` when the text analyzes to no terms: the query matches nothing.
    pub fn build(&self, analyzer: &LatticeAnalyzer) -> Result<Option<PayloadScoreQuery>, LatticeError> {
        let tokens = analyzer.analyze(&self.text)?;
        let mut terms = Vec::with_capacity(tokens.len());
        for token in tokens {
            if token.term.is_empty() {
                return Err(LatticeError::invalid_query("null term while building query"));
            }
            if token.position_increment == 0 {
                return Err(LatticeError::invalid_query("graph queries are not supported"));
            }
            terms.push(token.term);
        }

        let matcher = match terms.len() {
            0 => return Ok(None),
            1 => SpanQuery::Term(TermSpans::new(terms.remove(0))),
            n => {
                let slop = match analyzer.format() {
                    LatticeFormat::Lattice => self.config.slop,
                    LatticeFormat::Audio => secs_to_slop(
                        self.config.slop_seconds,
                        analyzer.position_increment_secs(),
                        n,
                    ),
                };
                tracing::debug!(terms = n, slop, format = analyzer.format().as_str(), "built near query");
                SpanQuery::Near(NearSpans::new(terms, slop, self.config.in_order))
            }
        };

        let query = PayloadScoreQuery::new(
            matcher,
            self.config.score_function()?,
            self.config.decoder()?,
            self.config.include_span_score,
        )
        .with_boost(self.config.boost);
        Ok(Some(query))
    }

    pub fn search(&self, index: &LatticeIndex, k: usize) -> Result<Vec<ScoredDoc>, LatticeError> {
        Ok(match self.build(index.analyzer())? {
            Some(query) => query.search(index, k),
            None => Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LatticeFilterConfig;
    use crate::pipeline::builder::LatticeAnalyzerBuilder;

    fn analyzer(json: &str) -> LatticeAnalyzer {
        LatticeAnalyzerBuilder::new(LatticeFilterConfig::from_json_str(json).unwrap())
            .build()
            .unwrap()
    }

    fn query(text: &str) -> MatchLatticeQuery {
        MatchLatticeQuery::new(text, LatticeQueryConfig::default()).unwrap()
    }

    #[test]
    fn secs_to_slop_discounts_matched_terms() {
        assert_eq!(secs_to_slop(3.0, 0.5, 2), 5);
        assert_eq!(secs_to_slop(3.0, 0.5, 3), 4);
        assert_eq!(secs_to_slop(3.0, 0.5, 10), 0);
        assert_eq!(secs_to_slop(0.0, 0.5, 2), 0);
    }

    #[test]
    fn term_count_selects_query_shape() {
        let a = analyzer("{}");
        assert!(query("   ").build(&a).unwrap().is_none());
        let single = query("fox").build(&a).unwrap().unwrap();
        assert_eq!(single.matcher(), &SpanQuery::Term(TermSpans::new("fox")));
        let multi = query("quick brown").build(&a).unwrap().unwrap();
        assert_eq!(
            multi.matcher(),
            &SpanQuery::Near(NearSpans::new(vec!["quick".into(), "brown".into()], 0, true))
        );
    }

    #[test]
    fn audio_field_uses_time_slop() {
        let a = analyzer(r#"{"lattice_format": "audio", "audio_position_increment_seconds": 0.5}"#);
        let built = query("a b c").build(&a).unwrap().unwrap();
        let SpanQuery::Near(near) = built.matcher() else {
            panic!("expected near query");
        };
        assert_eq!(near.slop(), 4);
    }

    #[test]
    fn lattice_field_uses_position_slop() {
        let config = LatticeQueryConfig {
            slop: 2,
            in_order: false,
            ..LatticeQueryConfig::default()
        };
        let built = MatchLatticeQuery::new("a b", config)
            .unwrap()
            .build(&analyzer("{}"))
            .unwrap()
            .unwrap();
        let SpanQuery::Near(near) = built.matcher() else {
            panic!("expected near query");
        };
        assert_eq!(near.slop(), 2);
        assert!(!near.in_order());
    }

    #[test]
    fn stacked_query_terms_are_rejected() {
        let a = analyzer(r#"{"score_buckets": [0.5, 2]}"#);
        let err = query("fox|0|0|0.9").build(&a).unwrap_err();
        assert!(matches!(err, LatticeError::InvalidQuery { .. }));
    }

    #[test]
    fn invalid_config_rejected_up_front() {
        let config = LatticeQueryConfig {
            payload_function: "avg".into(),
            ..LatticeQueryConfig::default()
        };
        assert!(matches!(
            MatchLatticeQuery::new("a", config),
            Err(LatticeError::InvalidConfig { .. })
        ));
    }
}
