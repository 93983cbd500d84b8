pub mod config;
pub mod encoding;
pub mod error;
pub mod index;
pub mod pipeline;
pub mod scoring;
pub mod types;

pub use config::{LatticeFilterConfig, LatticeQueryConfig};
pub use encoding::filter::{LatticeTokenFilter, LatticeTokenFilterFactory};
pub use encoding::payload::FloatDecoder;
pub use error::LatticeError;
pub use index::LatticeIndex;
pub use pipeline::builder::LatticeAnalyzerBuilder;
pub use pipeline::runtime::LatticeAnalyzer;
pub use pipeline::traits::{ScoreFunction, SpanMatcher, TokenStream, TokenTransform, Tokenizer};
pub use scoring::explanation::Explanation;
pub use scoring::function::{Combinator, PayloadScoreFunction};
pub use scoring::match_query::MatchLatticeQuery;
pub use scoring::query::PayloadScoreQuery;
pub use types::{DocId, LatticeFormat, ScoredDoc, Token};
