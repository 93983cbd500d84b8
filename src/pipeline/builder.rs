use crate::config::LatticeFilterConfig;
use crate::encoding::filter::LatticeTokenFilterFactory;
use crate::error::LatticeError;
use crate::pipeline::defaults::WhitespaceTokenizer;
use crate::pipeline::runtime::{LatticeAnalyzer, LatticeAnalyzerParts};
use crate::pipeline::traits::{TokenTransform, Tokenizer};

pub struct LatticeAnalyzerBuilder {
    config: LatticeFilterConfig,
    tokenizer: Option<Box<dyn Tokenizer>>,
    extra_filters: Vec<Box<dyn TokenTransform>>,
}

impl LatticeAnalyzerBuilder {
    pub fn new(config: LatticeFilterConfig) -> Self {
        Self {
            config,
            tokenizer: None,
            extra_filters: Vec::new(),
        }
    }

    pub fn with_tokenizer(mut self, tokenizer: Box<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    /// Appends a stage that runs after the lattice filter.
    pub fn with_filter(mut self, filter: Box<dyn TokenTransform>) -> Self {
        self.extra_filters.push(filter);
        self
    }

    pub fn build(self) -> Result<LatticeAnalyzer, LatticeError> {
        let lattice = LatticeTokenFilterFactory::from_config(&self.config)?;
        let format = self.config.format()?;

        let mut filters: Vec<Box<dyn TokenTransform>> = vec![Box::new(lattice)];
        filters.extend(self.extra_filters);

        tracing::debug!(
            format = format.as_str(),
            delimiter = %self.config.delimiter,
            stages = filters.len(),
            "built lattice analyzer"
        );

        Ok(LatticeAnalyzer::from_parts(LatticeAnalyzerParts {
            tokenizer: self
                .tokenizer
                .unwrap_or_else(|| Box::new(WhitespaceTokenizer)),
            filters,
            format,
            position_increment_secs: self.config.audio_position_increment_seconds,
        }))
    }
}
