use crate::error::LatticeError;
use crate::pipeline::traits::TokenStream;
use crate::types::Token;

/// Splits text on Unicode whitespace, one token per word, increment 1.
#[derive(Debug, Clone)]
pub struct WhitespaceTokenStream {
    words: Vec<String>,
    cursor: usize,
}

impl WhitespaceTokenStream {
    pub fn new(text: &str) -> Self {
        Self {
            words: text.split_whitespace().map(str::to_string).collect(),
            cursor: 0,
        }
    }
}

impl TokenStream for WhitespaceTokenStream {
    fn next_token(&mut self) -> Result<Option<Token>, LatticeError> {
        let Some(word) = self.words.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;
        Ok(Some(Token::new(word.as_str())))
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }
}
