use crate::encoding::whitespace::WhitespaceTokenStream;
use crate::pipeline::traits::{TokenStream, Tokenizer};

pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn token_stream(&self, text: &str) -> Box<dyn TokenStream> {
        Box::new(WhitespaceTokenStream::new(text))
    }
}
