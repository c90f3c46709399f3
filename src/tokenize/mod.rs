//! Tokenizer collaborator: expanded text to token lists.

mod lexer;
mod simplify;

pub use lexer::CTokenizer;
pub use simplify::integer_value;

use crate::core::TokenList;
use crate::errors::TokenizeError;
use std::path::Path;

pub trait Tokenizer: Send + Sync {
    /// Normal token list of one expanded configuration.
    fn tokenize(
        &self,
        path: &Path,
        expanded: &str,
        configuration: &str,
    ) -> Result<TokenList, TokenizeError>;

    /// Simplified variant of a normal token list.
    fn simplify(&self, tokens: &TokenList) -> Result<TokenList, TokenizeError>;
}
