mod error;
mod parser;
mod tokenizer;

pub use error::ParseError;
pub use parser::{Parser, MAX_EXPRESSION_DEPTH, MAX_LOOP_DEPTH};
pub use tokenizer::{Spanned, Token, Tokenizer};

use crate::Rule;

/// Parse rule text into a [`Rule`].
///
/// # Errors
///
/// Returns [`ParseError`] if the input is not a well-formed rule.
pub fn parse(input: &str) -> Result<Rule, ParseError> {
    Parser::new(input).parse_rule()
}
