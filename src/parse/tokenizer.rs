use std::fmt;

use winnow::ascii::multispace0;
use winnow::combinator::alt;
use winnow::prelude::*;
use winnow::token::{one_of, rest, take_till};

use crate::types::LoopHeader;

/// A lexical token of rule text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// `IF:`
    If,
    /// `THEN:`
    Then,
    /// `FOR:`
    For,
    /// `(`
    OpenParen,
    /// `)`
    CloseParen,
    /// `{`
    OpenBrace,
    /// `}`
    CloseBrace,
    /// `:`
    Colon,
    /// Any other run of non-blank text: literals, field paths, operators,
    /// loop headers.
    Word(&'a str),
}

impl<'a> Token<'a> {
    fn classify(text: &'a str) -> Self {
        match text {
            "IF:" => Token::If,
            "THEN:" => Token::Then,
            "FOR:" => Token::For,
            "(" => Token::OpenParen,
            ")" => Token::CloseParen,
            "{" => Token::OpenBrace,
            "}" => Token::CloseBrace,
            ":" => Token::Colon,
            word => Token::Word(word),
        }
    }

    /// The token's source text.
    #[must_use]
    pub fn as_str(&self) -> &'a str {
        match *self {
            Token::If => "IF:",
            Token::Then => "THEN:",
            Token::For => "FOR:",
            Token::OpenParen => "(",
            Token::CloseParen => ")",
            Token::OpenBrace => "{",
            Token::CloseBrace => "}",
            Token::Colon => ":",
            Token::Word(word) => word,
        }
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A token and the byte offset it starts at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spanned<'a> {
    pub token: Token<'a>,
    pub offset: usize,
}

/// Splits rule text into tokens.
///
/// Tokens are separated by whitespace; braces are tokens of their own even
/// when glued to a neighbour. `None` from [`next`](Iterator::next) signals
/// end of input, which is not an error by itself.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    input: &'a str,
    offset: usize,
}

impl<'a> Tokenizer<'a> {
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self { input, offset: 0 }
    }

    /// Byte offset of the next unread character.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Move back to an offset previously returned by [`offset`](Self::offset).
    /// An offset that is not a character boundary of the input is ignored.
    pub(crate) fn rewind(&mut self, offset: usize) {
        if self.input.is_char_boundary(offset) {
            self.offset = offset;
        }
    }

    /// Length of the whole input, the position reported for end of input.
    #[must_use]
    pub fn end(&self) -> usize {
        self.input.len()
    }

    /// Read the next token without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<Spanned<'a>> {
        self.clone().next()
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Spanned<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut remaining = &self.input[self.offset..];
        blank.parse_next(&mut remaining).ok()?;
        let offset = self.input.len() - remaining.len();
        let text = alt((brace, word)).parse_next(&mut remaining).ok()?;
        self.offset = self.input.len() - remaining.len();
        Some(Spanned {
            token: Token::classify(text),
            offset,
        })
    }
}

// -- Lexical pieces ---------------------------------------------------------

fn blank(input: &mut &str) -> ModalResult<()> {
    multispace0.void().parse_next(input)
}

fn brace<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    one_of(['{', '}']).take().parse_next(input)
}

fn word<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_till(1.., |c: char| c.is_whitespace() || c == '{' || c == '}').parse_next(input)
}

fn header_parts<'i>(input: &mut &'i str) -> ModalResult<(&'i str, &'i str, &'i str)> {
    (take_till(1.., '='), '=', take_till(1.., ':'), ':', rest)
        .map(|(name, _, start, _, end)| (name, start, end))
        .parse_next(input)
}

/// Split a loop header word `name=start:end`.
pub(crate) fn split_loop_header(text: &str) -> Option<LoopHeader> {
    let (name, start, end) = header_parts.parse(text).ok()?;
    if end.is_empty() {
        return None;
    }
    Some(LoopHeader {
        index_key: name.to_owned(),
        start_index: start.to_owned(),
        end_index: end.to_owned(),
    })
}
