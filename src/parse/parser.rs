use tracing::debug;

use super::error::ParseError;
use super::tokenizer::{split_loop_header, Spanned, Token, Tokenizer};
use crate::types::{
    Action, Condition, LoopHeader, Operator, Rule, ScalarCondition, ScalarRule, VectorCondition,
    VectorRule,
};

const LOOP_HEADER: &str = "index=start:end";
const END_OF_INPUT: &str = "end of input";

/// Deepest expression tree a body may reduce to. A chain of one tier nests
/// one level per operator, and every pass over the tree recurses per level.
pub const MAX_EXPRESSION_DEPTH: usize = 512;

/// Deepest nesting of `FOR:` loops inside one condition.
pub const MAX_LOOP_DEPTH: usize = 32;

/// One-shot rule parser.
///
/// Owns the token cursor and the operand/operator stacks used to reduce an
/// expression body. Build one per rule text and consume it with
/// [`parse_rule`](Self::parse_rule).
#[derive(Debug)]
pub struct Parser<'a> {
    tokens: Tokenizer<'a>,
    operators: Vec<Operator>,
    /// Reduced operands with the depth of each subtree.
    operands: Vec<(ScalarCondition, usize)>,
    loop_depth: usize,
}

impl<'a> Parser<'a> {
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self {
            tokens: Tokenizer::new(input),
            operators: Vec::new(),
            operands: Vec::new(),
            loop_depth: 0,
        }
    }

    /// Parse the whole input as one rule.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MalformedRule`] when the input does not start
    /// with `IF:` or `FOR:`, is empty, or has text after the rule, and
    /// [`ParseError::Syntax`] when a required token is missing.
    pub fn parse_rule(mut self) -> Result<Rule, ParseError> {
        let first = self
            .tokens
            .peek()
            .ok_or(ParseError::malformed("empty rule"))?;
        let rule = match first.token {
            Token::If => Rule::Scalar(self.scalar_rule()?),
            Token::For => Rule::Vector(self.vector_rule()?),
            _ => return Err(ParseError::malformed("rule must start with IF: or FOR:")),
        };
        if self.tokens.next().is_some() {
            return Err(ParseError::malformed("unexpected text after rule"));
        }
        debug!(vector = rule.is_vector(), "parsed rule");
        Ok(rule)
    }

    // -- Rules ---------------------------------------------------------------

    /// `IF: condition [THEN: { }]`
    fn scalar_rule(&mut self) -> Result<ScalarRule, ParseError> {
        self.expect(Token::If)?;
        let condition = self.condition()?;
        let action = self.action()?;
        Ok(ScalarRule { condition, action })
    }

    /// `FOR: name=start:end scalar_rule`
    fn vector_rule(&mut self) -> Result<VectorRule, ParseError> {
        self.expect(Token::For)?;
        let header = self.loop_header()?;
        let rule = self.scalar_rule()?;
        Ok(VectorRule { header, rule })
    }

    fn action(&mut self) -> Result<Action, ParseError> {
        if matches!(self.tokens.peek(), Some(Spanned { token: Token::Then, .. })) {
            self.tokens.next();
            self.expect(Token::OpenBrace)?;
            self.expect(Token::CloseBrace)?;
        }
        Ok(Action)
    }

    // -- Conditions ----------------------------------------------------------

    fn condition(&mut self) -> Result<Condition, ParseError> {
        let start = self.tokens.offset();
        self.expect(Token::OpenBrace)?;
        let next = self
            .tokens
            .next()
            .ok_or(ParseError::malformed("unexpected end of input in condition"))?;
        self.tokens.rewind(start);
        if next.token == Token::For {
            Ok(Condition::Vector(self.vector_condition()?))
        } else {
            Ok(Condition::Scalar(self.scalar_condition()?))
        }
    }

    /// `{ FOR: name=start:end condition }`
    fn vector_condition(&mut self) -> Result<VectorCondition, ParseError> {
        self.expect(Token::OpenBrace)?;
        self.expect(Token::For)?;
        let header = self.loop_header()?;
        if self.loop_depth == MAX_LOOP_DEPTH {
            return Err(ParseError::malformed("loops nest too deeply"));
        }
        self.loop_depth += 1;
        let condition = self.condition();
        self.loop_depth -= 1;
        let condition = condition?;
        self.expect(Token::CloseBrace)?;
        Ok(VectorCondition {
            header,
            condition: Box::new(condition),
        })
    }

    /// `{ term (operator term)* }`, reduced with the operand/operator stacks.
    ///
    /// An incoming operator reduces the stack top once when it has strictly
    /// greater precedence, otherwise it is pushed and reduction is deferred
    /// until the body ends. With only two tiers this makes comparisons bind
    /// tighter than `&&`/`||` and nests same-tier chains to the right.
    fn scalar_condition(&mut self) -> Result<ScalarCondition, ParseError> {
        self.expect(Token::OpenBrace)?;
        loop {
            let Some(next) = self.tokens.next() else {
                return Err(ParseError::malformed("unterminated condition"));
            };
            match next.token {
                Token::CloseBrace => break,
                Token::Word(word) => match Operator::from_token(word) {
                    Some(operator) => self.push_operator(operator)?,
                    None => self.operands.push((ScalarCondition::leaf(word), 1)),
                },
                other => {
                    return Err(ParseError::syntax(
                        Token::CloseBrace.as_str(),
                        other.as_str(),
                        next.offset,
                    ))
                }
            }
        }

        while !self.operators.is_empty() {
            self.reduce()?;
        }
        let (root, _) = self
            .operands
            .pop()
            .ok_or(ParseError::malformed("empty condition"))?;
        if !self.operands.is_empty() {
            self.operands.clear();
            return Err(ParseError::malformed("operands left over after reduction"));
        }
        Ok(root)
    }

    fn push_operator(&mut self, operator: Operator) -> Result<(), ParseError> {
        if let Some(&top) = self.operators.last() {
            if precedence(operator)? > precedence(top)? {
                self.reduce()?;
            }
        }
        self.operators.push(operator);
        Ok(())
    }

    /// Pop the top operator and the top two operands and push the combined
    /// node. The operand popped second is the left-hand side.
    fn reduce(&mut self) -> Result<(), ParseError> {
        let operator = self
            .operators
            .pop()
            .ok_or(ParseError::malformed("no operator to reduce"))?;
        let rhs = self.operands.pop();
        let lhs = self.operands.pop();
        match (lhs, rhs) {
            (Some((lhs, lhs_depth)), Some((rhs, rhs_depth))) => {
                let depth = 1 + lhs_depth.max(rhs_depth);
                if depth > MAX_EXPRESSION_DEPTH {
                    self.operands.clear();
                    self.operators.clear();
                    return Err(ParseError::malformed("expression nests too deeply"));
                }
                self.operands
                    .push((ScalarCondition::binary(operator, lhs, rhs), depth));
                Ok(())
            }
            _ => Err(ParseError::malformed("operator is missing an operand")),
        }
    }

    // -- Tokens --------------------------------------------------------------

    fn loop_header(&mut self) -> Result<LoopHeader, ParseError> {
        match self.tokens.next() {
            Some(Spanned {
                token: Token::Word(word),
                offset,
            }) => split_loop_header(word).ok_or_else(|| ParseError::syntax(LOOP_HEADER, word, offset)),
            Some(other) => Err(ParseError::syntax(
                LOOP_HEADER,
                other.token.as_str(),
                other.offset,
            )),
            None => Err(ParseError::syntax(
                LOOP_HEADER,
                END_OF_INPUT,
                self.tokens.end(),
            )),
        }
    }

    /// Consume the next token, which must be `expected`.
    fn expect(&mut self, expected: Token<'static>) -> Result<(), ParseError> {
        match self.tokens.next() {
            Some(next) if next.token == expected => Ok(()),
            Some(next) => Err(ParseError::syntax(
                expected.as_str(),
                next.token.as_str(),
                next.offset,
            )),
            None => Err(ParseError::syntax(
                expected.as_str(),
                END_OF_INPUT,
                self.tokens.end(),
            )),
        }
    }
}

fn precedence(operator: Operator) -> Result<u16, ParseError> {
    operator
        .precedence()
        .ok_or(ParseError::malformed("NIL is not an operator"))
}
