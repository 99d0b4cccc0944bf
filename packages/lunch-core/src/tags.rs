//! Boolean tag-selection expressions.
//!
//! Grammar: whitespace-separated tag tokens are implicitly ANDed;
//! `AND`/`OR`/`NOT` (case-insensitive) and parentheses override the
//! default precedence of `NOT > AND > OR`. Bare tokens match by exact,
//! case-sensitive membership in an entity's tag set. Tokens outside the
//! known-tag universe never match but never fail evaluation either.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::debug;

use crate::entity::Entity;

/// Errors raised while parsing a tag expression.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TagExprError {
    /// Closing parenthesis without a matching opener, or vice versa
    #[error("unbalanced parenthesis in expression")]
    UnbalancedParen,

    /// Operator with a missing operand, e.g. `a AND`
    #[error("dangling operator `{0}`")]
    DanglingOperator(String),

    /// Input left over after a complete expression, e.g. `a ) b`
    #[error("unexpected token `{0}`")]
    UnexpectedToken(String),

    /// Nothing to evaluate
    #[error("empty expression")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    LParen,
    RParen,
    And,
    Or,
    Not,
    Tag(String),
}

fn lex(expression: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();

    let flush = |word: &mut String, tokens: &mut Vec<Token>| {
        if word.is_empty() {
            return;
        }
        let token = match word.to_ascii_lowercase().as_str() {
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            _ => Token::Tag(std::mem::take(word)),
        };
        word.clear();
        tokens.push(token);
    };

    for ch in expression.chars() {
        match ch {
            '(' => {
                flush(&mut word, &mut tokens);
                tokens.push(Token::LParen);
            }
            ')' => {
                flush(&mut word, &mut tokens);
                tokens.push(Token::RParen);
            }
            c if c.is_whitespace() => flush(&mut word, &mut tokens),
            c => word.push(c),
        }
    }
    flush(&mut word, &mut tokens);
    tokens
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagExpr {
    Tag(String),
    Not(Box<TagExpr>),
    And(Box<TagExpr>, Box<TagExpr>),
    Or(Box<TagExpr>, Box<TagExpr>),
}

impl TagExpr {
    /// Parse an expression string into a tree.
    pub fn parse(expression: &str) -> Result<Self, TagExprError> {
        let tokens = lex(expression);
        if tokens.is_empty() {
            return Err(TagExprError::Empty);
        }
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        match parser.peek() {
            None => Ok(expr),
            Some(Token::RParen) => Err(TagExprError::UnbalancedParen),
            Some(token) => Err(TagExprError::UnexpectedToken(render(token))),
        }
    }

    /// Evaluate against a candidate tag set.
    pub fn matches(&self, tags: &BTreeSet<String>) -> bool {
        match self {
            TagExpr::Tag(tag) => tags.contains(tag),
            TagExpr::Not(inner) => !inner.matches(tags),
            TagExpr::And(lhs, rhs) => lhs.matches(tags) && rhs.matches(tags),
            TagExpr::Or(lhs, rhs) => lhs.matches(tags) || rhs.matches(tags),
        }
    }

    fn collect_tags<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TagExpr::Tag(tag) => out.push(tag),
            TagExpr::Not(inner) => inner.collect_tags(out),
            TagExpr::And(lhs, rhs) | TagExpr::Or(lhs, rhs) => {
                lhs.collect_tags(out);
                rhs.collect_tags(out);
            }
        }
    }
}

fn render(token: &Token) -> String {
    match token {
        Token::LParen => "(".to_string(),
        Token::RParen => ")".to_string(),
        Token::And => "AND".to_string(),
        Token::Or => "OR".to_string(),
        Token::Not => "NOT".to_string(),
        Token::Tag(tag) => tag.clone(),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_or(&mut self) -> Result<TagExpr, TagExprError> {
        let mut expr = self.parse_and()?;
        while matches!(self.peek(), Some(Token::Or)) {
            self.advance();
            let rhs = self.parse_and()?;
            expr = TagExpr::Or(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<TagExpr, TagExprError> {
        let mut expr = self.parse_unary()?;
        loop {
            match self.peek() {
                Some(Token::And) => {
                    self.advance();
                    let rhs = self.parse_unary()?;
                    expr = TagExpr::And(Box::new(expr), Box::new(rhs));
                }
                // Adjacent operands are implicitly ANDed.
                Some(Token::Tag(_)) | Some(Token::Not) | Some(Token::LParen) => {
                    let rhs = self.parse_unary()?;
                    expr = TagExpr::And(Box::new(expr), Box::new(rhs));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<TagExpr, TagExprError> {
        match self.advance() {
            Some(Token::Not) => {
                let inner = self.parse_unary()?;
                Ok(TagExpr::Not(Box::new(inner)))
            }
            Some(Token::LParen) => {
                let expr = self.parse_or()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(expr),
                    _ => Err(TagExprError::UnbalancedParen),
                }
            }
            Some(Token::Tag(tag)) => Ok(TagExpr::Tag(tag)),
            Some(token) => Err(TagExprError::DanglingOperator(render(&token))),
            None => Err(TagExprError::DanglingOperator("<end>".to_string())),
        }
    }
}

/// Evaluates tag expressions against entity tag sets.
///
/// Constructed with the full known-tag universe so that unknown tokens
/// can be reported without ever failing an evaluation.
#[derive(Debug, Clone)]
pub struct TagEvaluator {
    known: BTreeSet<String>,
}

impl TagEvaluator {
    /// Create an evaluator over the given known-tag universe.
    pub fn new<I, S>(known: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: known.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the expression matches the candidate tag set.
    ///
    /// An empty expression matches nothing.
    pub fn evaluate(
        &self,
        expression: &str,
        candidate: &BTreeSet<String>,
    ) -> Result<bool, TagExprError> {
        let expr = match TagExpr::parse(expression) {
            Ok(expr) => expr,
            Err(TagExprError::Empty) => return Ok(false),
            Err(err) => return Err(err),
        };
        self.note_unknown(&expr);
        Ok(expr.matches(candidate))
    }

    /// Filter a universe of entities by the expression, preserving the
    /// iteration order of the input.
    pub fn select_matching<'a, I>(
        &self,
        expression: &str,
        universe: I,
    ) -> Result<Vec<&'a Entity>, TagExprError>
    where
        I: IntoIterator<Item = &'a Entity>,
    {
        let expr = match TagExpr::parse(expression) {
            Ok(expr) => expr,
            Err(TagExprError::Empty) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        self.note_unknown(&expr);
        Ok(universe
            .into_iter()
            .filter(|entity| expr.matches(&entity.tags))
            .collect())
    }

    fn note_unknown(&self, expr: &TagExpr) {
        let mut referenced = Vec::new();
        expr.collect_tags(&mut referenced);
        for tag in referenced {
            if !self.known.contains(tag) {
                debug!(tag = %tag, "tag not in known universe, will never match");
            }
        }
    }
}
