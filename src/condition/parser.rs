// src/condition/parser.rs

//! Lexer, recursive-descent parser and evaluator for condition expressions.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! expr    := or
//! or      := and ( "or" and )*
//! and     := unary ( "and" unary )*
//! unary   := "not" unary | primary
//! primary := "true" | "false" | IDENT | "(" expr ")"
//! ```
//!
//! Keywords are matched case-insensitively. Identifiers are bare
//! `[A-Za-z_][A-Za-z0-9_]*` words or single/double-quoted strings.

use std::collections::HashMap;

use super::ConditionError;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Literal(bool),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(bool),
    Reference(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn eval(&self, context: &HashMap<String, bool>) -> Result<bool, ConditionError> {
        match self {
            Expr::Literal(value) => Ok(*value),
            Expr::Reference(name) => context
                .get(name)
                .copied()
                .ok_or_else(|| ConditionError::UndefinedReference(name.clone())),
            Expr::Not(inner) => Ok(!inner.eval(context)?),
            Expr::And(left, right) => Ok(left.eval(context)? && right.eval(context)?),
            Expr::Or(left, right) => Ok(left.eval(context)? || right.eval(context)?),
        }
    }

    /// Bare identifiers referenced anywhere in the expression.
    pub fn references(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references<'a>(&'a self, refs: &mut Vec<&'a str>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Reference(name) => refs.push(name),
            Expr::Not(inner) => inner.collect_references(refs),
            Expr::And(left, right) | Expr::Or(left, right) => {
                left.collect_references(refs);
                right.collect_references(refs);
            }
        }
    }
}

fn lex(input: &str) -> Result<Vec<Token>, ConditionError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '\'' | '"' => {
                let quote = c;
                let start = i;
                i += 1;
                let mut name = String::new();
                loop {
                    match chars.get(i) {
                        Some(&ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(&ch) => {
                            name.push(ch);
                            i += 1;
                        }
                        None => return Err(ConditionError::UnterminatedQuote(start)),
                    }
                }
                tokens.push(Token::Ident(name));
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.to_ascii_lowercase().as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "true" => Token::Literal(true),
                    "false" => Token::Literal(false),
                    _ => Token::Ident(word),
                });
            }
            _ => return Err(ConditionError::UnexpectedChar(c, i)),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expr(&mut self) -> Result<Expr, ConditionError> {
        let mut left = self.and_expr()?;
        while self.eat(&Token::Or) {
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ConditionError> {
        let mut left = self.unary()?;
        while self.eat(&Token::And) {
            let right = self.unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ConditionError> {
        if self.eat(&Token::Not) {
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ConditionError> {
        match self.next() {
            Some(Token::Literal(value)) => Ok(Expr::Literal(value)),
            Some(Token::Ident(name)) => Ok(Expr::Reference(name)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                if self.eat(&Token::RParen) {
                    Ok(inner)
                } else {
                    Err(ConditionError::UnexpectedEnd)
                }
            }
            Some(token) => Err(ConditionError::UnexpectedToken(format!("{token:?}"))),
            None => Err(ConditionError::UnexpectedEnd),
        }
    }
}

/// Parse an expression into its AST.
pub fn parse(input: &str) -> Result<Expr, ConditionError> {
    let tokens = lex(input)?;
    if tokens.is_empty() {
        return Err(ConditionError::Empty);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expr()?;
    match parser.next() {
        None => Ok(expr),
        Some(token) => Err(ConditionError::UnexpectedToken(format!("{token:?}"))),
    }
}
