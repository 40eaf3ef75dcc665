// src/condition/mod.rs

//! Restricted boolean expression language for job run conditions.
//!
//! Expressions combine job-completion identifiers with `and`, `or`, `not`,
//! parentheses and the literals `true` / `false`. Nothing else is accepted:
//! no comparisons, no arithmetic, no function calls. Evaluation happens
//! against an explicit identifier-to-bool context and an identifier missing
//! from that context is an error, never an implicit false.

mod parser;

use std::collections::HashMap;

use thiserror::Error;

pub use parser::{parse, Expr};

#[derive(Debug, Error)]
pub enum ConditionError {
    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),

    #[error("unterminated quoted identifier starting at position {0}")]
    UnterminatedQuote(usize),

    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("undefined reference '{0}'")]
    UndefinedReference(String),

    #[error("empty expression")]
    Empty,
}

/// Parse and evaluate `expression` against `context`.
pub fn evaluate(
    expression: &str,
    context: &HashMap<String, bool>,
) -> Result<bool, ConditionError> {
    parse(expression)?.eval(context)
}
