//! Errors shared by every stage of the pipeline.
//!
//! Compilation is fail-fast: the first error raised by any stage aborts the
//! run, so a single enum is enough to carry every diagnostic. Each variant
//! belongs to exactly one [`ErrorKind`].

use snafu::Snafu;

use crate::tokenizer::TokenKind;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
  #[snafu(display("Lexical error: illegal character '{ch}' at line {line}"))]
  IllegalCharacter { ch: char, line: usize },

  #[snafu(display(
    "Lexical error: unexpected character '!' at line {line}, expected '=' after '!'"
  ))]
  BangWithoutEquals { line: usize },

  #[snafu(display("Lexical error: number literal {text} is out of range at line {line}"))]
  InvalidNumber { text: String, line: usize },

  #[snafu(display(
    "Syntax error: unexpected token {found} at line {line}, expected {expected}"
  ))]
  UnexpectedToken {
    found: String,
    expected: TokenKind,
    line: usize,
  },

  #[snafu(display("Syntax error: invalid {construct} at token {found} (line {line})"))]
  InvalidConstruct {
    construct: &'static str,
    found: String,
    line: usize,
  },

  #[snafu(display(
    "Syntax error: nesting deeper than {limit} levels at token {found} (line {line})"
  ))]
  NestingTooDeep {
    limit: usize,
    found: String,
    line: usize,
  },

  #[snafu(display("Semantic error: variable '{name}' already declared"))]
  Redeclared { name: String },

  #[snafu(display("Semantic error: variable '{name}' not declared"))]
  Undeclared { name: String },
}

/// The pipeline stage an error originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Lexical,
  Syntax,
  Semantic,
}

impl CompileError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::IllegalCharacter { .. }
      | Self::BangWithoutEquals { .. }
      | Self::InvalidNumber { .. } => ErrorKind::Lexical,
      Self::UnexpectedToken { .. }
      | Self::InvalidConstruct { .. }
      | Self::NestingTooDeep { .. } => ErrorKind::Syntax,
      Self::Redeclared { .. } | Self::Undeclared { .. } => ErrorKind::Semantic,
    }
  }

  /// Source line the error points at. Semantic errors carry no position
  /// because the AST does not keep one.
  pub fn line(&self) -> Option<usize> {
    match self {
      Self::IllegalCharacter { line, .. }
      | Self::BangWithoutEquals { line }
      | Self::InvalidNumber { line, .. }
      | Self::UnexpectedToken { line, .. }
      | Self::InvalidConstruct { line, .. }
      | Self::NestingTooDeep { line, .. } => Some(*line),
      Self::Redeclared { .. } | Self::Undeclared { .. } => None,
    }
  }
}
