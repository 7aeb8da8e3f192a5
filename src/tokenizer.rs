//! Lexical analysis: turns the raw source text into a vector of tokens.
//!
//! The scan is a single left-to-right pass with one character of lookahead.
//! Two-character operators are matched before single-character ones, and the
//! output always ends with exactly one `Eof` token carrying the last line.

use std::fmt;

use snafu::OptionExt;

use crate::error::{
  BangWithoutEqualsSnafu, CompileResult, IllegalCharacterSnafu, InvalidNumberSnafu,
};

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
  // Keywords.
  Int,
  If,
  Else,
  While,
  Print,

  Identifier,
  Number,

  // Operators.
  Plus,
  Minus,
  Multiply,
  Divide,
  Mod,
  Assign,
  Equal,
  NotEqual,
  Less,
  LessEqual,
  Greater,
  GreaterEqual,

  // Punctuation.
  Semicolon,
  LParen,
  RParen,
  LBrace,
  RBrace,

  Eof,
}

impl TokenKind {
  pub fn name(self) -> &'static str {
    match self {
      Self::Int => "INT",
      Self::If => "IF",
      Self::Else => "ELSE",
      Self::While => "WHILE",
      Self::Print => "PRINT",
      Self::Identifier => "IDENTIFIER",
      Self::Number => "NUMBER",
      Self::Plus => "PLUS",
      Self::Minus => "MINUS",
      Self::Multiply => "MULTIPLY",
      Self::Divide => "DIVIDE",
      Self::Mod => "MOD",
      Self::Assign => "ASSIGN",
      Self::Equal => "EQUAL",
      Self::NotEqual => "NOT_EQUAL",
      Self::Less => "LESS",
      Self::LessEqual => "LESS_EQUAL",
      Self::Greater => "GREATER",
      Self::GreaterEqual => "GREATER_EQUAL",
      Self::Semicolon => "SEMICOLON",
      Self::LParen => "LPAREN",
      Self::RParen => "RPAREN",
      Self::LBrace => "LBRACE",
      Self::RBrace => "RBRACE",
      Self::Eof => "EOF",
    }
  }
}

impl fmt::Display for TokenKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Payload carried by identifier and number tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenValue {
  Int(i64),
  Text(String),
}

impl fmt::Display for TokenValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Int(value) => write!(f, "{value}"),
      Self::Text(text) => f.write_str(text),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub value: Option<TokenValue>,
  pub line: usize,
}

impl Token {
  pub fn new(kind: TokenKind, value: Option<TokenValue>, line: usize) -> Self {
    Self { kind, value, line }
  }

  fn bare(kind: TokenKind, line: usize) -> Self {
    Self::new(kind, None, line)
  }

  /// Text of an identifier token.
  pub fn text(&self) -> Option<&str> {
    match &self.value {
      Some(TokenValue::Text(text)) => Some(text),
      _ => None,
    }
  }

  /// Value of a number token.
  pub fn int(&self) -> Option<i64> {
    match self.value {
      Some(TokenValue::Int(value)) => Some(value),
      _ => None,
    }
  }
}

/// Renders as `KIND` or `KIND(value)`.
impl fmt::Display for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.value {
      Some(value) => write!(f, "{}({value})", self.kind),
      None => write!(f, "{}", self.kind),
    }
  }
}

fn keyword(text: &str) -> Option<TokenKind> {
  match text {
    "int" => Some(TokenKind::Int),
    "if" => Some(TokenKind::If),
    "else" => Some(TokenKind::Else),
    "while" => Some(TokenKind::While),
    "print" => Some(TokenKind::Print),
    _ => None,
  }
}

const TWO_CHAR_OPS: [(&str, TokenKind); 4] = [
  ("==", TokenKind::Equal),
  ("!=", TokenKind::NotEqual),
  ("<=", TokenKind::LessEqual),
  (">=", TokenKind::GreaterEqual),
];

fn single_char(c: u8) -> Option<TokenKind> {
  let kind = match c {
    b'+' => TokenKind::Plus,
    b'-' => TokenKind::Minus,
    b'*' => TokenKind::Multiply,
    b'/' => TokenKind::Divide,
    b'%' => TokenKind::Mod,
    b'=' => TokenKind::Assign,
    b'<' => TokenKind::Less,
    b'>' => TokenKind::Greater,
    b';' => TokenKind::Semicolon,
    b'(' => TokenKind::LParen,
    b')' => TokenKind::RParen,
    b'{' => TokenKind::LBrace,
    b'}' => TokenKind::RBrace,
    _ => return None,
  };
  Some(kind)
}

/// Lex the input into a flat vector of tokens terminated by an `Eof` marker.
pub fn tokenize(input: &str) -> CompileResult<Vec<Token>> {
  let mut tokens = Vec::new();
  let bytes = input.as_bytes();
  let mut line = 1;
  let mut i = 0;

  while i < bytes.len() {
    let c = bytes[i];
    if c == b'\n' {
      line += 1;
      i += 1;
      continue;
    }

    if c.is_ascii_whitespace() {
      i += 1;
      continue;
    }

    if c == b'/' && bytes.get(i + 1) == Some(&b'/') {
      // Leave the newline in place so it still bumps the line counter.
      while i < bytes.len() && bytes[i] != b'\n' {
        i += 1;
      }
      continue;
    }

    if c.is_ascii_digit() {
      let start = i;
      while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
      }
      let text = &input[start..i];
      let value = text
        .parse::<i64>()
        .ok()
        .context(InvalidNumberSnafu { text, line })?;
      tokens.push(Token::new(TokenKind::Number, Some(TokenValue::Int(value)), line));
      continue;
    }

    if c.is_ascii_alphabetic() || c == b'_' {
      let start = i;
      while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
      }
      let text = &input[start..i];
      let token = match keyword(text) {
        Some(kind) => Token::bare(kind, line),
        None => Token::new(
          TokenKind::Identifier,
          Some(TokenValue::Text(text.to_string())),
          line,
        ),
      };
      tokens.push(token);
      continue;
    }

    if let Some((op, kind)) = TWO_CHAR_OPS
      .into_iter()
      .find(|(op, _)| input[i..].starts_with(op))
    {
      tokens.push(Token::bare(kind, line));
      i += op.len();
      continue;
    }

    if let Some(kind) = single_char(c) {
      tokens.push(Token::bare(kind, line));
      i += 1;
      continue;
    }

    // `!=` was tried above; there is no unary `!`.
    if c == b'!' {
      return BangWithoutEqualsSnafu { line }.fail();
    }

    // Only ASCII has been consumed so far, so `i` sits on a char boundary.
    let ch = input[i..].chars().next().unwrap_or('\0');
    return IllegalCharacterSnafu { ch, line }.fail();
  }

  tokens.push(Token::bare(TokenKind::Eof, line));
  Ok(tokens)
}
