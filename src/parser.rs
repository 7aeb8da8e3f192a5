//! Recursive-descent parser producing the program AST.
//!
//! Declarations come first, then statements. Expressions use one helper per
//! precedence level, lowest first, and every binary level is left-associative:
//! `equality -> relational -> additive -> term -> factor`.

use std::fmt;

use tracing::debug;

use crate::error::{
  CompileError, CompileResult, InvalidConstructSnafu, NestingTooDeepSnafu, UnexpectedTokenSnafu,
};
use crate::tokenizer::{Token, TokenKind};

/// Deepest allowed nesting of parenthesised expressions and blocks combined.
pub const MAX_NESTING: usize = 256;

/// Binary operators recognised by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Mod,
  Eq,
  Ne,
  Lt,
  Le,
  Gt,
  Ge,
}

impl BinaryOp {
  /// Source spelling of the operator, also used in the emitted TAC.
  pub fn symbol(self) -> &'static str {
    match self {
      Self::Add => "+",
      Self::Sub => "-",
      Self::Mul => "*",
      Self::Div => "/",
      Self::Mod => "%",
      Self::Eq => "==",
      Self::Ne => "!=",
      Self::Lt => "<",
      Self::Le => "<=",
      Self::Gt => ">",
      Self::Ge => ">=",
    }
  }

  fn from_token(kind: TokenKind) -> Option<Self> {
    let op = match kind {
      TokenKind::Plus => Self::Add,
      TokenKind::Minus => Self::Sub,
      TokenKind::Multiply => Self::Mul,
      TokenKind::Divide => Self::Div,
      TokenKind::Mod => Self::Mod,
      TokenKind::Equal => Self::Eq,
      TokenKind::NotEqual => Self::Ne,
      TokenKind::Less => Self::Lt,
      TokenKind::LessEqual => Self::Le,
      TokenKind::Greater => Self::Gt,
      TokenKind::GreaterEqual => Self::Ge,
      _ => return None,
    };
    Some(op)
  }
}

impl fmt::Display for BinaryOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.symbol())
  }
}

/// Expression tree produced by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
  Number {
    value: i64,
  },
  Identifier {
    name: String,
  },
  Binary {
    op: BinaryOp,
    lhs: Box<Expr>,
    rhs: Box<Expr>,
  },
}

impl Expr {
  pub fn number(value: i64) -> Self {
    Self::Number { value }
  }

  pub fn ident(name: impl Into<String>) -> Self {
    Self::Identifier { name: name.into() }
  }

  pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
    Self::Binary {
      op,
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
  pub name: String,
  pub initializer: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
  pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
  Assign {
    name: String,
    expr: Expr,
  },
  Print {
    expr: Expr,
  },
  If {
    condition: Expr,
    then_block: Block,
    else_block: Option<Block>,
  },
  While {
    condition: Expr,
    body: Block,
  },
  Block(Block),
}

/// Root of the AST. Declarations always precede statements in the source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
  pub declarations: Vec<Declaration>,
  pub statements: Vec<Stmt>,
}

/// Parse a whole program from the token stream.
pub fn parse(tokens: Vec<Token>) -> CompileResult<Program> {
  let mut stream = TokenStream::new(tokens);

  let mut declarations = Vec::new();
  while stream.check(TokenKind::Int) {
    declarations.push(parse_declaration(&mut stream)?);
  }

  let mut statements = Vec::new();
  while !stream.is_eof() {
    statements.push(parse_stmt(&mut stream)?);
  }

  debug!(
    declarations = declarations.len(),
    statements = statements.len(),
    "parsed program"
  );
  Ok(Program {
    declarations,
    statements,
  })
}

fn parse_declaration(stream: &mut TokenStream) -> CompileResult<Declaration> {
  stream.eat(TokenKind::Int)?;
  let name = stream.ident()?;

  let initializer = if stream.equal(TokenKind::Assign) {
    Some(parse_expr(stream)?)
  } else {
    None
  };

  stream.eat(TokenKind::Semicolon)?;
  Ok(Declaration { name, initializer })
}

fn parse_stmt(stream: &mut TokenStream) -> CompileResult<Stmt> {
  match stream.current().kind {
    TokenKind::Identifier => parse_assign(stream),
    TokenKind::Print => parse_print(stream),
    TokenKind::If => parse_if(stream),
    TokenKind::While => parse_while(stream),
    TokenKind::LBrace => Ok(Stmt::Block(parse_block(stream)?)),
    _ => Err(stream.invalid("statement")),
  }
}

fn parse_assign(stream: &mut TokenStream) -> CompileResult<Stmt> {
  let name = stream.ident()?;
  stream.eat(TokenKind::Assign)?;
  let expr = parse_expr(stream)?;
  stream.eat(TokenKind::Semicolon)?;
  Ok(Stmt::Assign { name, expr })
}

fn parse_print(stream: &mut TokenStream) -> CompileResult<Stmt> {
  stream.eat(TokenKind::Print)?;
  stream.eat(TokenKind::LParen)?;
  let expr = parse_expr(stream)?;
  stream.eat(TokenKind::RParen)?;
  stream.eat(TokenKind::Semicolon)?;
  Ok(Stmt::Print { expr })
}

fn parse_if(stream: &mut TokenStream) -> CompileResult<Stmt> {
  stream.eat(TokenKind::If)?;
  let condition = parse_condition(stream)?;
  let then_block = parse_block(stream)?;

  let else_block = if stream.equal(TokenKind::Else) {
    Some(parse_block(stream)?)
  } else {
    None
  };

  Ok(Stmt::If {
    condition,
    then_block,
    else_block,
  })
}

fn parse_while(stream: &mut TokenStream) -> CompileResult<Stmt> {
  stream.eat(TokenKind::While)?;
  let condition = parse_condition(stream)?;
  let body = parse_block(stream)?;
  Ok(Stmt::While { condition, body })
}

// "(" expression ")"
fn parse_condition(stream: &mut TokenStream) -> CompileResult<Expr> {
  stream.eat(TokenKind::LParen)?;
  let condition = parse_expr(stream)?;
  stream.eat(TokenKind::RParen)?;
  Ok(condition)
}

fn parse_block(stream: &mut TokenStream) -> CompileResult<Block> {
  stream.enter()?;
  stream.eat(TokenKind::LBrace)?;

  let mut statements = Vec::new();
  while !stream.check(TokenKind::RBrace) {
    statements.push(parse_stmt(stream)?);
  }

  stream.eat(TokenKind::RBrace)?;
  stream.leave();
  Ok(Block { statements })
}

fn parse_expr(stream: &mut TokenStream) -> CompileResult<Expr> {
  parse_equality(stream)
}

fn parse_equality(stream: &mut TokenStream) -> CompileResult<Expr> {
  let mut node = parse_relational(stream)?;

  while let Some(op) = stream.binary_op(&[TokenKind::Equal, TokenKind::NotEqual]) {
    let rhs = parse_relational(stream)?;
    node = Expr::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_relational(stream: &mut TokenStream) -> CompileResult<Expr> {
  let mut node = parse_add(stream)?;

  while let Some(op) = stream.binary_op(&[
    TokenKind::Less,
    TokenKind::LessEqual,
    TokenKind::Greater,
    TokenKind::GreaterEqual,
  ]) {
    let rhs = parse_add(stream)?;
    node = Expr::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_add(stream: &mut TokenStream) -> CompileResult<Expr> {
  let mut node = parse_mul(stream)?;

  while let Some(op) = stream.binary_op(&[TokenKind::Plus, TokenKind::Minus]) {
    let rhs = parse_mul(stream)?;
    node = Expr::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_mul(stream: &mut TokenStream) -> CompileResult<Expr> {
  let mut node = parse_primary(stream)?;

  while let Some(op) =
    stream.binary_op(&[TokenKind::Multiply, TokenKind::Divide, TokenKind::Mod])
  {
    let rhs = parse_primary(stream)?;
    node = Expr::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_primary(stream: &mut TokenStream) -> CompileResult<Expr> {
  match stream.current().kind {
    TokenKind::Number => Ok(Expr::number(stream.number()?)),
    TokenKind::Identifier => Ok(Expr::ident(stream.ident()?)),
    TokenKind::LParen => {
      stream.enter()?;
      stream.eat(TokenKind::LParen)?;
      let node = parse_expr(stream)?;
      stream.eat(TokenKind::RParen)?;
      stream.leave();
      Ok(node)
    }
    _ => Err(stream.invalid("expression")),
  }
}

/// Lightweight cursor over the token vector.
struct TokenStream {
  tokens: Vec<Token>,
  pos: usize,
  // Open `(` and `{` levels.
  depth: usize,
}

impl TokenStream {
  /// Take ownership of the tokens. A trailing `Eof` is appended when the
  /// caller handed over a stream without one, so `current` always has a token.
  fn new(mut tokens: Vec<Token>) -> Self {
    if tokens.last().map(|token| token.kind) != Some(TokenKind::Eof) {
      let line = tokens.last().map_or(1, |token| token.line);
      tokens.push(Token::new(TokenKind::Eof, None, line));
    }
    Self {
      tokens,
      pos: 0,
      depth: 0,
    }
  }

  fn current(&self) -> &Token {
    &self.tokens[self.pos]
  }

  fn check(&self, kind: TokenKind) -> bool {
    self.current().kind == kind
  }

  fn is_eof(&self) -> bool {
    self.check(TokenKind::Eof)
  }

  fn advance(&mut self) -> Token {
    let token = self.current().clone();
    if self.pos + 1 < self.tokens.len() {
      self.pos += 1;
    }
    token
  }

  /// Consume the current token if it has the given kind.
  fn equal(&mut self, kind: TokenKind) -> bool {
    if self.check(kind) {
      self.advance();
      return true;
    }
    false
  }

  /// Consume the current token, failing unless it has the given kind.
  fn eat(&mut self, kind: TokenKind) -> CompileResult<Token> {
    if self.check(kind) {
      Ok(self.advance())
    } else {
      Err(self.unexpected(kind))
    }
  }

  fn ident(&mut self) -> CompileResult<String> {
    let token = self.eat(TokenKind::Identifier)?;
    token
      .text()
      .map(str::to_string)
      .ok_or_else(|| unexpected_token(&token, TokenKind::Identifier))
  }

  fn number(&mut self) -> CompileResult<i64> {
    let token = self.eat(TokenKind::Number)?;
    token
      .int()
      .ok_or_else(|| unexpected_token(&token, TokenKind::Number))
  }

  /// Consume the current token if it is one of `kinds` and map it to its operator.
  fn binary_op(&mut self, kinds: &[TokenKind]) -> Option<BinaryOp> {
    let kind = self.current().kind;
    if !kinds.contains(&kind) {
      return None;
    }
    self.advance();
    BinaryOp::from_token(kind)
  }

  /// Open one nesting level, failing once `MAX_NESTING` would be exceeded.
  fn enter(&mut self) -> CompileResult<()> {
    if self.depth >= MAX_NESTING {
      let token = self.current();
      return NestingTooDeepSnafu {
        limit: MAX_NESTING,
        found: token.to_string(),
        line: token.line,
      }
      .fail();
    }
    self.depth += 1;
    Ok(())
  }

  fn leave(&mut self) {
    self.depth -= 1;
  }

  fn unexpected(&self, expected: TokenKind) -> CompileError {
    unexpected_token(self.current(), expected)
  }

  fn invalid(&self, construct: &'static str) -> CompileError {
    let token = self.current();
    InvalidConstructSnafu {
      construct,
      found: token.to_string(),
      line: token.line,
    }
    .build()
  }
}

fn unexpected_token(token: &Token, expected: TokenKind) -> CompileError {
  UnexpectedTokenSnafu {
    found: token.to_string(),
    expected,
    line: token.line,
  }
  .build()
}
