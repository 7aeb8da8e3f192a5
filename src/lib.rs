//! Crate root: wires together the compilation pipeline.
//!
//! Each stage fully consumes the output of the previous one:
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `parser` builds the program AST by recursive descent.
//! - `semantic` checks declarations and uses against a flat symbol table.
//! - `codegen` lowers the validated AST into three-address code.
//! - `error` holds the single error type every stage reports through.

pub mod codegen;
pub mod error;
pub mod parser;
pub mod semantic;
pub mod tokenizer;
pub mod ty;

use tracing::debug;

pub use codegen::{Instr, Options};
pub use error::{CompileError, CompileResult, ErrorKind};
pub use parser::Program;
pub use tokenizer::Token;

/// Every artifact produced by one run of the pipeline.
#[derive(Debug, Clone)]
pub struct Compilation {
  pub tokens: Vec<Token>,
  pub program: Program,
  pub code: Vec<Instr>,
}

/// Run all four stages over `source`, stopping at the first error.
pub fn compile(source: &str, options: Options) -> CompileResult<Compilation> {
  let tokens = tokenizer::tokenize(source)?;
  debug!(tokens = tokens.len(), "tokenized source");

  let program = parser::parse(tokens.clone())?;
  semantic::analyze(&program)?;
  let code = codegen::generate_with(&program, options);

  Ok(Compilation {
    tokens,
    program,
    code,
  })
}

/// Compile a source string into its textual three-address code.
pub fn generate_tac(source: &str) -> CompileResult<String> {
  let compilation = compile(source, Options::default())?;
  Ok(codegen::render(&compilation.code))
}
