//! Flat-scope semantic checks over the parsed program.
//!
//! There is one program-wide namespace. Declarations are registered in
//! source order and every later use must refer to a registered name. Blocks
//! open no scope of their own.

use std::collections::HashMap;

use snafu::OptionExt;
use tracing::{debug, trace};

use crate::error::{CompileResult, RedeclaredSnafu, UndeclaredSnafu};
use crate::parser::{Block, Declaration, Expr, Program, Stmt};
use crate::ty::Type;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
  pub name: String,
  pub ty: Type,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
  table: HashMap<String, Symbol>,
}

impl SymbolTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register `name`, failing if it is already present.
  pub fn declare(&mut self, name: &str, ty: Type) -> CompileResult<()> {
    if self.table.contains_key(name) {
      return RedeclaredSnafu { name }.fail();
    }
    trace!(name, %ty, "declared symbol");
    self.table.insert(
      name.to_string(),
      Symbol {
        name: name.to_string(),
        ty,
      },
    );
    Ok(())
  }

  pub fn lookup(&self, name: &str) -> CompileResult<&Symbol> {
    self.table.get(name).context(UndeclaredSnafu { name })
  }

  pub fn len(&self) -> usize {
    self.table.len()
  }

  pub fn is_empty(&self) -> bool {
    self.table.is_empty()
  }
}

/// Walks a program once, building its symbol table as it goes.
#[derive(Debug, Default)]
pub struct SemanticAnalyzer {
  symbols: SymbolTable,
}

impl SemanticAnalyzer {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn symbols(&self) -> &SymbolTable {
    &self.symbols
  }

  pub fn analyze(&mut self, program: &Program) -> CompileResult<()> {
    for decl in &program.declarations {
      self.check_declaration(decl)?;
    }
    for stmt in &program.statements {
      self.check_stmt(stmt)?;
    }
    debug!(symbols = self.symbols.len(), "semantic analysis passed");
    Ok(())
  }

  fn check_declaration(&mut self, decl: &Declaration) -> CompileResult<()> {
    // The initializer is checked before the name exists, so `int x = x;`
    // reports `x` as undeclared.
    if let Some(init) = &decl.initializer {
      self.check_expr(init)?;
    }
    self.symbols.declare(&decl.name, Type::int())
  }

  fn check_stmt(&self, stmt: &Stmt) -> CompileResult<()> {
    match stmt {
      Stmt::Assign { name, expr } => {
        self.symbols.lookup(name)?;
        self.check_expr(expr)
      }
      Stmt::Print { expr } => self.check_expr(expr),
      Stmt::If {
        condition,
        then_block,
        else_block,
      } => {
        self.check_expr(condition)?;
        self.check_block(then_block)?;
        if let Some(block) = else_block {
          self.check_block(block)?;
        }
        Ok(())
      }
      Stmt::While { condition, body } => {
        self.check_expr(condition)?;
        self.check_block(body)
      }
      Stmt::Block(block) => self.check_block(block),
    }
  }

  fn check_block(&self, block: &Block) -> CompileResult<()> {
    block
      .statements
      .iter()
      .try_for_each(|stmt| self.check_stmt(stmt))
  }

  fn check_expr(&self, expr: &Expr) -> CompileResult<()> {
    match expr {
      Expr::Number { .. } => Ok(()),
      Expr::Identifier { name } => self.symbols.lookup(name).map(|_| ()),
      Expr::Binary { lhs, rhs, .. } => {
        self.check_expr(lhs)?;
        self.check_expr(rhs)
      }
    }
  }
}

/// Validate `program`, discarding the symbol table afterwards.
pub fn analyze(program: &Program) -> CompileResult<()> {
  SemanticAnalyzer::new().analyze(program)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::{CompileError, ErrorKind};
  use crate::parser::parse;
  use crate::tokenizer::tokenize;

  fn check(source: &str) -> CompileResult<()> {
    analyze(&parse(tokenize(source).unwrap()).unwrap())
  }

  fn undeclared(name: &str) -> CompileError {
    CompileError::Undeclared {
      name: name.to_string(),
    }
  }

  macro_rules! test_accepts {
    ($name:ident, $source:expr) => {
      #[test]
      fn $name() {
        assert_eq!(check($source), Ok(()));
      }
    };
  }

  macro_rules! test_rejects {
    ($name:ident, $source:expr, $expected:expr) => {
      #[test]
      fn $name() {
        assert_eq!(check($source), Err($expected));
      }
    };
  }

  test_accepts!(empty_program, "");
  test_accepts!(
    initializer_may_use_earlier_names,
    "int a = 1; int b = a * 2; print(b);"
  );
  test_accepts!(
    nested_control_flow,
    "int x = 3; int y; while (x > 0) { if (x % 2 == 0) { y = y + x; } else { { print(x); } } x = x - 1; }"
  );

  test_rejects!(
    redeclaration,
    "int x; int x;",
    CompileError::Redeclared {
      name: "x".to_string()
    }
  );
  test_rejects!(assignment_does_not_declare, "x = 1;", undeclared("x"));
  test_rejects!(self_referencing_initializer, "int x = x;", undeclared("x"));
  test_rejects!(
    initializer_cannot_see_later_names,
    "int a = b; int b;",
    undeclared("b")
  );
  test_rejects!(undeclared_in_print, "int x; print(x + y);", undeclared("y"));
  test_rejects!(
    undeclared_in_condition,
    "int x; if (z) { x = 1; }",
    undeclared("z")
  );
  test_rejects!(
    undeclared_in_else_block,
    "int x; if (x) { x = 1; } else { w = 2; }",
    undeclared("w")
  );
  test_rejects!(
    undeclared_in_loop_body,
    "int x; while (x) { print(q); }",
    undeclared("q")
  );

  #[test]
  fn first_error_wins() {
    let err = check("int a; b = c;").unwrap_err();
    assert_eq!(err, undeclared("b"));
    assert_eq!(err.kind(), ErrorKind::Semantic);
  }

  #[test]
  fn symbols_are_typed_int() {
    let program = parse(tokenize("int a; int b = 4;").unwrap()).unwrap();
    let mut analyzer = SemanticAnalyzer::new();
    analyzer.analyze(&program).unwrap();

    let symbols = analyzer.symbols();
    assert_eq!(symbols.len(), 2);
    let b = symbols.lookup("b").unwrap();
    assert_eq!(b.name, "b");
    assert!(b.ty.is_integer());
    assert_eq!(b.ty.to_string(), "int");
  }

  #[test]
  fn symbol_table_rejects_duplicates() {
    let mut table = SymbolTable::new();
    assert!(table.is_empty());
    table.declare("n", Type::int()).unwrap();
    assert!(table.declare("n", Type::int()).is_err());
    assert_eq!(table.len(), 1);
    assert_eq!(table.lookup("m").unwrap_err(), undeclared("m"));
  }
}
