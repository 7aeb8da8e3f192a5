//! Code generation: lower the validated AST into three-address code.
//!
//! Leaves (`Number`, `Identifier`) are pure operands and emit nothing. Every
//! binary node gets a fresh temporary and exactly one `Compute`. Structured
//! control flow is flattened into labels, `ifFalse` and `goto`. Temporaries
//! (`t1, t2, ...`) and labels (`L1, L2, ...`) are numbered per run and never
//! reused.

use std::fmt;

use tracing::{debug, warn};

use crate::parser::{BinaryOp, Block, Declaration, Expr, Program, Stmt};

/// Compiler-introduced value holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Temp(pub usize);

impl fmt::Display for Temp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "t{}", self.0)
  }
}

/// Jump target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub usize);

impl fmt::Display for Label {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "L{}", self.0)
  }
}

/// A value an instruction can read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
  Const(i64),
  Var(String),
  Temp(Temp),
}

impl fmt::Display for Operand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Const(value) => write!(f, "{value}"),
      Self::Var(name) => f.write_str(name),
      Self::Temp(temp) => write!(f, "{temp}"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
  Assign {
    target: String,
    value: Operand,
  },
  Compute {
    temp: Temp,
    lhs: Operand,
    op: BinaryOp,
    rhs: Operand,
  },
  Print {
    value: Operand,
  },
  Label(Label),
  IfFalse {
    cond: Operand,
    label: Label,
  },
  Goto(Label),
}

impl fmt::Display for Instr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Assign { target, value } => write!(f, "{target} = {value}"),
      Self::Compute { temp, lhs, op, rhs } => write!(f, "{temp} = {lhs} {op} {rhs}"),
      Self::Print { value } => write!(f, "print {value}"),
      Self::Label(label) => write!(f, "{label}:"),
      Self::IfFalse { cond, label } => write!(f, "ifFalse {cond} goto {label}"),
      Self::Goto(label) => write!(f, "goto {label}"),
    }
  }
}

/// Knobs for lowering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
  /// Emit `name = value` for declaration initializers. Off by default, in
  /// which case initializers are validated but produce no code.
  pub lower_initializers: bool,
}

/// Lower `program` with default options.
pub fn generate(program: &Program) -> Vec<Instr> {
  generate_with(program, Options::default())
}

pub fn generate_with(program: &Program, options: Options) -> Vec<Instr> {
  Generator::new(options).run(program)
}

/// Render instructions one per line.
pub fn render(code: &[Instr]) -> String {
  code
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join("\n")
}

/// State for a single lowering run. Consumed by `run`, so counters never
/// leak from one compilation into the next.
struct Generator {
  options: Options,
  temps: usize,
  labels: usize,
  code: Vec<Instr>,
}

impl Generator {
  fn new(options: Options) -> Self {
    Self {
      options,
      temps: 0,
      labels: 0,
      code: Vec::new(),
    }
  }

  fn run(mut self, program: &Program) -> Vec<Instr> {
    for decl in &program.declarations {
      self.emit_declaration(decl);
    }
    for stmt in &program.statements {
      self.emit_stmt(stmt);
    }
    debug!(
      instructions = self.code.len(),
      temps = self.temps,
      labels = self.labels,
      "generated three-address code"
    );
    self.code
  }

  fn new_temp(&mut self) -> Temp {
    self.temps += 1;
    Temp(self.temps)
  }

  fn new_label(&mut self) -> Label {
    self.labels += 1;
    Label(self.labels)
  }

  fn emit(&mut self, instr: Instr) {
    self.code.push(instr);
  }

  fn emit_declaration(&mut self, decl: &Declaration) {
    let Some(init) = &decl.initializer else {
      return;
    };
    if !self.options.lower_initializers {
      warn!(name = %decl.name, "initializer is not lowered into an assignment");
      return;
    }
    let value = self.emit_expr(init);
    self.emit(Instr::Assign {
      target: decl.name.clone(),
      value,
    });
  }

  fn emit_stmt(&mut self, stmt: &Stmt) {
    match stmt {
      Stmt::Assign { name, expr } => {
        let value = self.emit_expr(expr);
        self.emit(Instr::Assign {
          target: name.clone(),
          value,
        });
      }
      Stmt::Print { expr } => {
        let value = self.emit_expr(expr);
        self.emit(Instr::Print { value });
      }
      Stmt::If {
        condition,
        then_block,
        else_block,
      } => {
        let cond = self.emit_expr(condition);
        let label_else = self.new_label();
        let label_end = self.new_label();

        self.emit(Instr::IfFalse {
          cond,
          label: label_else,
        });
        self.emit_block(then_block);
        // Emitted even without an else block.
        self.emit(Instr::Goto(label_end));
        self.emit(Instr::Label(label_else));
        if let Some(block) = else_block {
          self.emit_block(block);
        }
        self.emit(Instr::Label(label_end));
      }
      Stmt::While { condition, body } => {
        let label_start = self.new_label();
        let label_end = self.new_label();

        self.emit(Instr::Label(label_start));
        let cond = self.emit_expr(condition);
        self.emit(Instr::IfFalse {
          cond,
          label: label_end,
        });
        self.emit_block(body);
        self.emit(Instr::Goto(label_start));
        self.emit(Instr::Label(label_end));
      }
      Stmt::Block(block) => self.emit_block(block),
    }
  }

  fn emit_block(&mut self, block: &Block) {
    for stmt in &block.statements {
      self.emit_stmt(stmt);
    }
  }

  /// Emit code for `expr` and return the operand holding its value.
  fn emit_expr(&mut self, expr: &Expr) -> Operand {
    match expr {
      Expr::Number { value } => Operand::Const(*value),
      Expr::Identifier { name } => Operand::Var(name.clone()),
      Expr::Binary { op, lhs, rhs } => {
        let lhs = self.emit_expr(lhs);
        let rhs = self.emit_expr(rhs);
        let temp = self.new_temp();
        self.emit(Instr::Compute {
          temp,
          lhs,
          op: *op,
          rhs,
        });
        Operand::Temp(temp)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;
  use crate::parser::parse;
  use crate::semantic::analyze;
  use crate::tokenizer::tokenize;

  fn program(source: &str) -> Program {
    let program = parse(tokenize(source).unwrap()).unwrap();
    analyze(&program).unwrap();
    program
  }

  fn lines(source: &str) -> Vec<String> {
    generate(&program(source))
      .iter()
      .map(ToString::to_string)
      .collect()
  }

  // Every jump target is defined exactly once.
  fn assert_labels_resolve(code: &[Instr]) {
    let mut defined = HashMap::new();
    for instr in code {
      if let Instr::Label(label) = instr {
        *defined.entry(*label).or_insert(0) += 1;
      }
    }
    for instr in code {
      if let Instr::IfFalse { label, .. } | Instr::Goto(label) = instr {
        assert_eq!(defined.get(label), Some(&1), "{label} in {code:?}");
      }
    }
  }

  macro_rules! test_tac {
    ($name:ident, $source:expr, $expected:expr) => {
      #[test]
      fn $name() {
        let expected: &[&str] = $expected;
        assert_eq!(lines($source), expected);
      }
    };
  }

  test_tac!(
    assignment_of_literal,
    "int x; x = 5;",
    &["x = 5"]
  );

  test_tac!(
    nested_arithmetic_allocates_temps_in_order,
    "int a; int b; a = (b + 2) * (b - 1) % 3;",
    &["t1 = b + 2", "t2 = b - 1", "t3 = t1 * t2", "t4 = t3 % 3", "a = t4"]
  );

  test_tac!(
    print_of_identifier_emits_no_temp,
    "int x; print(x);",
    &["print x"]
  );

  test_tac!(
    if_else_shape,
    "int x; if (x > 0) { print(x); } else { print(0); }",
    &[
      "t1 = x > 0",
      "ifFalse t1 goto L1",
      "print x",
      "goto L2",
      "L1:",
      "print 0",
      "L2:"
    ]
  );

  test_tac!(
    if_without_else_keeps_full_shape,
    "int x; if (x) { x = 1; }",
    &["ifFalse x goto L1", "x = 1", "goto L2", "L1:", "L2:"]
  );

  test_tac!(
    while_shape,
    "int x; while (x > 0) { x = x - 1; }",
    &[
      "L1:",
      "t1 = x > 0",
      "ifFalse t1 goto L2",
      "t2 = x - 1",
      "x = t2",
      "goto L1",
      "L2:"
    ]
  );

  test_tac!(
    numbering_is_global_across_constructs,
    "int x; while (x < 3) { if (x == 1) { print(x); } x = x + 1; }",
    &[
      "L1:",
      "t1 = x < 3",
      "ifFalse t1 goto L2",
      "t2 = x == 1",
      "ifFalse t2 goto L3",
      "print x",
      "goto L4",
      "L3:",
      "L4:",
      "t3 = x + 1",
      "x = t3",
      "goto L1",
      "L2:"
    ]
  );

  test_tac!(
    initializers_are_dropped_by_default,
    "int x = 5; int y = x + 1; print(y);",
    &["print y"]
  );

  #[test]
  fn initializers_lower_when_enabled() {
    let code = generate_with(
      &program("int x = 5; int y = x + 1; print(y);"),
      Options {
        lower_initializers: true,
      },
    );
    assert_eq!(render(&code), "x = 5\nt1 = x + 1\ny = t1\nprint y");
  }

  #[test]
  fn labels_always_resolve() {
    let code = generate(&program(
      "int i; int j; while (i < 10) { j = 0; while (j < i) { if (j % 2 == 0) { print(j); } else { { print(i); } } j = j + 1; } i = i + 1; }",
    ));
    assert_labels_resolve(&code);
    let labels = code
      .iter()
      .filter(|instr| matches!(instr, Instr::Label(_)))
      .count();
    assert_eq!(labels, 6);
  }

  #[test]
  fn regeneration_is_identical() {
    let program = program("int x; while (x > 0) { if (x % 2) { print(x); } x = x - 1; }");
    assert_eq!(render(&generate(&program)), render(&generate(&program)));
  }

  #[test]
  fn empty_program_emits_nothing() {
    assert!(generate(&program("int x;")).is_empty());
    assert_eq!(render(&[]), "");
  }
}
