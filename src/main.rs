use std::env;
use std::fs;
use std::io;
use std::process;

use snafu::{ResultExt, Snafu};
use tacc::{CompileError, Options, codegen, parser, semantic, tokenizer};
use tracing_subscriber::EnvFilter;

/// Set to `1`, `true` or `yes` to lower declaration initializers.
const LOWER_INITIALIZERS_VAR: &str = "TACC_LOWER_INITIALIZERS";

#[derive(Debug, Snafu)]
enum DriverError {
  #[snafu(display("could not read {path}: {source}"))]
  ReadSource { path: String, source: io::Error },

  #[snafu(context(false), display("{source}"))]
  Compile { source: CompileError },
}

fn init_logging() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .with_writer(io::stderr)
    .init();
}

fn is_enabled(value: &str) -> bool {
  matches!(
    value.trim().to_ascii_lowercase().as_str(),
    "1" | "true" | "yes"
  )
}

fn options_from_env() -> Options {
  Options {
    lower_initializers: env::var(LOWER_INITIALIZERS_VAR).is_ok_and(|value| is_enabled(&value)),
  }
}

/// Print every intermediate artifact. Stages run one at a time so the
/// output produced before a failing stage is still shown.
fn run(path: &str, options: Options) -> Result<(), DriverError> {
  let source = fs::read_to_string(path).context(ReadSourceSnafu { path })?;

  println!("===== SOURCE CODE =====");
  println!("{source}");

  let tokens = tokenizer::tokenize(&source)?;
  println!("\n===== TOKENS =====");
  for token in &tokens {
    println!("{token}");
  }

  let program = parser::parse(tokens)?;
  println!("\n===== AST GENERATED =====");

  semantic::analyze(&program)?;
  println!("Semantic Analysis Passed");

  let code = codegen::generate_with(&program, options);
  println!("\n===== THREE ADDRESS CODE =====");
  for instr in &code {
    println!("{instr}");
  }

  Ok(())
}

fn main() {
  init_logging();

  let args: Vec<String> = env::args().collect();
  if args.len() != 2 {
    let program = args.first().map(String::as_str).unwrap_or("tacc");
    eprintln!("usage: {program} <source_file>");
    process::exit(1);
  }

  if let Err(err) = run(&args[1], options_from_env()) {
    eprintln!("{err}");
    process::exit(1);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flag_values() {
    for value in ["1", "true", "TRUE", " yes "] {
      assert!(is_enabled(value), "{value:?}");
    }
    for value in ["", "0", "false", "no", "on"] {
      assert!(!is_enabled(value), "{value:?}");
    }
  }

  #[test]
  fn missing_file_is_reported() {
    let err = run("/nonexistent/dir/prog.src", Options::default()).unwrap_err();
    assert!(matches!(err, DriverError::ReadSource { .. }));
    assert!(err.to_string().starts_with("could not read /nonexistent/dir/prog.src"));
  }
}
