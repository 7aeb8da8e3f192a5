use std::fmt;

/// The language has a single value type. Keeping it as an enum leaves the
/// symbol table shape unchanged if more kinds are ever added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Type {
  #[default]
  Int,
}

impl Type {
  pub fn int() -> Self {
    Self::Int
  }

  pub fn is_integer(&self) -> bool {
    matches!(self, Self::Int)
  }
}

impl fmt::Display for Type {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Int => f.write_str("int"),
    }
  }
}
