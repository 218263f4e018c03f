use std::fmt;
use std::path::PathBuf;

/// External programs the runtime kinds shell out to.
///
/// Each can be redirected with an environment variable (`HOTFN_GO`,
/// `HOTFN_NPM`, `HOTFN_PIP`), e.g. to pin a specific Go installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Toolchain {
  Go,
  Npm,
  Pip,
}

impl Toolchain {
  pub const ALL: [Toolchain; 3] = [Toolchain::Go, Toolchain::Npm, Toolchain::Pip];

  /// Default executable name looked up on PATH.
  pub fn binary_name(&self) -> &'static str {
    match self {
      Self::Go => "go",
      Self::Npm => "npm",
      Self::Pip => "pip",
    }
  }

  /// Environment variable that overrides the executable.
  pub fn env_override(&self) -> &'static str {
    match self {
      Self::Go => "HOTFN_GO",
      Self::Npm => "HOTFN_NPM",
      Self::Pip => "HOTFN_PIP",
    }
  }

  /// The program to execute: the override if set and non-empty, else the binary name.
  pub fn program(&self) -> PathBuf {
    std::env::var_os(self.env_override())
      .filter(|v| !v.is_empty())
      .map(PathBuf::from)
      .unwrap_or_else(|| PathBuf::from(self.binary_name()))
  }

  /// Resolve the program to an absolute path.
  pub fn locate(&self) -> Result<PathBuf, which::Error> {
    which::which(self.program())
  }
}

impl fmt::Display for Toolchain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.binary_name())
  }
}
