//! Runtime kinds.
//!
//! A [`RuntimeKind`] is a stateless bundle of behavior for one class of function
//! source: how to build it, which files matter for change detection, and how it
//! would be started. The set is closed; adding a kind means adding a variant and
//! letting the compiler point at every `match` that needs a new arm.

mod factory;
mod go;
mod node;
mod python;
mod toolchain;

use std::fmt;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::build::BuildError;
use crate::consts::BOOTSTRAP_BINARY;
use crate::project::FunctionSpec;

pub use factory::{RuntimeError, detect, normalize, resolve, resolve_function};
pub use toolchain::Toolchain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeKind {
  /// Compiled to a single static executable.
  Go,
  /// Interpreted, with dependencies declared in `package.json`.
  Node,
  /// Interpreted, with dependencies declared in `requirements.txt`.
  Python,
}

impl RuntimeKind {
  pub const ALL: [RuntimeKind; 3] = [RuntimeKind::Go, RuntimeKind::Node, RuntimeKind::Python];

  pub fn name(&self) -> &'static str {
    match self {
      Self::Go => "golang",
      Self::Node => "nodejs",
      Self::Python => "python",
    }
  }

  /// Whether the initial pass and rebuilds must run [`build`](Self::build).
  pub fn needs_build(&self) -> bool {
    match self {
      Self::Go => true,
      Self::Node | Self::Python => false,
    }
  }

  /// File-name globs whose containing directories are watched.
  pub fn watch_patterns(&self) -> &'static [&'static str] {
    match self {
      Self::Go => go::WATCH_PATTERNS,
      Self::Node => node::WATCH_PATTERNS,
      Self::Python => python::WATCH_PATTERNS,
    }
  }

  /// Compiled matcher over [`watch_patterns`](Self::watch_patterns).
  pub fn watch_matcher(&self) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in self.watch_patterns() {
      builder.add(Glob::new(pattern)?);
    }
    builder.build()
  }

  /// The external program this kind invokes when building.
  pub fn toolchain(&self) -> Toolchain {
    match self {
      Self::Go => Toolchain::Go,
      Self::Node => Toolchain::Npm,
      Self::Python => Toolchain::Pip,
    }
  }

  /// Build the function in `source_dir`, writing artifacts under `output_dir`.
  ///
  /// Every call redoes the full compile or install; nothing is cached between calls.
  pub async fn build(&self, source_dir: &Path, output_dir: &Path) -> Result<(), BuildError> {
    match self {
      Self::Go => go::build(source_dir, output_dir).await,
      Self::Node => node::build(source_dir, output_dir).await,
      Self::Python => python::build(source_dir, output_dir).await,
    }
  }

  /// Command line that runs `artifact` locally.
  pub fn start_command(&self, artifact: &Path) -> Vec<String> {
    let artifact = artifact.display().to_string();
    match self {
      Self::Go => vec![artifact],
      Self::Node => vec!["node".to_string(), artifact],
      Self::Python => vec!["python".to_string(), artifact],
    }
  }

  /// The file the function runs from: the compiled binary, or the handler's module.
  pub fn artifact_path(&self, function: &FunctionSpec) -> PathBuf {
    let module = function.handler_module();
    match self {
      Self::Go => function.source_dir.join(BOOTSTRAP_BINARY),
      Self::Node => function.source_dir.join(format!("{module}.js")),
      Self::Python => function.source_dir.join(format!("{module}.py")),
    }
  }
}

impl fmt::Display for RuntimeKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name())
  }
}
