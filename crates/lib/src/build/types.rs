//! Types for build execution.
//!
//! This module defines the error type, per-function targets, and the report
//! produced by a build pass.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::runtime::RuntimeKind;

/// Errors that can occur while building a single function.
#[derive(Debug, Error)]
pub enum BuildError {
  /// The toolchain ran and exited unsuccessfully. `stderr` is reproduced verbatim.
  #[error("command failed with exit code {code:?}: {command}\n{stderr}")]
  ToolFailed {
    command: String,
    code: Option<i32>,
    stderr: String,
  },

  /// The toolchain program could not be started.
  #[error("failed to run {program}: {source}")]
  ToolMissing {
    program: String,
    #[source]
    source: io::Error,
  },

  /// I/O error while preparing the build.
  #[error("io error: {0}")]
  Io(#[from] io::Error),
}

/// One function to build: where its sources live, where the artifact goes,
/// and which runtime builds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
  pub function: String,
  pub source_dir: PathBuf,
  pub output_dir: PathBuf,
  pub runtime: RuntimeKind,
}

impl BuildTarget {
  /// Target whose artifact is written into the source directory itself.
  pub fn in_place(function: &str, source_dir: impl Into<PathBuf>, runtime: RuntimeKind) -> Self {
    let source_dir = source_dir.into();
    Self {
      function: function.to_string(),
      output_dir: source_dir.clone(),
      source_dir,
      runtime,
    }
  }
}

/// Which targets a batch build should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildPolicy {
  /// Only runtimes that compile an artifact.
  #[default]
  RequiredOnly,
  /// Every target, including dependency installs for interpreted runtimes.
  Everything,
}

impl BuildPolicy {
  pub fn includes(self, runtime: RuntimeKind) -> bool {
    match self {
      BuildPolicy::RequiredOnly => runtime.needs_build(),
      BuildPolicy::Everything => true,
    }
  }
}

/// What happened to one function during a build pass.
#[derive(Debug)]
pub enum BuildOutcome {
  Built { elapsed: Duration },
  Skipped,
  Failed(BuildError),
}

#[derive(Debug)]
pub struct FunctionBuild {
  pub function: String,
  pub runtime: RuntimeKind,
  pub outcome: BuildOutcome,
}

/// Result of a batch build: one entry per target, in build order.
#[derive(Debug, Default)]
pub struct BuildReport {
  pub builds: Vec<FunctionBuild>,
}

impl BuildReport {
  /// Returns true if no build failed.
  pub fn is_success(&self) -> bool {
    self.first_failure().is_none()
  }

  /// The first failure seen during the pass, if any.
  pub fn first_failure(&self) -> Option<(&str, &BuildError)> {
    self.builds.iter().find_map(|b| match &b.outcome {
      BuildOutcome::Failed(e) => Some((b.function.as_str(), e)),
      _ => None,
    })
  }

  pub fn built(&self) -> usize {
    self.count(|o| matches!(o, BuildOutcome::Built { .. }))
  }

  pub fn skipped(&self) -> usize {
    self.count(|o| matches!(o, BuildOutcome::Skipped))
  }

  pub fn failed(&self) -> usize {
    self.count(|o| matches!(o, BuildOutcome::Failed(_)))
  }

  fn count(&self, pred: impl Fn(&BuildOutcome) -> bool) -> usize {
    self.builds.iter().filter(|b| pred(&b.outcome)).count()
  }
}
