//! Types describing a function project.
//!
//! `ProjectFile` and friends mirror the on-disk YAML; `Project` and `FunctionSpec`
//! are the validated, path-resolved form the engine consumes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const DEFAULT_MEMORY_MB: u32 = 128;
pub const DEFAULT_TIMEOUT_SECS: u32 = 3;

/// Raw project file as written by the user.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
  #[serde(default)]
  pub service: String,
  #[serde(default)]
  pub stage: String,
  #[serde(default)]
  pub functions: BTreeMap<String, FunctionDef>,
}

/// Raw function entry. Required fields are optional here so that validation
/// can name the exact missing key.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDef {
  pub function_name: Option<String>,
  pub runtime: Option<String>,
  pub handler: Option<String>,
  pub code: Option<String>,
  #[serde(default = "default_memory")]
  pub memory_size: u32,
  #[serde(default = "default_timeout")]
  pub timeout: u32,
  #[serde(default)]
  pub events: Vec<EventBinding>,
}

fn default_memory() -> u32 {
  DEFAULT_MEMORY_MB
}

fn default_timeout() -> u32 {
  DEFAULT_TIMEOUT_SECS
}

/// An event source wired to a function (e.g. an HTTP route).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBinding {
  #[serde(rename = "type", default)]
  pub kind: String,
  #[serde(default)]
  pub resource: Option<String>,
  #[serde(default)]
  pub path: Option<String>,
  #[serde(default)]
  pub method: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimits {
  pub memory_mb: u32,
  pub timeout_secs: u32,
}

impl Default for ResourceLimits {
  fn default() -> Self {
    Self {
      memory_mb: DEFAULT_MEMORY_MB,
      timeout_secs: DEFAULT_TIMEOUT_SECS,
    }
  }
}

/// A validated function, with its source directory resolved against the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSpec {
  /// Logical name, the key in the `functions` map.
  pub name: String,
  /// Name of the deployed function.
  pub function_name: String,
  /// Declared runtime identifier, if any.
  pub runtime: Option<String>,
  pub handler: String,
  /// Absolute directory holding the function's sources.
  pub source_dir: PathBuf,
  pub limits: ResourceLimits,
  pub events: Vec<EventBinding>,
}

impl FunctionSpec {
  /// Create a function rooted at `source_dir` with default limits and no events.
  pub fn new(name: &str, source_dir: impl Into<PathBuf>) -> Self {
    Self {
      name: name.to_string(),
      function_name: name.to_string(),
      runtime: None,
      handler: "index.handler".to_string(),
      source_dir: source_dir.into(),
      limits: ResourceLimits::default(),
      events: Vec::new(),
    }
  }

  pub fn with_runtime(mut self, runtime: &str) -> Self {
    self.runtime = Some(runtime.to_string());
    self
  }

  pub fn with_handler(mut self, handler: &str) -> Self {
    self.handler = handler.to_string();
    self
  }

  /// Module part of the handler reference (`index` for `index.handler`).
  pub fn handler_module(&self) -> &str {
    self.handler.split_once('.').map(|(module, _)| module).unwrap_or(&self.handler)
  }
}

/// The validated project handed to the engine.
#[derive(Debug, Clone)]
pub struct Project {
  pub service: String,
  pub stage: String,
  /// Absolute project root; relative paths in the project file resolve against it.
  pub root: PathBuf,
  pub functions: BTreeMap<String, FunctionSpec>,
}

impl Project {
  pub fn new(service: &str, stage: &str, root: impl Into<PathBuf>) -> Self {
    Self {
      service: service.to_string(),
      stage: stage.to_string(),
      root: root.into(),
      functions: BTreeMap::new(),
    }
  }

  pub fn with_function(mut self, function: FunctionSpec) -> Self {
    self.functions.insert(function.name.clone(), function);
    self
  }

  pub fn function(&self, name: &str) -> Option<&FunctionSpec> {
    self.functions.get(name)
  }

  /// Resolve a `code` entry to the function's source directory.
  ///
  /// `code` normally names a directory; when it names an existing file the
  /// file's parent directory is used instead.
  pub fn resolve_source_dir(root: &Path, code: &str) -> PathBuf {
    let joined = root.join(code.trim_end_matches(['/', '\\']));
    if joined.is_file() {
      joined.parent().map(Path::to_path_buf).unwrap_or(joined)
    } else {
      joined
    }
  }
}
