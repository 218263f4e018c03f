//! Project description loading and validation.
//!
//! The engine never parses configuration itself; it receives a [`Project`]
//! produced here. Validation errors name the offending key so the user can
//! fix the project file without guessing.

mod types;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

pub use types::{EventBinding, FunctionDef, FunctionSpec, Project, ProjectFile, ResourceLimits};

pub const MEMORY_RANGE: (u32, u32) = (128, 10240);
pub const TIMEOUT_RANGE: (u32, u32) = (1, 900);

/// Errors raised while loading or validating a project file.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {}: {source}", path.display())]
  Read { path: PathBuf, source: std::io::Error },

  #[error("failed to parse {}: {source}", path.display())]
  Parse { path: PathBuf, source: serde_yaml::Error },

  #[error("field '{0}' is required")]
  MissingField(String),

  #[error("service name '{0}' is invalid: only alphanumeric characters and hyphens are allowed")]
  InvalidServiceName(String),

  #[error("at least one function must be defined")]
  NoFunctions,

  #[error("{field} must be between {min} and {max}, got {value}")]
  OutOfRange { field: String, value: u32, min: u32, max: u32 },

  #[error("event {index} of function '{function}' is invalid: {reason}")]
  InvalidEvent {
    function: String,
    index: usize,
    reason: String,
  },
}

/// Load and validate a project file. The project root is the file's directory.
pub fn load(path: &Path) -> Result<Project, ConfigError> {
  let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
    path: path.to_path_buf(),
    source,
  })?;

  let file: ProjectFile = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
    path: path.to_path_buf(),
    source,
  })?;

  let parent = match path.parent() {
    Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
    _ => PathBuf::from("."),
  };
  let root = dunce::canonicalize(&parent).map_err(|source| ConfigError::Read {
    path: parent.clone(),
    source,
  })?;

  debug!(path = %path.display(), root = %root.display(), "loaded project file");
  validate(file, &root)
}

/// Validate a parsed project file and resolve its paths against `root`.
pub fn validate(file: ProjectFile, root: &Path) -> Result<Project, ConfigError> {
  if file.service.is_empty() {
    return Err(ConfigError::MissingField("service".to_string()));
  }
  if !is_valid_service_name(&file.service) {
    return Err(ConfigError::InvalidServiceName(file.service));
  }
  if file.stage.is_empty() {
    return Err(ConfigError::MissingField("stage".to_string()));
  }
  if file.functions.is_empty() {
    return Err(ConfigError::NoFunctions);
  }

  let mut project = Project::new(&file.service, &file.stage, root);
  for (name, def) in file.functions {
    let spec = validate_function(&name, def, root)?;
    project.functions.insert(name, spec);
  }

  Ok(project)
}

fn validate_function(name: &str, def: FunctionDef, root: &Path) -> Result<FunctionSpec, ConfigError> {
  let required = |value: Option<String>, key: &str| {
    value
      .filter(|v| !v.trim().is_empty())
      .ok_or_else(|| ConfigError::MissingField(format!("functions.{name}.{key}")))
  };

  let function_name = required(def.function_name, "functionName")?;
  let handler = required(def.handler, "handler")?;
  let code = required(def.code, "code")?;

  check_range(&format!("functions.{name}.memorySize"), def.memory_size, MEMORY_RANGE)?;
  check_range(&format!("functions.{name}.timeout"), def.timeout, TIMEOUT_RANGE)?;

  for (index, event) in def.events.iter().enumerate() {
    validate_event(name, index, event)?;
  }

  Ok(FunctionSpec {
    name: name.to_string(),
    function_name,
    runtime: def.runtime.filter(|r| !r.trim().is_empty()),
    handler,
    source_dir: Project::resolve_source_dir(root, &code),
    limits: ResourceLimits {
      memory_mb: def.memory_size,
      timeout_secs: def.timeout,
    },
    events: def.events,
  })
}

fn validate_event(function: &str, index: usize, event: &EventBinding) -> Result<(), ConfigError> {
  let invalid = |reason: &str| ConfigError::InvalidEvent {
    function: function.to_string(),
    index,
    reason: reason.to_string(),
  };

  if event.kind.is_empty() {
    return Err(invalid("type is required"));
  }
  if event.kind == "http" {
    if event.path.as_deref().is_none_or(str::is_empty) {
      return Err(invalid("path is required for http events"));
    }
    if event.method.as_deref().is_none_or(str::is_empty) {
      return Err(invalid("method is required for http events"));
    }
  }
  Ok(())
}

fn check_range(field: &str, value: u32, (min, max): (u32, u32)) -> Result<(), ConfigError> {
  if (min..=max).contains(&value) {
    Ok(())
  } else {
    Err(ConfigError::OutOfRange {
      field: field.to_string(),
      value,
      min,
      max,
    })
  }
}

fn is_valid_service_name(name: &str) -> bool {
  name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
