//! Runtime resolution: from a declared identifier, or by inspecting sources.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::project::FunctionSpec;
use crate::runtime::{RuntimeKind, node, python};
use crate::watch::ignore::is_ignored_dir_name;

#[derive(Debug, Error)]
pub enum RuntimeError {
  #[error("unsupported runtime: {0}")]
  Unsupported(String),

  #[error("could not detect runtime for function in {}", dir.display())]
  DetectionFailed { dir: PathBuf },

  #[error("function directory {} does not exist", dir.display())]
  MissingDirectory { dir: PathBuf },
}

/// Canonical form of a runtime identifier: trimmed, lowercase, separators removed.
pub fn normalize(declared: &str) -> String {
  declared
    .trim()
    .to_lowercase()
    .chars()
    .filter(|c| !matches!(c, '-' | '_' | ' '))
    .collect()
}

/// Map a declared runtime identifier (e.g. `go1.x`, `nodejs20.x`, `python3.12`) to its kind.
pub fn resolve(declared: &str) -> Result<RuntimeKind, RuntimeError> {
  let key = normalize(declared);

  if key.starts_with("provided") || key.starts_with("go") {
    Ok(RuntimeKind::Go)
  } else if key.starts_with("node") {
    Ok(RuntimeKind::Node)
  } else if key.starts_with("python") {
    Ok(RuntimeKind::Python)
  } else {
    Err(RuntimeError::Unsupported(declared.to_string()))
  }
}

/// Marker files found while walking a function's source tree.
#[derive(Debug, Default)]
struct Markers {
  go_source: bool,
  node_manifest: bool,
  node_source: bool,
  requirements: bool,
  python_source: bool,
}

impl Markers {
  fn record(&mut self, file_name: &OsStr) {
    let name = file_name.to_string_lossy();
    let extension = Path::new(file_name).extension().and_then(OsStr::to_str);

    match (name.as_ref(), extension) {
      (node::MANIFEST, _) => self.node_manifest = true,
      (python::REQUIREMENTS, _) => self.requirements = true,
      (_, Some("go")) => self.go_source = true,
      (_, Some("js" | "mjs" | "cjs" | "ts")) => self.node_source = true,
      (_, Some("py")) => self.python_source = true,
      _ => {}
    }
  }

  /// Compiled sources win over a Node manifest or sources, which win over Python.
  fn kind(&self) -> Option<RuntimeKind> {
    if self.go_source {
      Some(RuntimeKind::Go)
    } else if self.node_manifest || self.node_source {
      Some(RuntimeKind::Node)
    } else if self.requirements || self.python_source {
      Some(RuntimeKind::Python)
    } else {
      None
    }
  }
}

/// Detect a function's runtime from the files under `dir`.
///
/// Ignored directories (`node_modules`, `.git`, ...) are pruned from the walk so
/// vendored dependencies cannot influence the result.
pub fn detect(dir: &Path) -> Result<RuntimeKind, RuntimeError> {
  if !dir.is_dir() {
    return Err(RuntimeError::MissingDirectory { dir: dir.to_path_buf() });
  }

  let mut markers = Markers::default();
  let walker = WalkDir::new(dir)
    .into_iter()
    .filter_entry(|e| e.depth() == 0 || !(e.file_type().is_dir() && is_ignored_dir_name(e.file_name())));

  for entry in walker.filter_map(Result::ok) {
    if entry.file_type().is_file() {
      markers.record(entry.file_name());
    }
  }

  debug!(dir = %dir.display(), markers = ?markers, "scanned runtime markers");
  markers
    .kind()
    .ok_or_else(|| RuntimeError::DetectionFailed { dir: dir.to_path_buf() })
}

/// Resolve a function's runtime: the declared identifier first, detection as fallback.
pub fn resolve_function(function: &FunctionSpec) -> Result<RuntimeKind, RuntimeError> {
  if let Some(declared) = &function.runtime {
    match resolve(declared) {
      Ok(kind) => return Ok(kind),
      Err(e) => warn!(
        function = %function.name,
        declared = %declared,
        error = %e,
        "declared runtime not supported, trying auto-detect"
      ),
    }
  }

  detect(&function.source_dir)
}
