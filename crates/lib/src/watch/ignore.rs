//! Noise filtering for filesystem events.

use std::ffi::OsStr;
use std::path::{Component, Path};

use crate::consts::{BOOTSTRAP_BINARY, SYNTH_OUT_DIR};

/// Directory names whose contents never trigger a rebuild: version control,
/// dependency caches, and build/synthesis output.
pub const IGNORED_DIRS: &[&str] = &[
  ".git",
  ".hg",
  ".svn",
  ".idea",
  "node_modules",
  "__pycache__",
  ".venv",
  SYNTH_OUT_DIR,
  ".aws-sam",
  "tmp",
];

/// Suffixes of editor swap files, temporaries and logs.
pub const IGNORED_SUFFIXES: &[&str] = &["~", ".swp", ".swx", ".tmp", ".log"];

/// Build outputs written into source directories; reacting to them would loop.
pub const IGNORED_FILES: &[&str] = &[BOOTSTRAP_BINARY];

pub fn is_ignored_dir_name(name: &OsStr) -> bool {
  name.to_str().is_some_and(|n| IGNORED_DIRS.contains(&n))
}

pub fn is_ignored_file_name(name: &OsStr) -> bool {
  name
    .to_str()
    .is_some_and(|n| IGNORED_FILES.contains(&n) || IGNORED_SUFFIXES.iter().any(|s| n.ends_with(s)))
}

/// Whether an event for `path` should be dropped before reaching the debouncer.
///
/// Only segments below `root` are considered, so a project living under a
/// directory such as `/tmp` is not ignored wholesale.
pub fn is_ignored(root: &Path, path: &Path) -> bool {
  let relative = path.strip_prefix(root).unwrap_or(path);
  let in_ignored_dir = relative.components().any(|c| match c {
    Component::Normal(name) => is_ignored_dir_name(name),
    _ => false,
  });

  in_ignored_dir || relative.file_name().is_some_and(is_ignored_file_name)
}
