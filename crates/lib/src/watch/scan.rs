//! Explicit source-tree walk for watch registration.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use globset::GlobSet;
use walkdir::WalkDir;

use crate::watch::ignore::{is_ignored_dir_name, is_ignored_file_name};

/// Directories to watch for a function: its source root, every directory below
/// it holding a file that matches `patterns`, and the directories in between.
/// Ignored directories are pruned.
pub fn watch_dirs(source_root: &Path, patterns: &GlobSet) -> Vec<PathBuf> {
  let mut dirs = BTreeSet::new();
  dirs.insert(source_root.to_path_buf());

  let walker = WalkDir::new(source_root)
    .into_iter()
    .filter_entry(|e| e.depth() == 0 || !(e.file_type().is_dir() && is_ignored_dir_name(e.file_name())));

  for entry in walker.filter_map(Result::ok) {
    if entry.file_type().is_file()
      && patterns.is_match(entry.file_name())
      && let Some(parent) = entry.path().parent()
    {
      for dir in parent.ancestors().take_while(|d| d.starts_with(source_root)) {
        if !dirs.insert(dir.to_path_buf()) {
          break;
        }
      }
    }
  }

  dirs.into_iter().collect()
}

/// Everything below a newly created directory: the directories to watch
/// (including `dir` itself) and the files already present.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Subtree {
  pub dirs: Vec<PathBuf>,
  pub files: Vec<PathBuf>,
}

pub fn subtree(dir: &Path) -> Subtree {
  let mut tree = Subtree::default();
  let walker = WalkDir::new(dir)
    .sort_by_file_name()
    .into_iter()
    .filter_entry(|e| e.depth() == 0 || !(e.file_type().is_dir() && is_ignored_dir_name(e.file_name())));

  for entry in walker.filter_map(Result::ok) {
    if entry.file_type().is_dir() {
      tree.dirs.push(entry.into_path());
    } else if entry.file_type().is_file() && !is_ignored_file_name(entry.file_name()) {
      tree.files.push(entry.into_path());
    }
  }
  tree
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::runtime::RuntimeKind;
  use crate::util::testutil::write_function;
  use tempfile::TempDir;

  #[test]
  fn collects_directories_with_matching_files() {
    let temp = TempDir::new().unwrap();
    let dir = write_function(
      temp.path(),
      "api",
      &[
        ("main.go", ""),
        ("internal/db/db.go", ""),
        ("docs/README.md", ""),
        ("vendor-cache/node_modules/x/y.go", ""),
      ],
    );

    let dirs = watch_dirs(&dir, &RuntimeKind::Go.watch_matcher().unwrap());

    assert_eq!(dirs, vec![dir.clone(), dir.join("internal"), dir.join("internal/db")]);
  }

  #[test]
  fn subtree_lists_nested_directories_and_files() {
    let temp = TempDir::new().unwrap();
    let dir = write_function(
      temp.path(),
      "api",
      &[("a/b/c.go", ""), ("a/b/c.go.swp", ""), ("a/.git/HEAD", ""), ("a/notes.md", "")],
    );
    let top = dir.join("a");

    let tree = subtree(&top);

    assert_eq!(tree.dirs, vec![top.clone(), top.join("b")]);
    assert_eq!(tree.files, vec![top.join("b/c.go"), top.join("notes.md")]);
  }

  #[test]
  fn subtree_of_empty_directory_has_no_files() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("empty");
    std::fs::create_dir(&dir).unwrap();
    assert_eq!(subtree(&dir), Subtree { dirs: vec![dir.clone()], files: vec![] });
  }

  #[test]
  fn source_root_is_always_watched() {
    let temp = TempDir::new().unwrap();
    let dir = write_function(temp.path(), "empty", &[]);
    assert_eq!(watch_dirs(&dir, &RuntimeKind::Python.watch_matcher().unwrap()), vec![dir]);
  }
}
