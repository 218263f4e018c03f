//! Asset staging area.
//!
//! The synthesis step packages each function from `cdk.out/asset.<id>`, where
//! the id is the SHA-256 of the function name. Files created while the engine
//! runs are mirrored there so the gateway sees them without a re-synthesis.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::consts::{ASSET_DIR_PREFIX, SYNTH_OUT_DIR};
use crate::util::hash::{ContentHash, hash_bytes, hash_file};

#[derive(Debug, Clone)]
pub struct StagingArea {
  root: PathBuf,
}

impl StagingArea {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// The staging area of the project rooted at `project_root`.
  pub fn for_project(project_root: &Path) -> Self {
    Self::new(project_root.join(SYNTH_OUT_DIR))
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Staging id of a function.
  pub fn asset_id(function: &str) -> ContentHash {
    hash_bytes(function.as_bytes())
  }

  pub fn asset_dir(&self, function: &str) -> PathBuf {
    self.root.join(format!("{ASSET_DIR_PREFIX}{}", Self::asset_id(function)))
  }

  /// Mirror `path` (inside `source_dir`) into the function's asset directory,
  /// keeping its relative location, permissions and modification time.
  ///
  /// Returns the destination, or `None` when there was nothing to copy: the
  /// path lies outside `source_dir`, is not a regular file, or the staged copy
  /// already has identical contents.
  pub fn sync_file(&self, function: &str, source_dir: &Path, path: &Path) -> io::Result<Option<PathBuf>> {
    let Ok(relative) = path.strip_prefix(source_dir) else {
      trace!(path = %path.display(), "outside source directory, not staged");
      return Ok(None);
    };

    let metadata = fs::metadata(path)?;
    if !metadata.is_file() {
      return Ok(None);
    }

    let dest = self.asset_dir(function).join(relative);
    if dest.is_file() && hash_file(&dest)? == hash_file(path)? {
      trace!(path = %dest.display(), "staged copy up to date");
      return Ok(None);
    }

    if let Some(parent) = dest.parent() {
      fs::create_dir_all(parent)?;
    }
    let mut reader = fs::File::open(path)?;
    let mut writer = fs::File::create(&dest)?;
    io::copy(&mut reader, &mut writer)?;
    if let Ok(modified) = metadata.modified() {
      writer.set_modified(modified)?;
    }
    drop(writer);
    fs::set_permissions(&dest, metadata.permissions())?;

    debug!(function, from = %path.display(), to = %dest.display(), "staged file");
    Ok(Some(dest))
  }

  /// Re-sync `path` only if a staged copy of it already exists.
  ///
  /// Creation events can arrive before the writer has flushed any content;
  /// the follow-up modification brings the staged copy up to date.
  pub fn refresh_file(&self, function: &str, source_dir: &Path, path: &Path) -> io::Result<Option<PathBuf>> {
    let Ok(relative) = path.strip_prefix(source_dir) else {
      return Ok(None);
    };
    if !self.asset_dir(function).join(relative).is_file() {
      return Ok(None);
    }
    self.sync_file(function, source_dir, path)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::{Duration, SystemTime};
  use tempfile::TempDir;

  #[test]
  fn asset_dir_is_keyed_by_function_name_hash() {
    let staging = StagingArea::for_project(Path::new("/p"));
    assert_eq!(
      staging.asset_dir("hello"),
      PathBuf::from("/p/cdk.out/asset.2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
    );
  }

  #[test]
  fn sync_copies_preserving_relative_path_and_mtime() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("fn");
    fs::create_dir_all(source.join("lib")).unwrap();
    let file = source.join("lib/util.go");
    fs::write(&file, "package lib\n").unwrap();
    let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    fs::File::options().write(true).open(&file).unwrap().set_modified(mtime).unwrap();

    let staging = StagingArea::for_project(temp.path());
    let dest = staging.sync_file("hello", &source, &file).unwrap().unwrap();

    assert_eq!(dest, staging.asset_dir("hello").join("lib/util.go"));
    assert_eq!(fs::read_to_string(&dest).unwrap(), "package lib\n");
    assert_eq!(fs::metadata(&dest).unwrap().modified().unwrap(), mtime);
  }

  #[cfg(unix)]
  #[test]
  fn sync_preserves_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let source = temp.path().join("fn");
    fs::create_dir_all(&source).unwrap();
    let file = source.join("run.sh");
    fs::write(&file, "#!/bin/sh\n").unwrap();
    fs::set_permissions(&file, fs::Permissions::from_mode(0o750)).unwrap();

    let staging = StagingArea::for_project(temp.path());
    let dest = staging.sync_file("hello", &source, &file).unwrap().unwrap();

    assert_eq!(fs::metadata(dest).unwrap().permissions().mode() & 0o777, 0o750);
  }

  #[test]
  fn sync_skips_identical_content() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("fn");
    fs::create_dir_all(&source).unwrap();
    let file = source.join("main.go");
    fs::write(&file, "package main\n").unwrap();

    let staging = StagingArea::for_project(temp.path());
    assert!(staging.sync_file("hello", &source, &file).unwrap().is_some());
    assert!(staging.sync_file("hello", &source, &file).unwrap().is_none());
  }

  #[test]
  fn refresh_only_touches_staged_files() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("fn");
    fs::create_dir_all(&source).unwrap();
    let file = source.join("main.go");
    fs::write(&file, "").unwrap();

    let staging = StagingArea::for_project(temp.path());
    assert!(staging.refresh_file("hello", &source, &file).unwrap().is_none());

    let dest = staging.sync_file("hello", &source, &file).unwrap().unwrap();
    fs::write(&file, "package main\n").unwrap();
    assert_eq!(staging.refresh_file("hello", &source, &file).unwrap(), Some(dest.clone()));
    assert_eq!(fs::read_to_string(dest).unwrap(), "package main\n");
  }

  #[test]
  fn sync_ignores_directories_and_foreign_paths() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("fn");
    fs::create_dir_all(source.join("sub")).unwrap();

    let staging = StagingArea::for_project(temp.path());
    assert!(staging.sync_file("hello", &source, &source.join("sub")).unwrap().is_none());
    assert!(staging.sync_file("hello", &source, Path::new("/elsewhere/x.go")).unwrap().is_none());
  }
}
