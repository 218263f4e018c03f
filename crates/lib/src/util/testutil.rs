//! Test utilities for hotfn-lib.
//!
//! Helpers that lay out function directories and stand in for real toolchains
//! with small shell scripts, so build paths can be exercised without `go`,
//! `npm` or `pip` installed.

use std::fs;
use std::path::{Path, PathBuf};

/// Write an executable `/bin/sh` script named `name` into `dir`.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
  use std::os::unix::fs::PermissionsExt;

  let path = dir.join(name);
  fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
  fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
  path
}

/// A stand-in for `go` that records each invocation in `log`, fails when the
/// working directory contains a `FAIL` file, and otherwise creates the `-o` output.
#[cfg(unix)]
pub fn fake_go(dir: &Path, log: &Path) -> PathBuf {
  let body = format!(
    r#"echo "$PWD $*" >> '{log}'
if [ -f FAIL ]; then
  echo "forced failure" >&2
  exit 1
fi
out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; fi
  shift
done
if [ -n "$out" ]; then
  : > "$out"
  chmod +x "$out"
fi
exit 0"#,
    log = log.display()
  );
  write_script(dir, "fake-go", &body)
}

/// Number of invocations recorded by a fake toolchain.
pub fn invocation_count(log: &Path) -> usize {
  fs::read_to_string(log).map(|s| s.lines().count()).unwrap_or(0)
}

/// Create `root/name` containing a `main.go`.
pub fn write_go_function(root: &Path, name: &str) -> PathBuf {
  write_function(root, name, &[("main.go", "package main\n\nfunc main() {}\n")])
}

/// Create `root/name` with the given relative files.
pub fn write_function(root: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
  let dir = root.join(name);
  fs::create_dir_all(&dir).unwrap();
  for (rel, content) in files {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
  }
  dir
}

/// Run `test` on a fresh runtime with `HOTFN_GO` pointing at `go`.
///
/// Futures are lazy, so the override is in place when the tool is spawned.
pub fn block_on_with_go<F: std::future::Future>(go: &Path, test: F) -> F::Output {
  temp_env::with_var("HOTFN_GO", Some(go), || {
    tokio::runtime::Runtime::new().unwrap().block_on(test)
  })
}
