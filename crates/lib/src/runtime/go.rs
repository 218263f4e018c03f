//! Compiled-source runtime: Go functions cross-compiled to a static binary.

use std::ffi::OsStr;
use std::path::Path;

use tracing::info;

use crate::build::BuildError;
use crate::build::exec::run_tool;
use crate::consts::BOOTSTRAP_BINARY;
use crate::platform::FUNCTION_TARGET;
use crate::runtime::Toolchain;

pub(super) const WATCH_PATTERNS: &[&str] = &["*.go", "go.mod", "go.sum"];

/// Compile the package in `source_dir` to `<output_dir>/bootstrap` for the function target.
pub(super) async fn build(source_dir: &Path, output_dir: &Path) -> Result<(), BuildError> {
  info!(source = %source_dir.display(), target = %FUNCTION_TARGET, "building go function");

  tokio::fs::create_dir_all(output_dir).await?;
  let artifact = output_dir.join(BOOTSTRAP_BINARY);
  let (goos, goarch) = FUNCTION_TARGET.go_env();

  let args = [
    OsStr::new("build"),
    OsStr::new("-o"),
    artifact.as_os_str(),
    OsStr::new("-ldflags"),
    OsStr::new("-s -w"),
    OsStr::new("."),
  ];
  let envs = [("GOOS", goos), ("GOARCH", goarch), ("CGO_ENABLED", "0")];

  run_tool(Toolchain::Go, args, source_dir, &envs).await?;
  Ok(())
}
