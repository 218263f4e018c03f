//! Interpreter-with-requirements runtime: Python functions with an optional `requirements.txt`.

use std::ffi::OsStr;
use std::path::Path;

use tracing::{debug, info};

use crate::build::BuildError;
use crate::build::exec::run_tool;
use crate::runtime::Toolchain;

pub(super) const REQUIREMENTS: &str = "requirements.txt";
pub(super) const WATCH_PATTERNS: &[&str] = &["*.py", "requirements.txt"];

/// Vendor requirements into `output_dir` when a requirements file is present.
pub(super) async fn build(source_dir: &Path, output_dir: &Path) -> Result<(), BuildError> {
  if !source_dir.join(REQUIREMENTS).is_file() {
    debug!(source = %source_dir.display(), "no requirements.txt, nothing to install");
    return Ok(());
  }

  info!(source = %source_dir.display(), "installing python requirements");
  let args = [
    OsStr::new("install"),
    OsStr::new("-r"),
    OsStr::new(REQUIREMENTS),
    OsStr::new("-t"),
    output_dir.as_os_str(),
  ];
  run_tool(Toolchain::Pip, args, source_dir, &[]).await?;
  Ok(())
}
