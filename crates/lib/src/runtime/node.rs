//! Manifest-with-lockfile runtime: Node.js functions with an optional `package.json`.

use std::path::Path;

use tracing::{debug, info};

use crate::build::BuildError;
use crate::build::exec::run_tool;
use crate::runtime::Toolchain;

pub(super) const MANIFEST: &str = "package.json";
pub(super) const WATCH_PATTERNS: &[&str] = &["*.js", "*.ts", "package.json", "tsconfig.json"];

/// Install dependencies next to the sources when a manifest is present.
pub(super) async fn build(source_dir: &Path, _output_dir: &Path) -> Result<(), BuildError> {
  if !source_dir.join(MANIFEST).is_file() {
    debug!(source = %source_dir.display(), "no package.json, nothing to install");
    return Ok(());
  }

  info!(source = %source_dir.display(), "installing node dependencies");
  run_tool(Toolchain::Npm, ["install"], source_dir, &[]).await?;
  Ok(())
}
