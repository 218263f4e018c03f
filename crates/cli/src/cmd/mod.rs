mod build;
mod detect;
mod doctor;
mod local;
mod validate;

pub use build::cmd_build;
pub use detect::cmd_detect;
pub use doctor::cmd_doctor;
pub use local::{LocalOptions, cmd_local};
pub use validate::cmd_validate;

use std::path::Path;

use anyhow::{Context, Result};
use hotfn_lib::project::{self, Project};

/// Load and validate the project file at `config`.
pub(crate) fn load_project(config: &Path) -> Result<Project> {
  project::load(config).with_context(|| format!("Failed to load project file {}", config.display()))
}
