//! Implementation of the `hotfn build` command.

use std::path::Path;

use anyhow::{Context, Result, bail};

use hotfn_lib::build::{BuildCoordinator, BuildOutcome, BuildPolicy};
use hotfn_lib::engine::{EngineSettings, LocalEngine};

use super::load_project;
use crate::output::{print_build_failed, print_built, print_info, print_stat};

/// Resolve runtimes and run one build pass.
///
/// Without `--all` only compiled functions are built; with it, dependency
/// installs run for interpreted functions too. Fails when any build fails.
pub fn cmd_build(config: &Path, all: bool, function: Option<&str>) -> Result<()> {
  let project = load_project(config)?;
  let settings = EngineSettings::for_project(&project);
  let engine = LocalEngine::new(project, settings);

  let mut targets = engine.targets().context("Failed to resolve runtimes")?;
  if let Some(name) = function {
    targets.retain(|t| t.function == name);
    if targets.is_empty() {
      bail!("Unknown function '{name}'");
    }
  }

  let policy = if all { BuildPolicy::Everything } else { BuildPolicy::RequiredOnly };

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt.block_on(BuildCoordinator::new().build_all(&targets, policy));

  for build in &report.builds {
    match &build.outcome {
      BuildOutcome::Built { elapsed } => print_built(&build.function, build.runtime, *elapsed),
      BuildOutcome::Skipped => print_info(&format!("{} ({}) needs no build", build.function, build.runtime)),
      BuildOutcome::Failed(e) => print_build_failed(&build.function, build.runtime, &e.to_string()),
    }
  }

  println!();
  print_stat("Built", &report.built().to_string());
  print_stat("Skipped", &report.skipped().to_string());
  print_stat("Failed", &report.failed().to_string());

  if !report.is_success() {
    bail!("{} build(s) failed", report.failed());
  }
  Ok(())
}
