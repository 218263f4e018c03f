//! Implementation of the `hotfn validate` command.

use std::path::Path;

use anyhow::Result;

use super::load_project;
use crate::output::{print_stat, print_success, symbols};

pub fn cmd_validate(config: &Path, verbose: bool) -> Result<()> {
  let project = load_project(config)?;

  print_success(&format!("{} is valid", config.display()));
  print_stat("Service", &project.service);
  print_stat("Stage", &project.stage);
  print_stat("Functions", &project.functions.len().to_string());

  if verbose {
    println!();
    for (name, function) in &project.functions {
      println!(
        "  {} {} {} {} ({} MB, {}s, {} event(s))",
        symbols::INFO,
        name,
        symbols::ARROW,
        function.source_dir.display(),
        function.limits.memory_mb,
        function.limits.timeout_secs,
        function.events.len()
      );
    }
  }

  Ok(())
}
