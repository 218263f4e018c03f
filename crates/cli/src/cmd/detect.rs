//! Implementation of the `hotfn detect` command.
//!
//! Shows how each function would be built and run without building anything.

use std::path::Path;

use anyhow::{Result, bail};
use serde::Serialize;

use hotfn_lib::runtime::{self, RuntimeKind};
use hotfn_lib::staging::StagingArea;

use super::load_project;
use crate::output::{print_error, print_json, print_stat, print_success, truncate_hash};

#[derive(Debug, Serialize)]
struct Detection {
  function: String,
  runtime: String,
  needs_build: bool,
  toolchain: String,
  start_command: Vec<String>,
  asset_id: String,
}

pub fn cmd_detect(config: &Path, json: bool) -> Result<()> {
  let project = load_project(config)?;

  let mut detections = Vec::new();
  let mut failures = 0;
  for (name, function) in &project.functions {
    match runtime::resolve_function(function) {
      Ok(kind) => detections.push(describe(name, kind, &kind.artifact_path(function))),
      Err(e) => {
        failures += 1;
        print_error(&format!("{name}: {e}"));
      }
    }
  }

  if json {
    print_json(&detections)?;
  } else {
    for detection in &detections {
      print_success(&format!("{} {}", detection.function, detection.runtime));
      print_stat("Build", if detection.needs_build { "required" } else { "none" });
      print_stat("Toolchain", &detection.toolchain);
      print_stat("Start", &detection.start_command.join(" "));
      print_stat("Asset", truncate_hash(&detection.asset_id));
    }
  }

  if failures > 0 {
    bail!("{failures} function(s) have no usable runtime");
  }
  Ok(())
}

fn describe(name: &str, kind: RuntimeKind, artifact: &Path) -> Detection {
  Detection {
    function: name.to_string(),
    runtime: kind.name().to_string(),
    needs_build: kind.needs_build(),
    toolchain: kind.toolchain().binary_name().to_string(),
    start_command: kind.start_command(artifact),
    asset_id: StagingArea::asset_id(name).0,
  }
}
