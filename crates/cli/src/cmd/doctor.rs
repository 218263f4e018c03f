//! Implementation of the `hotfn doctor` command.
//!
//! Reports the host platform, the fixed function target, and whether each
//! external program the engine may run can be found.

use anyhow::Result;
use serde::Serialize;

use hotfn_lib::consts::DEFAULT_GATEWAY_PROGRAM;
use hotfn_lib::platform::{FUNCTION_TARGET, platform_triple};
use hotfn_lib::runtime::Toolchain;

use crate::output::{print_json, print_stat, print_success, print_warning};

#[derive(Debug, Serialize)]
struct Tool {
  name: String,
  path: Option<String>,
}

#[derive(Debug, Serialize)]
struct Report {
  host: Option<String>,
  target: String,
  tools: Vec<Tool>,
}

pub fn cmd_doctor(json: bool) -> Result<()> {
  let mut tools: Vec<Tool> = Toolchain::ALL
    .iter()
    .map(|tool| Tool {
      name: tool.binary_name().to_string(),
      path: tool.locate().ok().map(|p| p.display().to_string()),
    })
    .collect();
  tools.push(Tool {
    name: DEFAULT_GATEWAY_PROGRAM.to_string(),
    path: which::which(DEFAULT_GATEWAY_PROGRAM).ok().map(|p| p.display().to_string()),
  });

  let report = Report {
    host: platform_triple(),
    target: FUNCTION_TARGET.triple(),
    tools,
  };

  if json {
    return print_json(&report);
  }

  println!("System:");
  print_stat("Host", report.host.as_deref().unwrap_or("unknown"));
  print_stat("Target", &report.target);
  println!();
  println!("Tools:");
  for tool in &report.tools {
    match &tool.path {
      Some(path) => print_success(&format!("{} {path}", tool.name)),
      None => print_warning(&format!("{} not found on PATH", tool.name)),
    }
  }

  Ok(())
}
