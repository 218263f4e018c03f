//! Implementation of the `hotfn local` command.
//!
//! Runs the engine until Ctrl-C: initial build, gateway emulator, then
//! rebuilds on every settled change. One line is printed per build outcome.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

use hotfn_lib::engine::{EngineEvent, EngineSettings, LocalEngine};

use super::load_project;
use crate::output::{print_build_failed, print_built, print_info, print_success, print_warning, symbols};

pub struct LocalOptions {
  pub port: u16,
  pub debounce: Duration,
  pub template: Option<PathBuf>,
  pub gateway_bin: String,
}

pub fn cmd_local(config: &Path, options: LocalOptions) -> Result<()> {
  let project = load_project(config)?;

  let mut settings = EngineSettings::for_project(&project);
  settings.debounce = options.debounce;
  settings.gateway.port = options.port;
  settings.gateway.program = options.gateway_bin;
  if let Some(template) = options.template {
    settings.gateway.template = template;
  }

  debug!(
    port = settings.gateway.port,
    debounce = ?settings.debounce,
    template = %settings.gateway.template.display(),
    program = %settings.gateway.program,
    "local settings"
  );

  print_info(&format!(
    "Starting {} function(s) of {}-{}",
    project.functions.len(),
    project.service,
    project.stage
  ));

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  rt.block_on(run(LocalEngine::new(project, settings)))
}

async fn run(engine: LocalEngine) -> Result<()> {
  let engine = Arc::new(engine);
  let printer = tokio::spawn(print_events(engine.subscribe()));

  let interrupt = tokio::spawn({
    let engine = Arc::clone(&engine);
    async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        println!();
        print_info("Shutting down");
      }
      engine.stop();
    }
  });

  if let Err(e) = engine.start().await {
    interrupt.abort();
    engine.stop();
    let _ = printer.await;
    return Err(e).context("Failed to start local environment");
  }

  print_info("Watching for changes. Press Ctrl-C to stop.");
  let result = engine.run().await;

  interrupt.abort();
  engine.stop();
  let _ = printer.await;

  result.context("Change watcher failed")
}

async fn print_events(mut events: broadcast::Receiver<EngineEvent>) {
  loop {
    match events.recv().await {
      Ok(EngineEvent::BuildSucceeded {
        function,
        runtime,
        elapsed,
      }) => print_built(&function, runtime, elapsed),
      Ok(EngineEvent::BuildFailed {
        function,
        runtime,
        message,
      }) => print_build_failed(&function, runtime, &message),
      Ok(EngineEvent::RebuildTriggered { functions }) => print_info(&format!(
        "Change detected {} rebuilding {}",
        symbols::ARROW,
        functions.join(", ")
      )),
      Ok(EngineEvent::GatewayStarted { port }) => {
        print_success(&format!("Gateway emulator listening on http://127.0.0.1:{port}"))
      }
      Ok(EngineEvent::Stopped) | Err(RecvError::Closed) => break,
      Err(RecvError::Lagged(missed)) => print_warning(&format!("{missed} notification(s) not shown")),
    }
  }
}
