//! Gateway emulator supervision.
//!
//! The emulator (`sam local start-api` by default) serves the synthesized
//! template on a local port and loads function artifacts straight from disk,
//! so rebuilt binaries are picked up without restarting it.

use std::collections::VecDeque;
use std::io;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::consts::{DEFAULT_GATEWAY_PORT, DEFAULT_GATEWAY_PROGRAM, DEFAULT_STARTUP_GRACE, ENV_FILE, SYNTH_OUT_DIR};
use crate::project::Project;

/// Lines of emulator stderr kept for error reports.
const STDERR_TAIL: usize = 40;

#[derive(Debug, Error)]
pub enum GatewayError {
  #[error("template not found at {}; run the synthesis step first", path.display())]
  TemplateMissing { path: PathBuf },

  #[error("port {port} is already in use")]
  PortInUse { port: u16 },

  #[error("gateway emulator '{program}' not found on PATH")]
  ProgramNotFound {
    program: String,
    #[source]
    source: which::Error,
  },

  #[error("failed to spawn gateway emulator: {0}")]
  Spawn(#[source] io::Error),

  #[error("gateway emulator exited during startup with exit code {code:?}\n{stderr}")]
  ExitedEarly { code: Option<i32>, stderr: String },
}

#[derive(Debug, Clone)]
pub struct GatewaySettings {
  pub program: String,
  pub template: PathBuf,
  pub env_file: PathBuf,
  pub stage: String,
  pub port: u16,
  pub warm_containers: String,
  /// How long the process must stay up before startup counts as successful.
  pub startup_grace: Duration,
}

impl GatewaySettings {
  /// Defaults for `project`: the template written by synthesis and `env.json`
  /// next to the project file.
  pub fn for_project(project: &Project) -> Self {
    Self {
      program: DEFAULT_GATEWAY_PROGRAM.to_string(),
      template: default_template(&project.root, &project.service, &project.stage),
      env_file: project.root.join(ENV_FILE),
      stage: project.stage.clone(),
      port: DEFAULT_GATEWAY_PORT,
      warm_containers: "EAGER".to_string(),
      startup_grace: DEFAULT_STARTUP_GRACE,
    }
  }

  /// Arguments passed to the emulator program.
  pub fn command_args(&self, with_env_file: bool) -> Vec<String> {
    let mut args = vec![
      "local".to_string(),
      "start-api".to_string(),
      "--template".to_string(),
      self.template.display().to_string(),
      "--port".to_string(),
      self.port.to_string(),
      "--warm-containers".to_string(),
      self.warm_containers.clone(),
    ];
    if with_env_file {
      args.push("--env-vars".to_string());
      args.push(self.env_file.display().to_string());
    }
    args
  }
}

pub fn default_template(root: &Path, service: &str, stage: &str) -> PathBuf {
  root.join(SYNTH_OUT_DIR).join(format!("{service}-{stage}.template.json"))
}

/// Write the default parameters file unless one exists.
///
/// Returns whether a parameters file is available afterwards. Write failures
/// are logged and otherwise ignored.
pub fn ensure_env_file(path: &Path, stage: &str) -> bool {
  if path.exists() {
    return true;
  }

  let defaults = json!({
    "Parameters": {
      "STAGE": stage,
      "REGION": "us-east-1",
      "IS_PROD": "false",
    }
  });

  let written = serde_json::to_string_pretty(&defaults)
    .map_err(io::Error::other)
    .and_then(|body| std::fs::write(path, body + "\n"));

  match written {
    Ok(()) => {
      info!(path = %path.display(), "created default parameters file");
      true
    }
    Err(e) => {
      warn!(path = %path.display(), error = %e, "could not write parameters file");
      false
    }
  }
}

/// A running emulator process. Dropping it kills the process.
#[derive(Debug)]
pub struct GatewayProcess {
  child: Child,
  port: u16,
  forwarders: Vec<JoinHandle<()>>,
}

impl GatewayProcess {
  pub async fn start(settings: &GatewaySettings) -> Result<Self, GatewayError> {
    if !settings.template.is_file() {
      return Err(GatewayError::TemplateMissing {
        path: settings.template.clone(),
      });
    }

    let with_env_file = ensure_env_file(&settings.env_file, &settings.stage);

    check_port(settings.port)?;

    let program = which::which(&settings.program).map_err(|source| GatewayError::ProgramNotFound {
      program: settings.program.clone(),
      source,
    })?;

    let args = settings.command_args(with_env_file);
    info!(program = %program.display(), port = settings.port, "starting gateway emulator");
    debug!(args = ?args, "gateway arguments");

    let mut child = Command::new(&program)
      .args(&args)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()
      .map_err(GatewayError::Spawn)?;

    let tail = Arc::new(Mutex::new(VecDeque::with_capacity(STDERR_TAIL)));
    let mut forwarders = Vec::new();
    if let Some(stdout) = child.stdout.take() {
      forwarders.push(tokio::spawn(forward_lines(stdout, None)));
    }
    if let Some(stderr) = child.stderr.take() {
      forwarders.push(tokio::spawn(forward_lines(stderr, Some(Arc::clone(&tail)))));
    }

    let exited = tokio::select! {
      status = child.wait() => Some(status),
      () = tokio::time::sleep(settings.startup_grace) => None,
    };

    if let Some(status) = exited {
      for forwarder in forwarders {
        let _ = tokio::time::timeout(Duration::from_secs(1), forwarder).await;
      }
      let stderr = tail
        .lock()
        .map(|lines| lines.iter().cloned().collect::<Vec<_>>().join("\n"))
        .unwrap_or_default();
      return Err(GatewayError::ExitedEarly {
        code: status.ok().and_then(|s| s.code()),
        stderr,
      });
    }

    info!(port = settings.port, pid = ?child.id(), "gateway emulator running");
    Ok(Self {
      child,
      port: settings.port,
      forwarders,
    })
  }

  pub fn port(&self) -> u16 {
    self.port
  }

  pub fn id(&self) -> Option<u32> {
    self.child.id()
  }

  /// Whether the process has exited, without waiting.
  pub fn has_exited(&mut self) -> bool {
    !matches!(self.child.try_wait(), Ok(None))
  }

  /// Send a kill signal without waiting for the process to exit.
  pub fn kill(&mut self) {
    match self.child.start_kill() {
      Ok(()) => info!(pid = ?self.child.id(), "stopped gateway emulator"),
      Err(e) => debug!(error = %e, "gateway emulator already gone"),
    }
    for forwarder in &self.forwarders {
      forwarder.abort();
    }
  }
}

fn check_port(port: u16) -> Result<(), GatewayError> {
  match TcpListener::bind(("127.0.0.1", port)) {
    Ok(_) => Ok(()),
    Err(e) if e.kind() == io::ErrorKind::AddrInUse => Err(GatewayError::PortInUse { port }),
    Err(e) => {
      debug!(port, error = %e, "port probe failed");
      Ok(())
    }
  }
}

async fn forward_lines<R>(reader: R, tail: Option<Arc<Mutex<VecDeque<String>>>>)
where
  R: AsyncRead + Unpin,
{
  let mut lines = BufReader::new(reader).lines();
  while let Ok(Some(line)) = lines.next_line().await {
    debug!(target: "hotfn::gateway", "{line}");
    if let Some(tail) = &tail
      && let Ok(mut buffer) = tail.lock()
    {
      if buffer.len() == STDERR_TAIL {
        buffer.pop_front();
      }
      buffer.push_back(line);
    }
  }
}
