//! Types for the local engine.

use std::time::Duration;

use thiserror::Error;

use crate::consts::DEFAULT_DEBOUNCE;
use crate::gateway::{GatewayError, GatewaySettings};
use crate::project::Project;
use crate::runtime::{RuntimeError, RuntimeKind};
use crate::watch::WatchError;

#[derive(Debug, Error)]
pub enum EngineError {
  #[error("cannot resolve runtime for function '{function}': {source}")]
  RuntimeResolution {
    function: String,
    #[source]
    source: RuntimeError,
  },

  #[error("gateway emulator failed to start: {0}")]
  Gateway(#[from] GatewayError),

  #[error(transparent)]
  Watch(#[from] WatchError),

  #[error("filesystem watcher stream closed unexpectedly")]
  WatcherStreamClosed,

  #[error("engine has not been started")]
  NotStarted,
}

/// Tunables for a [`LocalEngine`](super::LocalEngine) session.
#[derive(Debug, Clone)]
pub struct EngineSettings {
  /// Quiet period after the last change before a rebuild batch fires.
  pub debounce: Duration,
  pub gateway: GatewaySettings,
}

impl EngineSettings {
  pub fn for_project(project: &Project) -> Self {
    Self {
      debounce: DEFAULT_DEBOUNCE,
      gateway: GatewaySettings::for_project(project),
    }
  }
}

/// Notifications for front ends, delivered over a broadcast channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
  BuildSucceeded {
    function: String,
    runtime: RuntimeKind,
    elapsed: Duration,
  },
  BuildFailed {
    function: String,
    runtime: RuntimeKind,
    message: String,
  },
  /// A debounce window closed; these functions are being rebuilt.
  RebuildTriggered { functions: Vec<String> },
  GatewayStarted { port: u16 },
  Stopped,
}
