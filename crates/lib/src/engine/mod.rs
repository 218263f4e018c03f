//! The local hot-reload engine.
//!
//! [`LocalEngine`] owns everything a `local` session needs: the resolved
//! runtime of every function, the build lock, the gateway emulator process,
//! the filesystem watcher and the stop signal. Callers drive it through
//! `&self` methods, so it can be shared behind an `Arc` between the task
//! running the reactor and the one waiting for Ctrl-C.
//!
//! Startup order:
//!
//! 1. [`resolve_runtimes`](LocalEngine::resolve_runtimes), fatal on any failure
//! 2. [`initial_build`](LocalEngine::initial_build), per-function failures only logged
//! 3. [`start_gateway`](LocalEngine::start_gateway)
//! 4. [`register_watches`](LocalEngine::register_watches), per-directory failures only logged
//!
//! [`start`](LocalEngine::start) runs all four; [`run`](LocalEngine::run) then
//! services change events until [`stop`](LocalEngine::stop).

mod reactor;
pub mod types;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use globset::GlobSet;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::build::{BuildCoordinator, BuildOutcome, BuildPolicy, BuildReport, BuildTarget};
use crate::gateway::GatewayProcess;
use crate::project::Project;
use crate::runtime::{self, RuntimeKind};
use crate::staging::StagingArea;
use crate::watch::{ChangeStreams, ChangeWatcher, SourceIndex, scan};

pub use types::{EngineError, EngineEvent, EngineSettings};

/// Buffered notifications per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 64;

pub struct LocalEngine {
  project: Project,
  settings: EngineSettings,
  builds: BuildCoordinator,
  staging: StagingArea,
  index: SourceIndex,
  runtimes: OnceLock<BTreeMap<String, RuntimeKind>>,
  gateway: Mutex<Option<GatewayProcess>>,
  watcher: Mutex<Option<ChangeWatcher>>,
  streams: Mutex<Option<ChangeStreams>>,
  stop: CancellationToken,
  stopped: AtomicBool,
  events: broadcast::Sender<EngineEvent>,
}

impl LocalEngine {
  pub fn new(project: Project, settings: EngineSettings) -> Self {
    let mut index = SourceIndex::new();
    for (name, function) in &project.functions {
      index.insert(function.source_dir.clone(), name);
    }
    let (events, _) = broadcast::channel(EVENT_CAPACITY);

    Self {
      staging: StagingArea::for_project(&project.root),
      project,
      settings,
      builds: BuildCoordinator::new(),
      index,
      runtimes: OnceLock::new(),
      gateway: Mutex::new(None),
      watcher: Mutex::new(None),
      streams: Mutex::new(None),
      stop: CancellationToken::new(),
      stopped: AtomicBool::new(false),
      events,
    }
  }

  pub fn project(&self) -> &Project {
    &self.project
  }

  pub fn settings(&self) -> &EngineSettings {
    &self.settings
  }

  pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
    self.events.subscribe()
  }

  /// Resolve a runtime for every function.
  ///
  /// Resolution happens once per engine; later calls return the first result.
  pub fn resolve_runtimes(&self) -> Result<&BTreeMap<String, RuntimeKind>, EngineError> {
    if let Some(resolved) = self.runtimes.get() {
      return Ok(resolved);
    }

    let mut resolved = BTreeMap::new();
    for (name, function) in &self.project.functions {
      let kind = runtime::resolve_function(function).map_err(|source| EngineError::RuntimeResolution {
        function: name.clone(),
        source,
      })?;
      info!(function = %name, runtime = %kind, "resolved runtime");
      resolved.insert(name.clone(), kind);
    }

    info!(functions = resolved.len(), "resolved runtimes");
    Ok(self.runtimes.get_or_init(|| resolved))
  }

  /// The resolved runtime of `function`, once [`resolve_runtimes`](Self::resolve_runtimes) succeeded.
  pub fn runtime_of(&self, function: &str) -> Option<RuntimeKind> {
    self.runtimes.get()?.get(function).copied()
  }

  /// Build target for `function`, writing its artifact into its source directory.
  pub fn target(&self, function: &str) -> Option<BuildTarget> {
    let spec = self.project.function(function)?;
    let runtime = self.runtime_of(function)?;
    Some(BuildTarget::in_place(function, &spec.source_dir, runtime))
  }

  pub fn targets(&self) -> Result<Vec<BuildTarget>, EngineError> {
    self.resolve_runtimes()?;
    Ok(self.project.functions.keys().filter_map(|name| self.target(name)).collect())
  }

  /// Build every function whose runtime needs it.
  ///
  /// Individual build failures are reported, not returned.
  pub async fn initial_build(&self) -> Result<BuildReport, EngineError> {
    let targets = self.targets()?;
    let report = self.builds.build_all(&targets, BuildPolicy::RequiredOnly).await;

    for build in &report.builds {
      match &build.outcome {
        BuildOutcome::Built { elapsed } => self.publish(EngineEvent::BuildSucceeded {
          function: build.function.clone(),
          runtime: build.runtime,
          elapsed: *elapsed,
        }),
        BuildOutcome::Failed(e) => self.publish(EngineEvent::BuildFailed {
          function: build.function.clone(),
          runtime: build.runtime,
          message: e.to_string(),
        }),
        BuildOutcome::Skipped => {}
      }
    }

    if let Some((function, e)) = report.first_failure() {
      warn!(function, error = %e, failed = report.failed(), "initial build had failures");
    }

    Ok(report)
  }

  /// Launch the gateway emulator. A no-op while one is already running.
  pub async fn start_gateway(&self) -> Result<(), EngineError> {
    if lock(&self.gateway).is_some() {
      debug!("gateway emulator already running");
      return Ok(());
    }

    let process = GatewayProcess::start(&self.settings.gateway).await?;
    let port = process.port();

    // A stop that raced with startup wins.
    if self.is_stopped() {
      let mut process = process;
      process.kill();
      return Ok(());
    }

    *lock(&self.gateway) = Some(process);
    self.publish(EngineEvent::GatewayStarted { port });
    Ok(())
  }

  pub fn gateway_running(&self) -> bool {
    lock(&self.gateway).as_mut().is_some_and(|g| !g.has_exited())
  }

  /// Create the filesystem watcher and register every function's source
  /// directories. Returns how many directories are watched.
  ///
  /// Directories that cannot be watched are logged and skipped.
  pub fn register_watches(&self) -> Result<usize, EngineError> {
    let runtimes = self.resolve_runtimes()?;
    let (mut watcher, streams) = ChangeWatcher::new()?;

    for (name, function) in &self.project.functions {
      let Some(kind) = runtimes.get(name) else {
        continue;
      };
      let patterns = kind.watch_matcher().unwrap_or_else(|e| {
        warn!(function = %name, runtime = %kind, error = %e, "invalid watch patterns");
        GlobSet::empty()
      });

      for dir in scan::watch_dirs(&function.source_dir, &patterns) {
        if let Err(e) = watcher.watch_dir(&dir) {
          warn!(function = %name, error = %e, "directory not watched");
        }
      }
    }

    let watched = watcher.watched().count();
    info!(directories = watched, "watching for changes");

    *lock(&self.watcher) = Some(watcher);
    *lock(&self.streams) = Some(streams);
    Ok(watched)
  }

  pub fn watched_dirs(&self) -> Vec<std::path::PathBuf> {
    lock(&self.watcher)
      .as_ref()
      .map(|w| w.watched().map(|p| p.to_path_buf()).collect())
      .unwrap_or_default()
  }

  /// Run the startup sequence.
  pub async fn start(&self) -> Result<(), EngineError> {
    self.resolve_runtimes()?;
    self.initial_build().await?;
    self.start_gateway().await?;
    self.register_watches()?;
    Ok(())
  }

  /// Service change events until [`stop`](Self::stop) is called.
  ///
  /// Fails with [`EngineError::WatcherStreamClosed`] when the watcher goes away
  /// without a stop, and with [`EngineError::NotStarted`] when there are no
  /// watches to service.
  pub async fn run(&self) -> Result<(), EngineError> {
    let streams = lock(&self.streams).take().ok_or(EngineError::NotStarted)?;
    self.run_reactor(streams).await
  }

  /// Signal the reactor to exit, kill the gateway emulator and release the
  /// watcher. Safe to call any number of times; never waits.
  pub fn stop(&self) {
    if self.stopped.swap(true, Ordering::SeqCst) {
      debug!("engine already stopped");
      return;
    }

    self.stop.cancel();
    if let Some(mut gateway) = lock(&self.gateway).take() {
      gateway.kill();
    }
    drop(lock(&self.watcher).take());
    drop(lock(&self.streams).take());

    info!("engine stopped");
    self.publish(EngineEvent::Stopped);
  }

  pub fn is_stopped(&self) -> bool {
    self.stopped.load(Ordering::SeqCst)
  }

  fn publish(&self, event: EngineEvent) {
    // No subscribers is fine.
    let _ = self.events.send(event);
  }
}

impl Drop for LocalEngine {
  fn drop(&mut self) {
    self.stop();
  }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
