//! The reactor loop.
//!
//! One task selects over the stop signal, the debounce deadline, change
//! events and watcher errors, handling one ready source at a time. Rebuilds
//! run inline, so a slow build delays the next batch of events.

use std::path::Path;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use super::{EngineError, EngineEvent, LocalEngine, lock};
use crate::watch::{ChangeStreams, Debouncer, is_ignored, scan};

impl LocalEngine {
  pub(crate) async fn run_reactor(&self, mut streams: ChangeStreams) -> Result<(), EngineError> {
    let mut debouncer = Debouncer::new(self.settings.debounce);
    info!(debounce = ?self.settings.debounce, "reactor running");

    loop {
      let deadline = debouncer.deadline();

      tokio::select! {
        biased;

        () = self.stop.cancelled() => {
          debug!("reactor stopping");
          return Ok(());
        }

        () = async {
          match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
          }
        } => {
          if let Some(functions) = debouncer.fire(Instant::now()) {
            self.rebuild(functions).await;
          }
        }

        event = streams.events.recv() => match event {
          Some(event) => self.handle_event(&event, &mut debouncer),
          None => return Err(EngineError::WatcherStreamClosed),
        },

        error = streams.errors.recv() => match error {
          Some(e) => warn!(error = %e, "filesystem watcher error"),
          None => return Err(EngineError::WatcherStreamClosed),
        },
      }
    }
  }

  fn handle_event(&self, event: &Event, debouncer: &mut Debouncer) {
    match event.kind {
      EventKind::Access(_) | EventKind::Modify(ModifyKind::Metadata(_)) => return,
      _ => {}
    }

    for (index, path) in event.paths.iter().enumerate() {
      if is_ignored(&self.project.root, path) {
        trace!(path = %path.display(), "ignored");
        continue;
      }
      let Some(function) = self.index.owner_of(path) else {
        trace!(path = %path.display(), "no owning function");
        continue;
      };

      let changed = match classify(&event.kind, index, path) {
        Change::Created => self.on_created(function, path),
        Change::Modified => {
          self.refresh_staged(function, path);
          true
        }
        Change::Other => true,
      };
      if !changed {
        trace!(function, path = %path.display(), "empty directory created");
        continue;
      }
      debug!(function, path = %path.display(), kind = ?event.kind, "change");
      debouncer.record(function, Instant::now());
    }
  }

  /// Watch a new directory and everything below it; mirror new files into
  /// the staging area. Returns false for a directory holding no files.
  fn on_created(&self, function: &str, path: &Path) -> bool {
    if !path.is_dir() {
      self.stage(function, path);
      return true;
    }

    let tree = scan::subtree(path);
    if let Some(watcher) = lock(&self.watcher).as_mut() {
      for dir in &tree.dirs {
        if let Err(e) = watcher.watch_dir(dir) {
          warn!(function, error = %e, "new directory not watched");
        }
      }
    }
    for file in &tree.files {
      self.stage(function, file);
    }
    !tree.files.is_empty()
  }

  fn stage(&self, function: &str, path: &Path) {
    let Some(spec) = self.project.function(function) else {
      return;
    };
    if let Err(e) = self.staging.sync_file(function, &spec.source_dir, path) {
      warn!(function, path = %path.display(), error = %e, "failed to stage new file");
    }
  }

  fn refresh_staged(&self, function: &str, path: &Path) {
    let Some(spec) = self.project.function(function) else {
      return;
    };
    if let Err(e) = self.staging.refresh_file(function, &spec.source_dir, path) {
      debug!(function, path = %path.display(), error = %e, "staged copy not refreshed");
    }
  }

  /// Rebuild each function of a fired batch in turn. A failure is reported
  /// and the rest of the batch still runs.
  async fn rebuild(&self, functions: Vec<String>) {
    info!(functions = ?functions, "changes settled, rebuilding");
    self.publish(EngineEvent::RebuildTriggered {
      functions: functions.clone(),
    });

    for name in &functions {
      let Some(target) = self.target(name) else {
        warn!(function = %name, "no build target");
        continue;
      };
      if !target.runtime.needs_build() {
        debug!(function = %name, runtime = %target.runtime, "no build needed");
        continue;
      }

      let event = match self.builds.build_one(&target).await {
        Ok(elapsed) => EngineEvent::BuildSucceeded {
          function: name.clone(),
          runtime: target.runtime,
          elapsed,
        },
        Err(e) => EngineEvent::BuildFailed {
          function: name.clone(),
          runtime: target.runtime,
          message: e.to_string(),
        },
      };
      self.publish(event);
    }
  }
}

enum Change {
  Created,
  Modified,
  Other,
}

/// What an event means for its `index`-th path. Files moved into a watched
/// directory count as created; for a two-path rename the second path is the target.
fn classify(kind: &EventKind, index: usize, path: &Path) -> Change {
  match kind {
    EventKind::Create(_) => Change::Created,
    EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Change::Created,
    EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if index == 1 => Change::Created,
    EventKind::Modify(ModifyKind::Name(RenameMode::Any)) if path.exists() => Change::Created,
    EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => Change::Modified,
    _ => Change::Other,
  }
}
