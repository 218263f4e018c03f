//! Filesystem change observation.
//!
//! [`ChangeWatcher`] owns the OS-level watch registrations and forwards raw
//! notifications into two tokio channels ([`ChangeStreams`]): one for events and
//! one for watcher errors. Interpretation (ignore rules, ownership, debouncing)
//! happens in the engine's reactor; the pieces it uses live in the submodules.

pub mod debounce;
pub mod ignore;
pub mod scan;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, trace};

pub use debounce::{DebounceState, Debouncer};
pub use ignore::is_ignored;

#[derive(Debug, Error)]
pub enum WatchError {
  #[error("failed to initialize filesystem watcher: {0}")]
  Init(#[source] notify::Error),

  #[error("failed to watch {path}: {source}")]
  Register {
    path: PathBuf,
    #[source]
    source: notify::Error,
  },
}

/// Receiving side of a [`ChangeWatcher`].
///
/// Both channels close when the watcher is dropped.
#[derive(Debug)]
pub struct ChangeStreams {
  pub events: mpsc::UnboundedReceiver<Event>,
  pub errors: mpsc::UnboundedReceiver<notify::Error>,
}

impl ChangeStreams {
  /// A stream pair fed by hand instead of by the OS.
  pub fn channel() -> (ChangeSenders, ChangeStreams) {
    let (event_tx, events) = mpsc::unbounded_channel();
    let (error_tx, errors) = mpsc::unbounded_channel();
    (ChangeSenders { event_tx, error_tx }, ChangeStreams { events, errors })
  }
}

/// Sending side of [`ChangeStreams::channel`].
#[derive(Debug, Clone)]
pub struct ChangeSenders {
  pub event_tx: mpsc::UnboundedSender<Event>,
  pub error_tx: mpsc::UnboundedSender<notify::Error>,
}

impl ChangeSenders {
  fn forward(&self, result: notify::Result<Event>) {
    // Send errors only mean the reactor is gone; nothing left to notify.
    match result {
      Ok(event) => {
        let _ = self.event_tx.send(event);
      }
      Err(error) => {
        let _ = self.error_tx.send(error);
      }
    }
  }
}

/// Non-recursive directory watches over the function source trees.
pub struct ChangeWatcher {
  watcher: RecommendedWatcher,
  watched: BTreeSet<PathBuf>,
}

impl ChangeWatcher {
  pub fn new() -> Result<(Self, ChangeStreams), WatchError> {
    let (senders, streams) = ChangeStreams::channel();
    let watcher = RecommendedWatcher::new(
      move |res: notify::Result<Event>| senders.forward(res),
      notify::Config::default(),
    )
    .map_err(WatchError::Init)?;

    Ok((
      Self {
        watcher,
        watched: BTreeSet::new(),
      },
      streams,
    ))
  }

  /// Register `dir`. Returns `false` when it was already watched.
  pub fn watch_dir(&mut self, dir: &Path) -> Result<bool, WatchError> {
    if self.watched.contains(dir) {
      trace!(path = %dir.display(), "already watched");
      return Ok(false);
    }

    self
      .watcher
      .watch(dir, RecursiveMode::NonRecursive)
      .map_err(|source| WatchError::Register {
        path: dir.to_path_buf(),
        source,
      })?;

    debug!(path = %dir.display(), "watching directory");
    self.watched.insert(dir.to_path_buf());
    Ok(true)
  }

  pub fn is_watched(&self, dir: &Path) -> bool {
    self.watched.contains(dir)
  }

  pub fn watched(&self) -> impl Iterator<Item = &Path> {
    self.watched.iter().map(PathBuf::as_path)
  }
}

/// Maps paths back to the function whose source tree contains them.
#[derive(Debug, Clone, Default)]
pub struct SourceIndex {
  roots: BTreeMap<PathBuf, String>,
}

impl SourceIndex {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, source_dir: impl Into<PathBuf>, function: &str) {
    self.roots.insert(source_dir.into(), function.to_string());
  }

  /// The owning function for `path`. Nested source trees resolve to the
  /// deepest root, compared component-wise.
  pub fn owner_of(&self, path: &Path) -> Option<&str> {
    self
      .roots
      .iter()
      .filter(|(root, _)| path.starts_with(root))
      .max_by_key(|(root, _)| root.components().count())
      .map(|(_, name)| name.as_str())
  }

  pub fn roots(&self) -> impl Iterator<Item = (&Path, &str)> {
    self.roots.iter().map(|(root, name)| (root.as_path(), name.as_str()))
  }
}
