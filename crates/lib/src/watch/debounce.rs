//! Debounce state machine.
//!
//! Editors and compilers emit several notifications per logical save. Each
//! relevant event adds its function to the pending batch and pushes the
//! deadline out by the debounce delay; only when the delay passes without
//! further events is the batch released.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebounceState {
  Idle,
  /// Functions awaiting a rebuild, in first-seen order, and when to release them.
  Pending { functions: Vec<String>, deadline: Instant },
}

#[derive(Debug)]
pub struct Debouncer {
  delay: Duration,
  state: DebounceState,
}

impl Debouncer {
  pub fn new(delay: Duration) -> Self {
    Self {
      delay,
      state: DebounceState::Idle,
    }
  }

  pub fn state(&self) -> &DebounceState {
    &self.state
  }

  /// Record a change for `function` observed at `now`, re-arming the timer.
  pub fn record(&mut self, function: &str, now: Instant) {
    let deadline = now + self.delay;
    if let DebounceState::Pending {
      functions,
      deadline: armed,
    } = &mut self.state
    {
      if !functions.iter().any(|f| f == function) {
        functions.push(function.to_string());
      }
      *armed = deadline;
      return;
    }

    self.state = DebounceState::Pending {
      functions: vec![function.to_string()],
      deadline,
    };
  }

  /// When the armed timer fires, if any.
  pub fn deadline(&self) -> Option<Instant> {
    match &self.state {
      DebounceState::Idle => None,
      DebounceState::Pending { deadline, .. } => Some(*deadline),
    }
  }

  /// Release the pending batch if its deadline has passed, returning to idle.
  pub fn fire(&mut self, now: Instant) -> Option<Vec<String>> {
    if !self.deadline().is_some_and(|deadline| deadline <= now) {
      return None;
    }

    match std::mem::replace(&mut self.state, DebounceState::Idle) {
      DebounceState::Pending { functions, .. } => Some(functions),
      DebounceState::Idle => None,
    }
  }
}
