//! Build coordination.
//!
//! Every build, whether part of the startup pass or an incremental rebuild,
//! runs under one engine-wide lock. Toolchains share caches and working
//! directories, so builds are serialized rather than run in parallel.
//! A failing function never stops the others from being attempted.

pub mod exec;
pub mod types;

use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{error, info};

pub use types::{BuildError, BuildOutcome, BuildPolicy, BuildReport, BuildTarget, FunctionBuild};

#[derive(Debug, Default)]
pub struct BuildCoordinator {
  lock: Mutex<()>,
}

impl BuildCoordinator {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build every target selected by `policy`, in order.
  ///
  /// The lock is held for the whole pass. Failures are recorded per function;
  /// all remaining targets are still attempted.
  pub async fn build_all(&self, targets: &[BuildTarget], policy: BuildPolicy) -> BuildReport {
    let _guard = self.lock.lock().await;
    let mut report = BuildReport::default();

    for target in targets {
      let outcome = if policy.includes(target.runtime) {
        match build_locked(target).await {
          Ok(elapsed) => BuildOutcome::Built { elapsed },
          Err(e) => BuildOutcome::Failed(e),
        }
      } else {
        info!(function = %target.function, runtime = %target.runtime, "skipping build");
        BuildOutcome::Skipped
      };

      report.builds.push(FunctionBuild {
        function: target.function.clone(),
        runtime: target.runtime,
        outcome,
      });
    }

    info!(
      built = report.built(),
      skipped = report.skipped(),
      failed = report.failed(),
      "build pass complete"
    );

    report
  }

  /// Build a single target under the shared lock.
  pub async fn build_one(&self, target: &BuildTarget) -> Result<std::time::Duration, BuildError> {
    let _guard = self.lock.lock().await;
    build_locked(target).await
  }
}

async fn build_locked(target: &BuildTarget) -> Result<std::time::Duration, BuildError> {
  let started = Instant::now();

  match target.runtime.build(&target.source_dir, &target.output_dir).await {
    Ok(()) => {
      let elapsed = started.elapsed();
      info!(
        function = %target.function,
        runtime = %target.runtime,
        output = %target.output_dir.display(),
        elapsed_ms = elapsed.as_millis() as u64,
        "build succeeded"
      );
      Ok(elapsed)
    }
    Err(e) => {
      error!(function = %target.function, runtime = %target.runtime, error = %e, "build failed");
      Err(e)
    }
  }
}
