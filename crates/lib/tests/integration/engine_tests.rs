//! End-to-end engine scenarios.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use hotfn_lib::engine::{EngineError, EngineEvent, LocalEngine};
use hotfn_lib::gateway::GatewayError;
use hotfn_lib::runtime::RuntimeKind;
use serial_test::serial;
use tokio::sync::broadcast;

use super::common::TestProject;

const MAIN_GO: &str = "package main\n\nfunc main() {}\n";

async fn wait_for<F>(events: &mut broadcast::Receiver<EngineEvent>, mut want: F) -> EngineEvent
where
  F: FnMut(&EngineEvent) -> bool,
{
  loop {
    match tokio::time::timeout(Duration::from_secs(10), events.recv()).await {
      Ok(Ok(event)) if want(&event) => return event,
      Ok(Ok(_)) => continue,
      other => panic!("event not observed: {other:?}"),
    }
  }
}

async fn wait_until_watched(engine: &LocalEngine, dir: &Path) {
  for _ in 0..200 {
    if engine.watched_dirs().iter().any(|d| d == dir) {
      return;
    }
    tokio::time::sleep(Duration::from_millis(25)).await;
  }
  panic!("{} never watched", dir.display());
}

#[test]
#[serial]
fn compiled_function_without_declared_runtime_builds_once_at_startup() {
  let project = TestProject::new();
  project.write_file("functions/hello/main.go", MAIN_GO);
  project.write_config(&[("hello", "functions/hello", None)]);
  project.write_template();
  let engine = project.engine();

  project.block_on(async {
    engine.start().await.unwrap();
    assert!(engine.gateway_running());
    engine.stop();
    assert!(!engine.gateway_running());
  });

  assert_eq!(engine.runtime_of("hello"), Some(RuntimeKind::Go));
  assert_eq!(project.go_invocations(), 1);
  assert!(project.root().join("functions/hello/bootstrap").is_file());
  assert!(project.root().join("env.json").is_file());
}

#[test]
#[serial]
fn missing_template_aborts_startup_after_the_build_pass() {
  let project = TestProject::new();
  project.write_file("functions/hello/main.go", MAIN_GO);
  project.write_config(&[("hello", "functions/hello", None)]);
  let engine = project.engine();

  let result = project.block_on(engine.start());

  match result {
    Err(EngineError::Gateway(GatewayError::TemplateMissing { path })) => {
      assert!(path.ends_with("cdk.out/demo-dev.template.json"));
    }
    other => panic!("expected missing template, got {other:?}"),
  }
  assert_eq!(project.go_invocations(), 1);
  assert!(project.root().join("functions/hello/bootstrap").is_file());
}

#[test]
#[serial]
fn every_function_gets_a_runtime_before_any_build() {
  let project = TestProject::new();
  project.write_file("functions/api/main.go", MAIN_GO);
  project.write_file("functions/web/index.js", "exports.handler = async () => ({});\n");
  project.write_file("functions/jobs/app.py", "def handler(event, context):\n    return {}\n");
  project.write_file("functions/legacy/handler.py", "");
  project.write_config(&[
    ("api", "functions/api", None),
    ("web", "functions/web", Some("nodejs20.x")),
    ("jobs", "functions/jobs", Some("python3.12")),
    ("legacy", "functions/legacy", Some("ruby3.2")),
  ]);
  let engine = project.engine();

  let runtimes = engine.resolve_runtimes().unwrap();

  assert_eq!(runtimes.len(), 4);
  assert_eq!(runtimes["api"], RuntimeKind::Go);
  assert_eq!(runtimes["web"], RuntimeKind::Node);
  assert_eq!(runtimes["jobs"], RuntimeKind::Python);
  // Unsupported declaration falls back to detection.
  assert_eq!(runtimes["legacy"], RuntimeKind::Python);
  assert_eq!(project.go_invocations(), 0);
}

#[test]
#[serial]
fn unresolvable_function_aborts_startup_before_building() {
  let project = TestProject::new();
  project.write_file("functions/api/main.go", MAIN_GO);
  project.write_file("functions/docs/README.md", "# docs\n");
  project.write_config(&[("api", "functions/api", None), ("docs", "functions/docs", None)]);
  project.write_template();
  let engine = project.engine();

  let err = project.block_on(engine.start()).unwrap_err();

  assert!(matches!(err, EngineError::RuntimeResolution { ref function, .. } if function == "docs"));
  assert_eq!(project.go_invocations(), 0);
}

#[test]
#[serial]
fn failing_initial_build_does_not_abort_startup() {
  let project = TestProject::new();
  project.write_file("functions/ok/main.go", MAIN_GO);
  project.write_file("functions/broken/main.go", MAIN_GO);
  project.write_file("functions/broken/FAIL", "");
  project.write_config(&[("ok", "functions/ok", None), ("broken", "functions/broken", None)]);
  project.write_template();
  let engine = project.engine();

  let report = project.block_on(async {
    let report = engine.initial_build().await.unwrap();
    engine.start_gateway().await.unwrap();
    engine.stop();
    report
  });

  assert_eq!(report.built(), 1);
  assert_eq!(report.first_failure().map(|(f, _)| f), Some("broken"));
}

#[test]
#[serial]
fn source_edit_triggers_one_rebuild() {
  let project = TestProject::new();
  let main_go = project.write_file("functions/hello/main.go", MAIN_GO);
  project.write_config(&[("hello", "functions/hello", None)]);
  project.write_template();
  let engine = Arc::new(project.engine());

  project.block_on(async {
    let mut events = engine.subscribe();
    engine.start().await.unwrap();
    let reactor = tokio::spawn({
      let engine = Arc::clone(&engine);
      async move { engine.run().await }
    });

    std::fs::write(&main_go, "package main\n\nfunc main() { println(1) }\n").unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    std::fs::write(&main_go, "package main\n\nfunc main() { println(2) }\n").unwrap();

    let triggered = wait_for(&mut events, |e| matches!(e, EngineEvent::RebuildTriggered { .. })).await;
    assert_eq!(
      triggered,
      EngineEvent::RebuildTriggered {
        functions: vec!["hello".to_string()]
      }
    );
    wait_for(&mut events, |e| matches!(e, EngineEvent::BuildSucceeded { .. })).await;
    tokio::time::sleep(Duration::from_millis(500)).await;

    engine.stop();
    reactor.await.unwrap().unwrap();
  });

  // One startup build plus one rebuild.
  assert_eq!(project.go_invocations(), 2);
}

#[test]
#[serial]
fn new_directory_is_watched_and_new_files_are_staged() {
  let project = TestProject::new();
  project.write_file("functions/hello/main.go", MAIN_GO);
  project.write_config(&[("hello", "functions/hello", None)]);
  project.write_template();
  let engine = Arc::new(project.engine());
  let source = project.root().join("functions/hello");

  project.block_on(async {
    let mut events = engine.subscribe();
    engine.start().await.unwrap();
    let reactor = tokio::spawn({
      let engine = Arc::clone(&engine);
      async move { engine.run().await }
    });

    std::fs::create_dir(source.join("handlers")).unwrap();
    wait_until_watched(&engine, &source.join("handlers")).await;

    std::fs::write(source.join("handlers/users.go"), "package handlers\n").unwrap();
    wait_for(&mut events, |e| matches!(e, EngineEvent::RebuildTriggered { .. })).await;

    engine.stop();
    reactor.await.unwrap().unwrap();
  });

  let staged = hotfn_lib::staging::StagingArea::for_project(project.root())
    .asset_dir("hello")
    .join("handlers/users.go");
  assert_eq!(std::fs::read_to_string(staged).unwrap(), "package handlers\n");
}

#[test]
#[serial]
fn subpackage_under_intermediate_directory_is_rebuilt() {
  let project = TestProject::new();
  project.write_file("functions/hello/main.go", MAIN_GO);
  project.write_file("functions/hello/internal/db/db.go", "package db\n");
  project.write_config(&[("hello", "functions/hello", None)]);
  project.write_template();
  let engine = Arc::new(project.engine());
  let source = project.root().join("functions/hello");

  project.block_on(async {
    let mut events = engine.subscribe();
    engine.start().await.unwrap();
    assert!(engine.watched_dirs().contains(&source.join("internal")));
    let reactor = tokio::spawn({
      let engine = Arc::clone(&engine);
      async move { engine.run().await }
    });

    std::fs::create_dir_all(source.join("internal/cache/lru")).unwrap();
    std::fs::write(source.join("internal/cache/lru/lru.go"), "package lru\n").unwrap();
    let triggered = wait_for(&mut events, |e| matches!(e, EngineEvent::RebuildTriggered { .. })).await;
    assert_eq!(
      triggered,
      EngineEvent::RebuildTriggered {
        functions: vec!["hello".to_string()]
      }
    );
    wait_until_watched(&engine, &source.join("internal/cache/lru")).await;

    engine.stop();
    reactor.await.unwrap().unwrap();
  });

  let staged = hotfn_lib::staging::StagingArea::for_project(project.root())
    .asset_dir("hello")
    .join("internal/cache/lru/lru.go");
  assert_eq!(std::fs::read_to_string(staged).unwrap(), "package lru\n");
}

#[test]
#[serial]
fn stop_can_be_called_repeatedly_while_running() {
  let project = TestProject::new();
  project.write_file("functions/hello/main.go", MAIN_GO);
  project.write_config(&[("hello", "functions/hello", None)]);
  project.write_template();
  let engine = Arc::new(project.engine());

  project.block_on(async {
    engine.start().await.unwrap();
    let reactor = tokio::spawn({
      let engine = Arc::clone(&engine);
      async move { engine.run().await }
    });

    engine.stop();
    engine.stop();
    tokio::time::timeout(Duration::from_secs(5), reactor)
      .await
      .unwrap()
      .unwrap()
      .unwrap();
    engine.stop();
  });

  assert!(engine.is_stopped());
  assert!(!engine.gateway_running());
}
