//! Shared helpers for engine integration tests.
//!
//! Projects are laid out in a temporary directory with a `hotfn.yml` and loaded
//! through `project::load`. Toolchains and the gateway emulator are replaced by
//! small shell scripts.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hotfn_lib::engine::{EngineSettings, LocalEngine};
use hotfn_lib::project::{self, Project};
use tempfile::TempDir;

pub struct TestProject {
  pub temp: TempDir,
  /// Every invocation of the fake `go`.
  pub go_log: PathBuf,
  pub go: PathBuf,
  pub sam: PathBuf,
}

impl TestProject {
  /// An empty project directory with fake `go` and `sam` programs.
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let bin = temp.path().join("bin");
    fs::create_dir_all(&bin).unwrap();
    let go_log = temp.path().join("go.log");

    let go = write_script(
      &bin,
      "go",
      &format!(
        r#"echo "$PWD $*" >> '{}'
if [ -f FAIL ]; then echo "forced failure" >&2; exit 1; fi
out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; fi
  shift
done
[ -n "$out" ] && : > "$out" && chmod +x "$out"
exit 0"#,
        go_log.display()
      ),
    );
    let sam = write_script(&bin, "sam", "exec sleep 60");

    Self { temp, go_log, go, sam }
  }

  pub fn root(&self) -> &Path {
    self.temp.path()
  }

  pub fn write_file(&self, relative: &str, content: &str) -> PathBuf {
    let path = self.root().join(relative);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
  }

  /// Write `hotfn.yml` with one entry per `(name, code, runtime)`.
  pub fn write_config(&self, functions: &[(&str, &str, Option<&str>)]) -> PathBuf {
    let mut yaml = String::from("service: demo\nstage: dev\nfunctions:\n");
    for (name, code, runtime) in functions {
      yaml.push_str(&format!(
        "  {name}:\n    functionName: demo-{name}\n    handler: bootstrap\n    code: {code}\n"
      ));
      if let Some(runtime) = runtime {
        yaml.push_str(&format!("    runtime: {runtime}\n"));
      }
    }
    self.write_file("hotfn.yml", &yaml)
  }

  pub fn write_template(&self) -> PathBuf {
    self.write_file("cdk.out/demo-dev.template.json", "{\"Resources\":{}}")
  }

  pub fn load(&self) -> Project {
    project::load(&self.root().join("hotfn.yml")).unwrap()
  }

  /// Engine wired to the fake emulator on a free port with a short debounce.
  pub fn engine(&self) -> LocalEngine {
    let project = self.load();
    let mut settings = EngineSettings::for_project(&project);
    settings.debounce = Duration::from_millis(100);
    settings.gateway.program = self.sam.display().to_string();
    settings.gateway.port = free_port();
    settings.gateway.startup_grace = Duration::from_millis(200);
    LocalEngine::new(project, settings)
  }

  pub fn go_invocations(&self) -> usize {
    fs::read_to_string(&self.go_log).map(|s| s.lines().count()).unwrap_or(0)
  }

  /// Run `test` on a fresh runtime with `HOTFN_GO` pointing at the fake `go`.
  pub fn block_on<F: std::future::Future>(&self, test: F) -> F::Output {
    temp_env::with_var("HOTFN_GO", Some(&self.go), || {
      tokio::runtime::Runtime::new().unwrap().block_on(test)
    })
  }
}

pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
  let path = dir.join(name);
  fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
  fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
  path
}

pub fn free_port() -> u16 {
  let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
  listener.local_addr().unwrap().port()
}
