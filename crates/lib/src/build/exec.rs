//! Toolchain process execution.
//!
//! Runs one short-lived toolchain command to completion, capturing its output.
//! Unlike the gateway emulator, these processes inherit the caller's environment:
//! compilers and package managers need the user's caches and PATH.

use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::build::BuildError;
use crate::runtime::Toolchain;

/// Run `tool` with `args` in `cwd`, adding `envs` to the inherited environment.
///
/// # Returns
///
/// The trimmed stdout of the command on success. On a non-zero exit the
/// captured stderr is returned verbatim inside [`BuildError::ToolFailed`].
pub async fn run_tool<I, S>(tool: Toolchain, args: I, cwd: &Path, envs: &[(&str, &str)]) -> Result<String, BuildError>
where
  I: IntoIterator<Item = S>,
  S: AsRef<OsStr>,
{
  let program = tool.program();
  let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();

  let command_line = std::iter::once(tool.binary_name().to_string())
    .chain(args.iter().map(|a| a.to_string_lossy().into_owned()))
    .collect::<Vec<_>>()
    .join(" ");

  debug!(command = %command_line, cwd = %cwd.display(), "spawning toolchain");

  let mut command = Command::new(&program);
  command
    .args(&args)
    .current_dir(cwd)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped());
  for (key, value) in envs {
    command.env(key, value);
  }

  let output = command.output().await.map_err(|source| match source.kind() {
    io::ErrorKind::NotFound => BuildError::ToolMissing {
      program: program.display().to_string(),
      source,
    },
    _ => BuildError::Io(source),
  })?;

  if !output.status.success() {
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.is_empty() {
      debug!(stdout = %stdout, "toolchain stdout");
    }

    return Err(BuildError::ToolFailed {
      command: command_line,
      code: output.status.code(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    });
  }

  let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
  if !stdout.is_empty() {
    debug!(stdout = %stdout, "toolchain output");
  }

  Ok(stdout)
}
