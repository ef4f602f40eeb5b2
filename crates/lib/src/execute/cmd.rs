//! Running external tools.
//!
//! Tools run with exactly the environment they are handed (the parent
//! environment is cleared first), stdin closed, and stdout/stderr captured.
//! Output is streamed to the debug log as it is produced; on failure the last
//! lines are logged as a warning so the cause is visible without `--verbose`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::env::Env;
use crate::execute::types::ExecuteError;

/// Number of trailing output lines surfaced when a command fails.
const FAILURE_TAIL_LINES: usize = 20;

/// Run `program` with `args` in `cwd`, using exactly `env`.
///
/// Returns the trimmed stdout on success.
pub async fn execute_cmd(program: &Path, args: &[String], cwd: &Path, env: &Env) -> Result<String, ExecuteError> {
  let mut command = Command::new(program);
  command.args(args).current_dir(cwd);
  env.apply(&mut command);

  execute_command(command, &render_cmd(program, args)).await
}

/// Run a fully prepared command.
///
/// `rendered` is the human-readable form used in logs and errors. Output is
/// logged line by line at debug level while the command runs.
pub async fn execute_command(mut command: Command, rendered: &str) -> Result<String, ExecuteError> {
  info!(cmd = %rendered, "executing command");

  command.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

  let program = PathBuf::from(command.as_std().get_program());
  debug!(program = ?program, cwd = ?command.as_std().get_current_dir(), "spawning process");

  let mut child = command
    .spawn()
    .map_err(|source| ExecuteError::Spawn { program, source })?;

  let stdout_pipe = child.stdout.take();
  let stderr_pipe = child.stderr.take();
  let (stdout, stderr, status) = tokio::try_join!(
    collect_lines(stdout_pipe, "stdout"),
    collect_lines(stderr_pipe, "stderr"),
    child.wait(),
  )?;

  if !status.success() {
    if !stdout.is_empty() {
      warn!(stdout = %tail(&stdout, FAILURE_TAIL_LINES), "command stdout (tail)");
    }
    if !stderr.is_empty() {
      warn!(stderr = %tail(&stderr, FAILURE_TAIL_LINES), "command stderr (tail)");
    }

    return Err(ExecuteError::CmdFailed {
      cmd: rendered.to_string(),
      code: status.code(),
    });
  }

  Ok(stdout.trim().to_string())
}

/// Read `pipe` to the end, logging each line as it arrives.
///
/// Tools may print in a non-UTF-8 code page, so lines are decoded lossily.
async fn collect_lines<R: AsyncRead + Unpin>(pipe: Option<R>, stream: &'static str) -> std::io::Result<String> {
  let Some(pipe) = pipe else {
    return Ok(String::new());
  };

  let mut reader = BufReader::new(pipe);
  let mut collected = String::new();
  let mut buf = Vec::new();
  loop {
    buf.clear();
    if reader.read_until(b'\n', &mut buf).await? == 0 {
      break;
    }
    let line = String::from_utf8_lossy(&buf);
    let line = line.trim_end_matches(['\r', '\n']);
    debug!(stream, "{}", line);
    collected.push_str(line);
    collected.push('\n');
  }
  Ok(collected)
}

/// Render a program and its arguments the way a user would type them.
pub fn render_cmd(program: &Path, args: &[String]) -> String {
  let mut rendered = program.display().to_string();
  for arg in args {
    rendered.push(' ');
    if arg.contains(' ') {
      rendered.push('"');
      rendered.push_str(arg);
      rendered.push('"');
    } else {
      rendered.push_str(arg);
    }
  }
  rendered
}

fn tail(text: &str, lines: usize) -> String {
  let all: Vec<&str> = text.lines().collect();
  let start = all.len().saturating_sub(lines);
  all[start..].join("\n")
}
