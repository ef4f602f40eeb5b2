//! Host shell specifics: executable name resolution and environment capture.

use std::path::Path;

use tokio::process::Command;

use crate::env::Env;

/// Candidate file names for an executable called `name`.
///
/// On Windows a bare name is tried with every extension in `PATHEXT`.
#[cfg(windows)]
pub fn executable_names(name: &str, env: &Env) -> Vec<String> {
  if Path::new(name).extension().is_some() {
    return vec![name.to_string()];
  }
  let pathext = env.get("PATHEXT").unwrap_or(".COM;.EXE;.BAT;.CMD");
  pathext
    .split(';')
    .filter(|ext| !ext.is_empty())
    .map(|ext| format!("{}{}", name, ext.to_lowercase()))
    .collect()
}

#[cfg(not(windows))]
pub fn executable_names(name: &str, _env: &Env) -> Vec<String> {
  vec![name.to_string()]
}

/// Command that runs `script` and then prints the resulting environment as
/// `NAME=VALUE` lines on stdout.
///
/// The script's own output is discarded so only the dump reaches stdout.
#[cfg(windows)]
pub fn env_dump_command(script: &Path, env: &Env) -> Command {
  let comspec = env.get("COMSPEC").unwrap_or("cmd.exe");
  let mut command = Command::new(comspec);
  command.raw_arg(format!("/d /s /c \"call \"{}\" >NUL && set\"", script.display()));
  command
}

#[cfg(not(windows))]
pub fn env_dump_command(script: &Path, _env: &Env) -> Command {
  let mut command = Command::new("/bin/sh");
  command.arg("-c").arg(". \"$0\" >/dev/null && env").arg(script);
  command
}

/// Parse the output of `set` / `env` into name-value pairs.
///
/// Lines without `=` (continuations of multi-line values) and entries with
/// an empty name (cmd.exe's per-drive `=C:` variables) are dropped.
pub fn parse_env_dump(output: &str) -> Vec<(String, String)> {
  output
    .lines()
    .filter_map(|line| {
      let line = line.trim_end_matches('\r');
      let (name, value) = line.split_once('=')?;
      if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
      }
      Some((name.to_string(), value.to_string()))
    })
    .collect()
}
