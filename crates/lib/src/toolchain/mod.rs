//! Compiler toolchain resolution.
//!
//! The compiler suite needs dozens of environment variables (`PATH`,
//! `INCLUDE`, `LIB`, `LIBPATH`, SDK locations, ...). Rather than assembling
//! them, the vendor's own initialization script is run in a child shell and
//! the environment it leaves behind is captured and overlaid onto ours.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::ToolchainConfig;
use crate::env::Env;
use crate::execute::{ExecuteError, execute_cmd, execute_command};
use crate::platform::Arch;
use crate::platform::shell::{env_dump_command, parse_env_dump};

/// Component every accepted installation must carry (the C/C++ build tools).
const REQUIRED_COMPONENT: &str = "Microsoft.VisualStudio.Component.VC.Tools.x86.x64";

#[derive(Debug, Error)]
pub enum ToolchainError {
  #[error("toolchain locator '{0}' not found")]
  LocatorMissing(PathBuf),

  #[error("toolchain locator failed: {0}")]
  Locate(#[source] ExecuteError),

  #[error("no toolchain installation matching version range {range}")]
  NotFound { range: String },

  #[error("environment script '{0}' does not exist")]
  ScriptMissing(PathBuf),

  #[error("failed to capture environment from '{script}': {source}")]
  Capture {
    script: PathBuf,
    #[source]
    source: ExecuteError,
  },

  #[error("environment script '{0}' produced no variables")]
  EmptyEnvironment(PathBuf),
}

/// Name of the environment-initialization script for `arch`.
pub fn env_script_name(arch: Arch) -> &'static str {
  match arch {
    Arch::X64 => "vcvars64.bat",
    Arch::X86 => "vcvars32.bat",
  }
}

/// Path of the environment-initialization script inside an installation.
pub fn env_script_path(installation: &Path, arch: Arch) -> PathBuf {
  installation
    .join("VC")
    .join("Auxiliary")
    .join("Build")
    .join(env_script_name(arch))
}

/// Resolve the toolchain for `arch` and return `env` extended with its variables.
pub async fn resolve(config: &ToolchainConfig, arch: Arch, env: Env) -> Result<Env, ToolchainError> {
  let installation = locate_installation(config, &env).await?;
  info!(path = %installation.display(), "found toolchain installation");

  let script = env_script_path(&installation, arch);
  if !script.is_file() {
    return Err(ToolchainError::ScriptMissing(script));
  }

  let vars = capture_environment(&script, &env).await?;
  info!(script = %script.display(), count = vars.len(), "captured toolchain environment");

  Ok(env.overlay(vars))
}

/// Ask the locator for the newest installation in the configured version range.
pub async fn locate_installation(config: &ToolchainConfig, env: &Env) -> Result<PathBuf, ToolchainError> {
  let locator = if config.locator.is_file() {
    config.locator.clone()
  } else {
    env
      .find_program(&config.locator.to_string_lossy())
      .ok_or_else(|| ToolchainError::LocatorMissing(config.locator.clone()))?
  };

  let args: Vec<String> = [
    "-latest",
    "-products",
    "*",
    "-requires",
    REQUIRED_COMPONENT,
    "-version",
    &config.version_range,
    "-property",
    "installationPath",
  ]
  .into_iter()
  .map(String::from)
  .collect();

  let cwd = locator.parent().map(Path::to_path_buf).unwrap_or_default();
  let not_found = || ToolchainError::NotFound {
    range: config.version_range.clone(),
  };
  let stdout = match execute_cmd(&locator, &args, &cwd, env).await {
    Ok(stdout) => stdout,
    Err(ExecuteError::CmdFailed { code, .. }) => {
      debug!(code = ?code, "locator exited unsuccessfully");
      return Err(not_found());
    }
    Err(e) => return Err(ToolchainError::Locate(e)),
  };

  let installation = stdout
    .lines()
    .map(str::trim)
    .find(|line| !line.is_empty())
    .ok_or_else(not_found)?;

  debug!(installation, "locator output");
  Ok(PathBuf::from(installation))
}

/// Run `script` in a child shell and return the environment it leaves behind.
pub async fn capture_environment(script: &Path, env: &Env) -> Result<Vec<(String, String)>, ToolchainError> {
  let mut command = env_dump_command(script, env);
  if let Some(dir) = script.parent() {
    command.current_dir(dir);
  }
  env.apply(&mut command);

  let stdout = execute_command(command, &format!("capture environment of {}", script.display()))
    .await
    .map_err(|source| ToolchainError::Capture {
      script: script.to_path_buf(),
      source,
    })?;

  let vars = parse_env_dump(&stdout);
  if vars.is_empty() {
    return Err(ToolchainError::EmptyEnvironment(script.to_path_buf()));
  }
  Ok(vars)
}
