//! Required tool installation.
//!
//! Each [`Requirement`] names a command that must resolve on `PATH` and the
//! package that provides it. Missing tools are installed with the configured
//! package manager and then looked up again; a tool that is still missing
//! after a successful install is an error naming both tool and package.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::{PackageManager, Requirement};
use crate::env::{Env, EnvError, PATH_VAR};
use crate::execute::{ExecuteError, execute_cmd};

#[derive(Debug, Error)]
pub enum InstallError {
  #[error("package manager '{0}' not found on PATH")]
  ManagerMissing(String),

  #[error("package manager failed to install '{package}': {source}")]
  PackageManager {
    package: String,
    #[source]
    source: ExecuteError,
  },

  /// The install reported success but the tool still cannot be found.
  #[error("installed package '{package}' but '{tool}' is still not on PATH")]
  InstallFailed { tool: String, package: String },

  #[error(transparent)]
  Env(#[from] EnvError),
}

impl InstallError {
  pub fn exit_code(&self) -> Option<i32> {
    match self {
      InstallError::PackageManager { source, .. } => source.exit_code(),
      _ => None,
    }
  }
}

/// Make sure `requirement.tool` is resolvable, installing it if needed.
///
/// Returns the environment to use from now on: unchanged when the tool was
/// already present, otherwise with the tool's directory prepended to `PATH`.
pub async fn ensure(requirement: &Requirement, manager: &PackageManager, env: Env) -> Result<Env, InstallError> {
  if let Some(path) = env.find_program(&requirement.tool) {
    debug!(tool = %requirement.tool, path = %path.display(), "tool already available");
    return Ok(env);
  }

  info!(tool = %requirement.tool, package = %requirement.package, "tool missing, installing");

  let program = env
    .find_program(&manager.program)
    .ok_or_else(|| InstallError::ManagerMissing(manager.program.clone()))?;
  let cwd = program.parent().map(Path::to_path_buf).unwrap_or_default();

  execute_cmd(&program, &manager.install_args(&requirement.package), &cwd, &env)
    .await
    .map_err(|source| InstallError::PackageManager {
      package: requirement.package.clone(),
      source,
    })?;

  let found = locate_after_install(requirement, &env).ok_or_else(|| InstallError::InstallFailed {
    tool: requirement.tool.clone(),
    package: requirement.package.clone(),
  })?;

  info!(tool = %requirement.tool, path = %found.display(), "tool installed");

  match found.parent() {
    Some(dir) => Ok(env.prepend_path(PATH_VAR, dir)?),
    None => Ok(env),
  }
}

/// Look for the tool on `PATH` and in the requirement's hint directories.
fn locate_after_install(requirement: &Requirement, env: &Env) -> Option<PathBuf> {
  env
    .find_program(&requirement.tool)
    .or_else(|| env.find_in(&requirement.tool, &requirement.hints))
}
