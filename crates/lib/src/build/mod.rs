//! Native builds.
//!
//! - [`dependency`]: configure, clean, compile and install the cryptography
//!   library into a prefix, skipped when a marker records the same inputs
//! - [`target`]: compile the target library against that prefix with the
//!   vendor makefile
//!
//! Every step is one external process; the first non-zero exit aborts the
//! build with the step's name and exit code.

pub mod dependency;
pub mod marker;
pub mod target;

use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::env::{Env, EnvError};
use crate::execute::types::describe_exit;
use crate::execute::{ExecuteError, execute_cmd};
use crate::util::hash::HashError;
use crate::util::path::PathError;

pub use dependency::configure_target;
pub use marker::BuildMarker;
pub use target::TargetOptions;

#[derive(Debug, Error)]
pub enum BuildError {
  /// A build step exited unsuccessfully.
  #[error("step '{step}' {}", describe_exit(.code))]
  StepFailed { step: String, code: Option<i32> },

  #[error("program '{0}' not found on PATH")]
  ProgramNotFound(String),

  #[error("step '{step}' could not run: {source}")]
  Spawn {
    step: String,
    #[source]
    source: ExecuteError,
  },

  #[error("source directory '{0}' does not exist")]
  MissingSource(String),

  #[error(transparent)]
  RelativePath(#[from] PathError),

  #[error(transparent)]
  Env(#[from] EnvError),

  #[error("failed to hash build inputs: {0}")]
  Hash(#[from] HashError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl BuildError {
  pub fn exit_code(&self) -> Option<i32> {
    match self {
      BuildError::StepFailed { code, .. } => *code,
      _ => None,
    }
  }
}

/// Whether a build ran or was satisfied by a previous run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildOutcome {
  Built,
  Cached,
}

impl std::fmt::Display for BuildOutcome {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      BuildOutcome::Built => f.write_str("built"),
      BuildOutcome::Cached => f.write_str("cached"),
    }
  }
}

/// Run one named build step, translating a failed exit into [`BuildError::StepFailed`].
async fn run_step(step: &str, program: &Path, args: &[String], cwd: &Path, env: &Env) -> Result<(), BuildError> {
  match execute_cmd(program, args, cwd, env).await {
    Ok(_) => Ok(()),
    Err(ExecuteError::CmdFailed { code, .. }) => Err(BuildError::StepFailed {
      step: step.to_string(),
      code,
    }),
    Err(source) => Err(BuildError::Spawn {
      step: step.to_string(),
      source,
    }),
  }
}

/// Resolve a tool name against the environment's `PATH`.
fn find_program(env: &Env, name: &str) -> Result<std::path::PathBuf, BuildError> {
  env
    .find_program(name)
    .ok_or_else(|| BuildError::ProgramNotFound(name.to_string()))
}
