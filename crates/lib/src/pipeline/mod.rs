//! Build pipeline.
//!
//! Runs the stages strictly in order, threading the environment through
//! each of them:
//!
//! 1. resolve the compiler toolchain
//! 2. install missing tools
//! 3. fetch both source trees
//! 4. build and install the dependency
//! 5. build the target library
//! 6. report the artifacts
//!
//! The first failing stage aborts the run. Completed stages are not rolled
//! back; their results on disk let the next run skip them.

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::build::{self, BuildError, BuildOutcome, TargetOptions};
use crate::config::Config;
use crate::env::Env;
use crate::install::{self, InstallError};
use crate::report::{self, ArtifactReport};
use crate::source::{ArchiveOutcome, FetchError, RepoOutcome, fetch_archive, fetch_repo};
use crate::toolchain::{self, ToolchainError};
use crate::workspace::Layout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
  Prepare,
  Toolchain,
  Install,
  Fetch,
  DependencyBuild,
  TargetBuild,
  Report,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Stage::Prepare => "prepare",
      Stage::Toolchain => "toolchain",
      Stage::Install => "install",
      Stage::Fetch => "fetch",
      Stage::DependencyBuild => "dependency build",
      Stage::TargetBuild => "target build",
      Stage::Report => "report",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Error)]
pub enum StageError {
  #[error(transparent)]
  Toolchain(#[from] ToolchainError),

  #[error(transparent)]
  Install(#[from] InstallError),

  #[error(transparent)]
  Fetch(#[from] FetchError),

  #[error(transparent)]
  Build(#[from] BuildError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl StageError {
  /// Exit code of the external tool that caused the failure, if any.
  pub fn exit_code(&self) -> Option<i32> {
    match self {
      StageError::Install(e) => e.exit_code(),
      StageError::Build(e) => e.exit_code(),
      _ => None,
    }
  }
}

#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
  pub stage: Stage,
  #[source]
  pub source: StageError,
}

impl PipelineError {
  fn at<E: Into<StageError>>(stage: Stage) -> impl FnOnce(E) -> Self {
    move |source| PipelineError {
      stage,
      source: source.into(),
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
  pub layout: Layout,
  /// Environment the target library was built with.
  #[serde(skip)]
  pub env: Env,
  pub archive: ArchiveOutcome,
  pub repo: RepoOutcome,
  pub dependency: BuildOutcome,
  pub report: ArtifactReport,
  #[serde(skip)]
  pub elapsed: Duration,
}

/// Run every stage for `config`, starting from `env`.
pub async fn run(config: &Config, env: Env) -> Result<PipelineResult, PipelineError> {
  let started = Instant::now();
  let layout = Layout::new(config);
  info!(root = %layout.root.display(), arch = %config.arch, "starting build");

  prepare(&layout).await.map_err(PipelineError::at(Stage::Prepare))?;

  let env = if config.toolchain.enabled {
    info!(stage = %Stage::Toolchain, "running stage");
    toolchain::resolve(&config.toolchain, config.arch, env)
      .await
      .map_err(PipelineError::at(Stage::Toolchain))?
  } else {
    info!("toolchain resolution disabled, using ambient environment");
    env
  };

  info!(stage = %Stage::Install, "running stage");
  let mut env = env;
  for requirement in &config.requires {
    env = install::ensure(requirement, &config.tools.package_manager, env)
      .await
      .map_err(PipelineError::at(Stage::Install))?;
  }

  info!(stage = %Stage::Fetch, "running stage");
  let archive = fetch_archive(&config.openssl, &layout)
    .await
    .map_err(PipelineError::at(Stage::Fetch))?;
  let repo = fetch_repo(&config.sqlcipher, &layout.sqlcipher_src)
    .await
    .map_err(PipelineError::at(Stage::Fetch))?;

  info!(stage = %Stage::DependencyBuild, "running stage");
  let dependency = build::dependency::build(
    &layout.openssl_src,
    config.arch,
    &layout.openssl_prefix,
    &config.openssl,
    &config.tools,
    &env,
  )
  .await
  .map_err(PipelineError::at(Stage::DependencyBuild))?;

  info!(stage = %Stage::TargetBuild, "running stage");
  let opts = TargetOptions {
    prefix: layout.openssl_prefix.clone(),
    targets: config.sqlcipher.targets.clone(),
    cflags: config.sqlcipher.cflags.clone(),
    make: config.tools.make.clone(),
  };
  let env = build::target::build(&config.sqlcipher.makefile, &layout.sqlcipher_src, &layout.bin, &opts, env)
    .await
    .map_err(PipelineError::at(Stage::TargetBuild))?;

  info!(stage = %Stage::Report, "running stage");
  let report = report::report(&layout.bin);

  let elapsed = started.elapsed();
  info!(out = %layout.bin.display(), elapsed_ms = elapsed.as_millis() as u64, "build complete");

  Ok(PipelineResult {
    layout,
    env,
    archive,
    repo,
    dependency,
    report,
    elapsed,
  })
}

/// Create the workspace root and the output directory.
async fn prepare(layout: &Layout) -> Result<(), StageError> {
  tokio::fs::create_dir_all(&layout.root).await?;
  tokio::fs::create_dir_all(&layout.bin).await?;
  Ok(())
}
