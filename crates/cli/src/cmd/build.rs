//! Implementation of the `cipherbuild build` command.

use anyhow::{Context, Result};
use tracing::info;

use cipherbuild_lib::env::Env;
use cipherbuild_lib::pipeline::{self, PipelineResult};

use crate::ConfigArgs;
use crate::output::{
  OutputFormat, format_bytes, format_elapsed, print_json, print_stat, print_success, print_warning,
};

/// Execute the build command.
///
/// Runs the whole pipeline with the environment of this process, then prints
/// the output directory and the artifacts in it.
pub fn cmd_build(args: &ConfigArgs, output: OutputFormat) -> Result<()> {
  let config = args.load()?;
  info!(root = %config.root.display(), arch = %config.arch, "starting build");

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let result = rt.block_on(pipeline::run(&config, Env::from_process()))?;

  if output.is_json() {
    print_json(&result)?;
  } else {
    print_summary(&result);
  }

  Ok(())
}

fn print_summary(result: &PipelineResult) {
  println!();
  print_success("Build complete!");
  print_stat("Output", &result.layout.bin.display().to_string());
  print_stat(
    "OpenSSL archive",
    &format!("{} / {}", result.archive.download, result.archive.extract),
  );
  print_stat("SQLCipher source", &result.repo.clone.to_string());
  print_stat("OpenSSL build", &result.dependency.to_string());
  if let Some(commit) = &result.repo.commit {
    print_stat("SQLCipher commit", commit);
  }
  print_stat("Duration", &format_elapsed(result.elapsed));

  if result.report.artifacts.is_empty() {
    print_warning("No artifacts found in the output directory");
    return;
  }

  println!();
  println!("Artifacts:");
  for artifact in &result.report.artifacts {
    print_stat(&artifact.name, &format_bytes(artifact.size));
  }
  print_stat("Total", &format_bytes(result.report.total_size()));
}
