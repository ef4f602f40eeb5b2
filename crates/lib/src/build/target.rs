//! Target library build against the installed dependency.
//!
//! The build runs from the output directory with the vendor makefile, which
//! locates the source tree through `TOP`. The compiler and linker find the
//! dependency's headers and libraries through `INCLUDE` and `LIB`.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::build::{BuildError, find_program, run_step};
use crate::env::Env;
use crate::util::path::relative_path;

/// Preprocessor definitions enabling encryption backed by the dependency.
pub const DEFINES: &[&str] = &[
  "-DSQLITE_HAS_CODEC",
  "-DSQLCIPHER_CRYPTO_OPENSSL",
  "-DSQLITE_TEMP_STORE=2",
  "-DSQLITE_ENABLE_COLUMN_METADATA",
  "-DSQLITE_ENABLE_UNLOCK_NOTIFY",
  "-DSQLITE_EXTRA_INIT=sqlcipher_extra_init",
  "-DSQLITE_EXTRA_SHUTDOWN=sqlcipher_extra_shutdown",
];

/// Libraries every linked artifact needs.
pub const LINK_LIBS: &[&str] = &["libcrypto.lib", "advapi32.lib", "user32.lib", "ws2_32.lib", "crypt32.lib"];

#[derive(Debug, Clone)]
pub struct TargetOptions {
  /// Install prefix of the dependency.
  pub prefix: PathBuf,
  /// Make targets; empty builds the default target.
  pub targets: Vec<String>,
  /// Value for the `CL` variable.
  pub cflags: String,
  pub make: String,
}

/// Build the target library from `source_dir` into `out_dir`.
///
/// Returns the environment the build ran with.
pub async fn build(
  makefile: &str,
  source_dir: &Path,
  out_dir: &Path,
  opts: &TargetOptions,
  env: Env,
) -> Result<Env, BuildError> {
  let top = relative_path(out_dir, source_dir)?;
  debug!(top = %top.display(), "source relative to output directory");

  let env = build_env(&opts.prefix, &opts.cflags, env)?;
  let make = find_program(&env, &opts.make)?;
  let args = make_args(makefile, &top, &opts.prefix, &opts.targets);

  info!(out = %out_dir.display(), makefile, "building target library");
  run_step("make", &make, &args, out_dir, &env).await?;

  Ok(env)
}

fn build_env(prefix: &Path, cflags: &str, env: Env) -> Result<Env, BuildError> {
  let env = env
    .prepend_path("INCLUDE", &prefix.join("include"))?
    .prepend_path("LIB", &prefix.join("lib"))?
    .with("CL", cflags);
  Ok(env)
}

fn make_args(makefile: &str, top: &Path, prefix: &Path, targets: &[String]) -> Vec<String> {
  let libs = LINK_LIBS.join(" ");
  let mut args = vec![
    "/f".to_string(),
    top.join(makefile).display().to_string(),
    format!("TOP={}", top.display()),
  ];
  args.extend(targets.iter().cloned());
  args.push(format!("OPTS={}", DEFINES.join(" ")));
  args.push(format!("LTLIBS={}", libs));
  args.push(format!("TLIBS={}", libs));
  args.push(format!("LTLIBPATHS=/LIBPATH:\"{}\"", prefix.join("lib").display()));
  args
}
