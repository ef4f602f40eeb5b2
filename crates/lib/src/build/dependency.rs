//! Dependency build: configure, clean, compile and install into a prefix.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::build::marker::{read_marker, write_marker};
use crate::build::{BuildError, BuildOutcome, find_program, run_step};
use crate::config::{OpensslConfig, ToolsConfig};
use crate::env::Env;
use crate::platform::Arch;
use crate::util::hash::Hashable;

/// Everything that influences the installed result.
///
/// Changing any of these invalidates the completion marker.
#[derive(Debug, Serialize)]
struct DependencyInputs<'a> {
  source_dir: &'a Path,
  target: &'static str,
  prefix: &'a Path,
  configure_options: &'a [String],
  perl: &'a str,
  make: &'a str,
}

impl Hashable for DependencyInputs<'_> {}

/// `Configure` target for `arch`.
pub fn configure_target(arch: Arch) -> &'static str {
  match arch {
    Arch::X64 => "VC-WIN64A",
    Arch::X86 => "VC-WIN32",
  }
}

/// Build the dependency in `source_dir` and install it into `prefix`.
///
/// Skipped when the marker in `prefix` records the same inputs. Otherwise the
/// steps run strictly in order and the first failure stops the build without
/// writing a marker.
pub async fn build(
  source_dir: &Path,
  arch: Arch,
  prefix: &Path,
  openssl: &OpensslConfig,
  tools: &ToolsConfig,
  env: &Env,
) -> Result<BuildOutcome, BuildError> {
  let target = configure_target(arch);
  let input_hash = DependencyInputs {
    source_dir,
    target,
    prefix,
    configure_options: &openssl.configure_options,
    perl: &tools.perl,
    make: &tools.make,
  }
  .compute_hash()?;

  if let Some(marker) = read_marker(prefix).await
    && marker.matches(&input_hash)
  {
    info!(prefix = %prefix.display(), hash = %input_hash, "dependency already built");
    return Ok(BuildOutcome::Cached);
  }

  if !source_dir.is_dir() {
    return Err(BuildError::MissingSource(source_dir.display().to_string()));
  }

  let perl = find_program(env, &tools.perl)?;
  let make = find_program(env, &tools.make)?;

  info!(source = %source_dir.display(), target, prefix = %prefix.display(), "building dependency");

  let steps: [(&str, &PathBuf, Vec<String>); 4] = [
    ("configure", &perl, configure_args(target, prefix, &openssl.configure_options)),
    ("clean", &make, vec!["clean".to_string()]),
    ("compile", &make, Vec::new()),
    ("install", &make, vec!["install_sw".to_string()]),
  ];

  for (step, program, args) in &steps {
    info!(step, "running build step");
    run_step(step, program, args, source_dir, env).await?;
  }

  write_marker(prefix, &input_hash).await?;
  info!(prefix = %prefix.display(), hash = %input_hash, "dependency installed");
  Ok(BuildOutcome::Built)
}

fn configure_args(target: &str, prefix: &Path, options: &[String]) -> Vec<String> {
  let mut args = vec![
    "Configure".to_string(),
    target.to_string(),
    format!("--prefix={}", prefix.display()),
    format!("--openssldir={}", prefix.join("ssl").display()),
  ];
  args.extend(options.iter().cloned());
  args
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn configure_target_per_arch() {
    assert_eq!(configure_target(Arch::X64), "VC-WIN64A");
    assert_eq!(configure_target(Arch::X86), "VC-WIN32");
  }

  #[test]
  fn configure_args_place_options_last() {
    let args = configure_args("VC-WIN32", Path::new("/p"), &["no-shared".to_string()]);
    assert_eq!(
      args,
      vec![
        "Configure".to_string(),
        "VC-WIN32".to_string(),
        "--prefix=/p".to_string(),
        format!("--openssldir={}", Path::new("/p").join("ssl").display()),
        "no-shared".to_string(),
      ]
    );
  }

  #[cfg(unix)]
  mod unix {
    use super::*;
    use crate::build::marker::marker_path;
    use crate::util::testutil::{env_with_path, read_log, write_script};
    use tempfile::TempDir;

    struct Fixture {
      _temp: TempDir,
      source: PathBuf,
      prefix: PathBuf,
      log: PathBuf,
      env: Env,
      tools: ToolsConfig,
    }

    /// Fake `perl` and `make` that append their arguments to a shared log.
    /// `make` exits with `fail_code` when invoked without arguments.
    fn fixture(fail_code: i32) -> Fixture {
      let temp = TempDir::new().unwrap();
      let bin = temp.path().join("bin");
      let source = temp.path().join("openssl-3.3.2");
      let prefix = temp.path().join("install").join("x64");
      let log = temp.path().join("build.log");
      std::fs::create_dir_all(&source).unwrap();

      write_script(&bin, "perl", &format!("echo \"perl${{*:+ $*}}\" >> \"{}\"", log.display()));
      write_script(
        &bin,
        "make",
        &format!(
          "echo \"make${{*:+ $*}}\" >> \"{}\"\nif [ $# -eq 0 ]; then exit {}; fi\nexit 0",
          log.display(),
          fail_code
        ),
      );

      let tools = ToolsConfig {
        make: "make".to_string(),
        ..Default::default()
      };
      let env = env_with_path(&[&bin]);
      Fixture {
        _temp: temp,
        source,
        prefix,
        log,
        env,
        tools,
      }
    }

    async fn run(f: &Fixture, openssl: &OpensslConfig) -> Result<BuildOutcome, BuildError> {
      build(&f.source, Arch::X64, &f.prefix, openssl, &f.tools, &f.env).await
    }

    #[tokio::test]
    async fn steps_run_in_order_then_cached() {
      let f = fixture(0);
      let openssl = OpensslConfig::default();

      assert_eq!(run(&f, &openssl).await.unwrap(), BuildOutcome::Built);
      let log = read_log(&f.log);
      assert_eq!(log.len(), 4);
      assert!(log[0].starts_with("perl Configure VC-WIN64A --prefix="));
      assert!(log[0].ends_with("no-shared"));
      assert_eq!(&log[1..], ["make clean", "make", "make install_sw"]);
      assert!(marker_path(&f.prefix).is_file());

      assert_eq!(run(&f, &openssl).await.unwrap(), BuildOutcome::Cached);
      assert_eq!(read_log(&f.log).len(), 4);
    }

    #[tokio::test]
    async fn changed_options_rebuild_including_clean() {
      let f = fixture(0);
      run(&f, &OpensslConfig::default()).await.unwrap();

      let openssl = OpensslConfig {
        configure_options: vec!["no-shared".to_string(), "no-tests".to_string()],
        ..Default::default()
      };
      assert_eq!(run(&f, &openssl).await.unwrap(), BuildOutcome::Built);

      let log = read_log(&f.log);
      assert_eq!(log.len(), 8);
      assert!(log[4].ends_with("no-tests"));
      assert_eq!(log[5], "make clean");
    }

    #[tokio::test]
    async fn failed_compile_stops_before_install() {
      let f = fixture(2);

      let err = run(&f, &OpensslConfig::default()).await.unwrap_err();

      match err {
        BuildError::StepFailed { ref step, code } => {
          assert_eq!(step, "compile");
          assert_eq!(code, Some(2));
        }
        other => panic!("expected StepFailed, got {:?}", other),
      }
      let log = read_log(&f.log);
      assert!(!log.iter().any(|l| l == "make install_sw"));
      assert!(!marker_path(&f.prefix).exists());
    }

    #[tokio::test]
    async fn missing_make_is_reported_before_any_step() {
      let mut f = fixture(0);
      f.tools.make = "no-such-make".to_string();

      let err = run(&f, &OpensslConfig::default()).await.unwrap_err();

      assert!(matches!(err, BuildError::ProgramNotFound(ref p) if p == "no-such-make"));
      assert!(read_log(&f.log).is_empty());
    }
  }
}
