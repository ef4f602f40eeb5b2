//! Shared test helpers for CLI integration tests.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;

/// Isolated build environment with fake tools.
///
/// Layout of the temporary directory:
/// - `tools/`: fake locator, perl, make and package manager, first on `PATH`
/// - `vs/`: fake toolchain installation with its environment scripts
/// - `ws/`: workspace root, with the target library already checked out
/// - `calls.log`: one line per fake tool invocation
pub struct TestEnv {
  pub temp: TempDir,
  pub config_path: PathBuf,
}

impl TestEnv {
  /// Create the environment. The fake `make` exits with `target_exit` when
  /// building the target library, otherwise it writes `sqlite3.dll`.
  pub fn new(archive_base_url: &str, target_exit: i32) -> Self {
    let temp = TempDir::new().unwrap();
    let env = Self {
      config_path: temp.path().join("cipherbuild.toml"),
      temp,
    };

    let vs = env.path("vs");
    let scripts = vs.join("VC").join("Auxiliary").join("Build");
    env.write_file(&scripts.join("vcvars64.bat"), "export VSCMD_ARG_TGT_ARCH=x64\n");
    env.write_file(&scripts.join("vcvars32.bat"), "export VSCMD_ARG_TGT_ARCH=x86\n");

    let log = env.log_path();
    env.write_tool("vswhere", &format!("echo '{}'", vs.display()));
    env.write_tool("perl", &format!("echo \"perl${{*:+ $*}}\" >> \"{}\"", log.display()));
    env.write_tool(
      "make",
      &format!(
        "echo \"make${{*:+ $*}}\" >> \"{log}\"\n\
         if [ \"$1\" = /f ]; then\n\
         \x20 if [ {code} -ne 0 ]; then exit {code}; fi\n\
         \x20 echo dll > sqlite3.dll\n\
         fi",
        log = log.display(),
        code = target_exit
      ),
    );
    env.write_tool("pkg", &format!("echo \"pkg${{*:+ $*}}\" >> \"{}\"", log.display()));

    std::fs::create_dir_all(env.root_path().join("sqlcipher")).unwrap();

    let config = format!(
      r#"
root = '{root}'

[openssl]
url = '{base}/openssl-{{version}}.tar.gz'

[sqlcipher]
url = 'https://invalid.invalid/sqlcipher.git'

[toolchain]
locator = '{tools}/vswhere'

[tools]
make = "make"
package_manager = {{ program = "pkg", args = ["install", "{{package}}"] }}

[[requires]]
tool = "perl"
package = "strawberryperl"
"#,
      root = env.root_path().display(),
      base = archive_base_url,
      tools = env.path("tools").display(),
    );
    std::fs::write(&env.config_path, config).unwrap();

    env
  }

  pub fn path(&self, relative: &str) -> PathBuf {
    self.temp.path().join(relative)
  }

  pub fn root_path(&self) -> PathBuf {
    self.path("ws")
  }

  pub fn bin_path(&self, arch: &str) -> PathBuf {
    self.root_path().join("bin").join(arch)
  }

  pub fn log_path(&self) -> PathBuf {
    self.path("calls.log")
  }

  /// Lines written by fake tools so far.
  pub fn calls(&self) -> Vec<String> {
    std::fs::read_to_string(self.log_path())
      .map(|s| s.lines().map(str::to_string).collect())
      .unwrap_or_default()
  }

  fn write_file(&self, path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
  }

  fn write_tool(&self, name: &str, body: &str) {
    let path = self.path("tools").join(name);
    self.write_file(&path, &format!("#!/bin/sh\n{}\n", body));
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
  }

  /// A `cipherbuild` command using this environment's config and fake tools.
  pub fn cipherbuild_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("cipherbuild");
    cmd.current_dir(self.temp.path());
    cmd.env_clear();
    cmd.env("PATH", format!("{}:/usr/bin:/bin", self.path("tools").display()));
    cmd.arg("build").arg("--config").arg(&self.config_path);
    cmd
  }
}

/// A `.tar.gz` release archive whose single top-level directory is `top`.
pub fn release_archive(top: &str) -> Vec<u8> {
  let encoder = GzEncoder::new(Vec::new(), Compression::default());
  let mut builder = tar::Builder::new(encoder);
  let content = b"#!/usr/bin/env perl\n";
  let mut header = tar::Header::new_gnu();
  header.set_size(content.len() as u64);
  header.set_mode(0o644);
  header.set_cksum();
  builder
    .append_data(&mut header, format!("{}/Configure", top), &content[..])
    .unwrap();
  builder.into_inner().unwrap().finish().unwrap()
}
