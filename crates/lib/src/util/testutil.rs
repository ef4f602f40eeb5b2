//! Test utilities for cipherbuild-lib.
//!
//! Fake external tools are small `/bin/sh` scripts, so process-level tests
//! only run on Unix.

use std::path::{Path, PathBuf};

use crate::env::{Env, PATH_VAR};

/// Write an executable shell script called `name` into `dir`.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
  use std::os::unix::fs::PermissionsExt;

  std::fs::create_dir_all(dir).unwrap();
  let path = dir.join(name);
  std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
  std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
  path
}

/// An environment whose `PATH` is `dirs` followed by the system directories
/// the fake scripts rely on.
#[cfg(unix)]
pub fn env_with_path(dirs: &[&Path]) -> Env {
  let mut entries: Vec<PathBuf> = dirs.iter().map(|d| d.to_path_buf()).collect();
  entries.push(PathBuf::from("/usr/bin"));
  entries.push(PathBuf::from("/bin"));
  let path = std::env::join_paths(entries).unwrap();
  Env::new().with(PATH_VAR, path.to_string_lossy())
}

/// Lines appended to `log` by fake tools, in order.
pub fn read_log(log: &Path) -> Vec<String> {
  std::fs::read_to_string(log)
    .map(|s| s.lines().map(str::to_string).collect())
    .unwrap_or_default()
}

/// Build a `.tar.gz` whose entries all live under `top/`.
pub fn tarball(top: &str, files: &[(&str, &str)]) -> Vec<u8> {
  use flate2::Compression;
  use flate2::write::GzEncoder;

  let encoder = GzEncoder::new(Vec::new(), Compression::default());
  let mut builder = tar::Builder::new(encoder);
  for (name, content) in files {
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
      .append_data(&mut header, format!("{}/{}", top, name), content.as_bytes())
      .unwrap();
  }
  builder.into_inner().unwrap().finish().unwrap()
}
