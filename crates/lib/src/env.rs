//! Explicit process environment.
//!
//! Every stage receives the environment it should run external tools with and
//! returns the (possibly extended) environment for the next stage. Nothing in
//! this crate writes to the environment of the running process; subprocesses
//! are spawned with `env_clear()` followed by the variables held here.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::process::Command;

use crate::platform::shell::executable_names;

/// Name of the executable search path variable.
pub const PATH_VAR: &str = "PATH";

#[derive(Debug, Error)]
pub enum EnvError {
  /// A directory could not be joined into a search path (it contains the separator).
  #[error("cannot add '{dir}' to {var}: {source}")]
  JoinPaths {
    var: String,
    dir: PathBuf,
    #[source]
    source: std::env::JoinPathsError,
  },
}

/// An ordered set of environment variables.
///
/// On Windows variable names are case-insensitive, so names are normalized to
/// upper case on insertion and lookup. Elsewhere names are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Env {
  vars: BTreeMap<String, String>,
}

#[cfg(windows)]
fn normalize(name: &str) -> String {
  name.to_uppercase()
}

#[cfg(not(windows))]
fn normalize(name: &str) -> String {
  name.to_string()
}

impl Env {
  pub fn new() -> Self {
    Self::default()
  }

  /// Snapshot the environment of the current process.
  ///
  /// Variables whose name or value is not valid UTF-8 are skipped.
  pub fn from_process() -> Self {
    std::env::vars_os()
      .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
      .collect()
  }

  pub fn get(&self, name: &str) -> Option<&str> {
    self.vars.get(&normalize(name)).map(String::as_str)
  }

  pub fn set(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
    self.vars.insert(normalize(name.as_ref()), value.into());
  }

  /// Builder-style variant of [`Env::set`].
  pub fn with(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
    self.set(name, value);
    self
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// Overwrite this environment with every entry of `other`.
  pub fn overlay<I, K, V>(mut self, other: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
  {
    for (k, v) in other {
      self.set(k, v);
    }
    self
  }

  /// Entries of a path-list variable, in order. Empty if the variable is unset.
  pub fn split_paths(&self, var: &str) -> Vec<PathBuf> {
    match self.get(var) {
      Some(value) => std::env::split_paths(value).collect(),
      None => Vec::new(),
    }
  }

  /// Prepend `dir` to the path-list variable `var`, creating it if unset.
  pub fn prepend_path(mut self, var: &str, dir: &Path) -> Result<Self, EnvError> {
    let mut entries = vec![dir.to_path_buf()];
    entries.extend(self.split_paths(var).into_iter().filter(|p| p != dir));

    let joined: OsString = std::env::join_paths(&entries).map_err(|source| EnvError::JoinPaths {
      var: var.to_string(),
      dir: dir.to_path_buf(),
      source,
    })?;

    self.set(var, joined.to_string_lossy().into_owned());
    Ok(self)
  }

  /// Locate an executable the way a shell would, using this environment's `PATH`.
  ///
  /// A name containing a path separator is checked as-is instead of searched.
  pub fn find_program(&self, name: &str) -> Option<PathBuf> {
    let as_path = Path::new(name);
    if as_path.components().count() > 1 || as_path.is_absolute() {
      return executable_names(name, self)
        .into_iter()
        .map(PathBuf::from)
        .find(|p| is_executable(p));
    }
    self.find_in(name, &self.split_paths(PATH_VAR))
  }

  /// Locate an executable in an explicit list of directories.
  pub fn find_in(&self, name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    let names = executable_names(name, self);
    dirs
      .iter()
      .flat_map(|dir| names.iter().map(move |n| dir.join(n)))
      .find(|candidate| is_executable(candidate))
  }

  /// Replace the environment of `command` with exactly this one.
  pub fn apply(&self, command: &mut Command) {
    command.env_clear().envs(self.iter());
  }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Env {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Env::new().overlay(iter)
  }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
  use std::os::unix::fs::PermissionsExt;
  path
    .metadata()
    .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
    .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
  path.is_file()
}
