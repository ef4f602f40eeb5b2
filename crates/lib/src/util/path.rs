//! Path helpers.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathError {
  #[error("failed to resolve path '{path}': {source}")]
  Canonicalize {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The two paths share no root (e.g. different drives on Windows).
  #[error("'{target}' cannot be expressed relative to '{base}'")]
  NoCommonBase { base: PathBuf, target: PathBuf },
}

/// Path of `target` relative to the directory `base`.
///
/// Both paths must exist; they are canonicalized first so symlinks and `..`
/// segments do not skew the result.
pub fn relative_path(base: &Path, target: &Path) -> Result<PathBuf, PathError> {
  let canonical = |p: &Path| {
    dunce::canonicalize(p).map_err(|source| PathError::Canonicalize {
      path: p.to_path_buf(),
      source,
    })
  };
  let base = canonical(base)?;
  let target = canonical(target)?;

  diff_paths(&target, &base).ok_or(PathError::NoCommonBase { base, target })
}

/// Purely lexical relative path from `base` to `target`.
///
/// Both paths must be absolute and free of `.`/`..` segments; returns `None`
/// otherwise or when they do not share a root.
pub fn diff_paths(target: &Path, base: &Path) -> Option<PathBuf> {
  let normal = |p: &Path| {
    p.is_absolute()
      && p
        .components()
        .all(|c| !matches!(c, Component::CurDir | Component::ParentDir))
  };
  if !normal(target) || !normal(base) {
    return None;
  }

  let mut target_iter = target.components().peekable();
  let mut base_iter = base.components().peekable();

  // Roots (drive prefix and root dir) must match exactly.
  if target_iter.peek() != base_iter.peek() {
    return None;
  }

  while let (Some(t), Some(b)) = (target_iter.peek(), base_iter.peek()) {
    if t != b {
      break;
    }
    target_iter.next();
    base_iter.next();
  }

  let mut result = PathBuf::new();
  for _ in base_iter {
    result.push("..");
  }
  for component in target_iter {
    result.push(component.as_os_str());
  }

  if result.as_os_str().is_empty() {
    result.push(".");
  }
  Some(result)
}
