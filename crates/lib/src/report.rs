//! Artifact listing for the output directory.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
  pub name: String,
  pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactReport {
  pub out_dir: PathBuf,
  /// Regular files directly inside `out_dir`, sorted by name.
  pub artifacts: Vec<Artifact>,
}

impl ArtifactReport {
  pub fn total_size(&self) -> u64 {
    self.artifacts.iter().map(|a| a.size).sum()
  }
}

/// List the files in `out_dir`.
///
/// Never fails: entries that cannot be read are skipped with a warning.
pub fn report(out_dir: &Path) -> ArtifactReport {
  let mut artifacts = Vec::new();

  for entry in WalkDir::new(out_dir).min_depth(1).max_depth(1).sort_by_file_name() {
    let entry = match entry {
      Ok(entry) => entry,
      Err(e) => {
        warn!(path = %out_dir.display(), error = %e, "cannot read output directory entry");
        continue;
      }
    };
    if !entry.file_type().is_file() {
      continue;
    }
    match entry.metadata() {
      Ok(meta) => artifacts.push(Artifact {
        name: entry.file_name().to_string_lossy().into_owned(),
        size: meta.len(),
      }),
      Err(e) => warn!(path = %entry.path().display(), error = %e, "cannot stat artifact"),
    }
  }

  info!(path = %out_dir.display(), count = artifacts.len(), "artifacts available");

  ArtifactReport {
    out_dir: out_dir.to_path_buf(),
    artifacts,
  }
}
