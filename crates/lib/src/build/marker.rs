//! Build completion marker.
//!
//! A successful dependency build leaves a small JSON file in its install
//! prefix recording a hash of everything that went into the build. A later
//! run with the same inputs finds the marker and skips the build.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::consts::BUILD_COMPLETE_MARKER;
use crate::util::hash::ObjectHash;

/// Current marker format version.
const MARKER_VERSION: u32 = 1;

/// Marker file content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMarker {
  /// Marker format version.
  pub version: u32,
  /// Build status (always "complete" for successful builds).
  pub status: String,
  /// Hash of the inputs the build ran with.
  pub input_hash: ObjectHash,
}

impl BuildMarker {
  pub fn complete(input_hash: ObjectHash) -> Self {
    Self {
      version: MARKER_VERSION,
      status: "complete".to_string(),
      input_hash,
    }
  }

  /// Whether this marker records a finished build of `input_hash`.
  pub fn matches(&self, input_hash: &ObjectHash) -> bool {
    self.version == MARKER_VERSION && self.status == "complete" && &self.input_hash == input_hash
  }
}

pub fn marker_path(prefix: &Path) -> PathBuf {
  prefix.join(BUILD_COMPLETE_MARKER)
}

/// Read the marker in `prefix`.
///
/// A missing marker is `None`. So is an unreadable or corrupt one, after a
/// warning: the build simply runs again and rewrites it.
pub async fn read_marker(prefix: &Path) -> Option<BuildMarker> {
  let path = marker_path(prefix);
  let content = match tokio::fs::read_to_string(&path).await {
    Ok(content) => content,
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
      debug!(path = %path.display(), "no build marker");
      return None;
    }
    Err(e) => {
      warn!(path = %path.display(), error = %e, "failed to read build marker");
      return None;
    }
  };

  match serde_json::from_str(&content) {
    Ok(marker) => Some(marker),
    Err(e) => {
      warn!(path = %path.display(), error = %e, "ignoring corrupt build marker");
      None
    }
  }
}

/// Write the marker for a completed build of `input_hash` into `prefix`.
pub async fn write_marker(prefix: &Path, input_hash: &ObjectHash) -> std::io::Result<()> {
  let marker = BuildMarker::complete(input_hash.clone());
  let content = serde_json::to_string(&marker)?;
  tokio::fs::create_dir_all(prefix).await?;
  tokio::fs::write(marker_path(prefix), format!("{}\n", content)).await
}
