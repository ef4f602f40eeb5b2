//! Source acquisition.
//!
//! Both sub-operations are idempotent through existence checks: an archive
//! already on disk is never downloaded again, an extracted tree is never
//! re-extracted, and an existing checkout is never re-cloned. Nothing is
//! retried; re-running the pipeline resumes past whatever already exists.

pub mod archive;
pub mod git;

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::execute::ExecuteError;

pub use archive::{ArchiveOutcome, fetch_archive};
pub use git::{RepoOutcome, fetch_repo};

/// Errors that can occur while fetching sources.
#[derive(Debug, Error)]
pub enum FetchError {
  #[error("failed to download {resource}: {source}")]
  Download {
    resource: String,
    #[source]
    source: ExecuteError,
  },

  #[error("failed to extract '{archive}': {source}")]
  Extract {
    archive: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The archive unpacked, but not into the expected top-level directory.
  #[error("'{archive}' did not contain the expected directory '{expected}'")]
  UnexpectedLayout { archive: PathBuf, expected: String },

  #[error("failed to clone repository '{url}': {source}")]
  Clone {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("failed to checkout revision '{rev}': {source}")]
  Checkout {
    rev: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("background task failed: {0}")]
  Task(#[from] tokio::task::JoinError),
}

/// Whether a resource had to be fetched or was already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOutcome {
  Fetched,
  Cached,
}

impl std::fmt::Display for FetchOutcome {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      FetchOutcome::Fetched => f.write_str("fetched"),
      FetchOutcome::Cached => f.write_str("cached"),
    }
  }
}
