//! Shallow git checkout of the target library.

use std::num::NonZeroU32;
use std::path::Path;

use gix::remote::fetch::Shallow;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SqlcipherConfig;
use crate::source::{FetchError, FetchOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoOutcome {
  pub clone: FetchOutcome,
  /// Commit checked out, when known.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub commit: Option<String>,
}

/// Clone the repository into `dest` unless it already exists.
///
/// The clone is shallow (depth 1) and fetches only the configured branch or
/// tag. A failed clone removes whatever it created so the next run tries
/// again instead of treating a half-written directory as a checkout.
pub async fn fetch_repo(config: &SqlcipherConfig, dest: &Path) -> Result<RepoOutcome, FetchError> {
  if dest.is_dir() {
    info!(path = %dest.display(), "repository already present");
    return Ok(RepoOutcome {
      clone: FetchOutcome::Cached,
      commit: None,
    });
  }

  let url = config.url.clone();
  let rev = config.rev.clone();
  let target = dest.to_path_buf();
  let result = tokio::task::spawn_blocking(move || clone_shallow(&url, &rev, &target)).await?;

  match result {
    Ok(commit) => Ok(RepoOutcome {
      clone: FetchOutcome::Fetched,
      commit,
    }),
    Err(e) => {
      if dest.exists() {
        warn!(path = %dest.display(), "removing incomplete clone");
        tokio::fs::remove_dir_all(dest).await?;
      }
      Err(e)
    }
  }
}

/// Clone `url` at `rev` into `dest` and check out the worktree.
///
/// Returns the checked out commit hash.
fn clone_shallow(url: &str, rev: &str, dest: &Path) -> Result<Option<String>, FetchError> {
  info!(url, rev, path = %dest.display(), "cloning repository");

  let clone_err = |e: Box<dyn std::error::Error + Send + Sync>| FetchError::Clone {
    url: url.to_string(),
    source: e,
  };

  let prepared = gix::prepare_clone(url, dest)
    .map_err(|e| clone_err(Box::new(e)))?
    .with_shallow(Shallow::DepthAtRemote(NonZeroU32::MIN));
  let mut prepared = prepared.with_ref_name(Some(rev)).map_err(|e| clone_err(Box::new(e)))?;

  let (mut checkout, _outcome) = prepared
    .fetch_then_checkout(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| clone_err(Box::new(e)))?;

  let (repo, _outcome) = checkout
    .main_worktree(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| FetchError::Checkout {
      rev: rev.to_string(),
      source: Box::new(e),
    })?;

  let commit = repo.head_id().ok().map(|id| id.to_string());
  debug!(rev, commit = ?commit, "checked out revision");
  Ok(commit)
}
