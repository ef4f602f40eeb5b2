//! Error types shared by process execution and downloads.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while running an external tool or downloading a file.
#[derive(Debug, Error)]
pub enum ExecuteError {
  /// The process could not be started at all.
  #[error("failed to spawn '{program}': {source}")]
  Spawn {
    program: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// Command exited unsuccessfully.
  #[error("command {}: {cmd}", describe_exit(.code))]
  CmdFailed { cmd: String, code: Option<i32> },

  /// HTTP request failed.
  #[error("fetch failed for {url}: {message}")]
  FetchFailed { url: String, message: String },

  /// SHA256 hash mismatch after download.
  #[error("hash mismatch for {url}: expected {expected}, got {actual}")]
  HashMismatch {
    url: String,
    expected: String,
    actual: String,
  },

  /// I/O error during execution.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// How a process ended, for error messages.
pub(crate) fn describe_exit(code: &Option<i32>) -> String {
  match code {
    Some(code) => format!("failed with exit code {}", code),
    None => "was terminated by a signal".to_string(),
  }
}

impl ExecuteError {
  /// Exit code of a failed command, if this error carries one.
  pub fn exit_code(&self) -> Option<i32> {
    match self {
      ExecuteError::CmdFailed { code, .. } => *code,
      _ => None,
    }
  }
}
