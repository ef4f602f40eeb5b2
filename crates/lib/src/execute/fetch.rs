//! HTTPS downloads with optional SHA256 verification.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::execute::types::ExecuteError;

/// Download `url` to `dest`.
///
/// The body is streamed into `<dest>.part` and renamed into place only once
/// it is complete and (when `expected_sha256` is given) verified, so an
/// interrupted download never leaves a file at `dest`. TLS 1.2 is the minimum
/// accepted protocol version.
///
/// Returns the number of bytes written.
pub async fn download(url: &str, dest: &Path, expected_sha256: Option<&str>) -> Result<u64, ExecuteError> {
  info!(url = %url, dest = ?dest, "downloading");

  let part = part_path(dest);
  match stream_to(url, &part, expected_sha256).await {
    Ok((size, sha256)) => {
      fs::rename(&part, dest).await?;
      info!(path = ?dest, size, sha256 = %sha256, "download complete");
      Ok(size)
    }
    Err(e) => {
      if part.exists() {
        debug!(path = ?part, "removing partial download");
        let _ = fs::remove_file(&part).await;
      }
      Err(e)
    }
  }
}

async fn stream_to(url: &str, part: &Path, expected_sha256: Option<&str>) -> Result<(u64, String), ExecuteError> {
  let fetch_failed = |e: reqwest::Error| ExecuteError::FetchFailed {
    url: url.to_string(),
    message: e.to_string(),
  };

  let client = reqwest::Client::builder()
    .min_tls_version(reqwest::tls::Version::TLS_1_2)
    .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
    .build()
    .map_err(fetch_failed)?;

  let mut response = client.get(url).send().await.map_err(fetch_failed)?;

  if !response.status().is_success() {
    return Err(ExecuteError::FetchFailed {
      url: url.to_string(),
      message: format!("HTTP {}", response.status()),
    });
  }

  let mut file = fs::File::create(part).await?;
  let mut hasher = Sha256::new();
  let mut size: u64 = 0;

  while let Some(chunk) = response.chunk().await.map_err(fetch_failed)? {
    hasher.update(&chunk);
    file.write_all(&chunk).await?;
    size += chunk.len() as u64;
  }
  file.flush().await?;
  drop(file);

  let actual = hex::encode(hasher.finalize());
  if let Some(expected) = expected_sha256
    && !actual.eq_ignore_ascii_case(expected)
  {
    return Err(ExecuteError::HashMismatch {
      url: url.to_string(),
      expected: expected.to_string(),
      actual,
    });
  }

  Ok((size, actual))
}

fn part_path(dest: &Path) -> PathBuf {
  let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
  name.push(".part");
  dest.with_file_name(name)
}

/// Convert a URL to a safe filename.
///
/// Takes the last path component and sanitizes it. Falls back to hash of URL
/// if no suitable filename can be extracted.
pub fn url_to_filename(url: &str) -> String {
  if let Some(filename) = url.rsplit('/').next() {
    let filename = filename.split('?').next().unwrap_or(filename);

    // Sanitize: only allow alphanumeric, dash, underscore, dot
    let sanitized: String = filename
      .chars()
      .map(|c| {
        if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
          c
        } else {
          '_'
        }
      })
      .collect();

    if !sanitized.is_empty() && sanitized != "." && sanitized != ".." {
      return sanitized;
    }
  }

  let mut hasher = Sha256::new();
  hasher.update(url.as_bytes());
  format!("download_{}", &hex::encode(hasher.finalize())[..16])
}
