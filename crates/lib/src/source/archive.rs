//! Release archive download and extraction.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

use flate2::read::GzDecoder;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::OpensslConfig;
use crate::execute::download;
use crate::source::{FetchError, FetchOutcome};
use crate::util::hash::hash_file;
use crate::workspace::Layout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArchiveOutcome {
  pub download: FetchOutcome,
  pub extract: FetchOutcome,
}

/// Make sure the archive is downloaded and its source tree extracted.
pub async fn fetch_archive(config: &OpensslConfig, layout: &Layout) -> Result<ArchiveOutcome, FetchError> {
  let url = config.archive_url();

  let download_outcome = if cached_archive_is_usable(&layout.archive, config.sha256.as_deref()).await? {
    info!(path = %layout.archive.display(), "using cached archive");
    FetchOutcome::Cached
  } else {
    download(&url, &layout.archive, config.sha256.as_deref())
      .await
      .map_err(|source| FetchError::Download {
        resource: url.clone(),
        source,
      })?;
    FetchOutcome::Fetched
  };

  let extract_outcome = if layout.openssl_src.is_dir() {
    info!(path = %layout.openssl_src.display(), "source tree already extracted");
    FetchOutcome::Cached
  } else {
    let archive = layout.archive.clone();
    let intermediate = layout.archive_tar.clone();
    let dest = layout.openssl_src.clone();
    tokio::task::spawn_blocking(move || extract_archive(&archive, &intermediate, &dest)).await??;
    FetchOutcome::Fetched
  };

  Ok(ArchiveOutcome {
    download: download_outcome,
    extract: extract_outcome,
  })
}

/// An archive on disk is reused unless a configured checksum says it is corrupt,
/// in which case it is removed so it gets downloaded again.
async fn cached_archive_is_usable(archive: &Path, expected_sha256: Option<&str>) -> Result<bool, FetchError> {
  if !archive.is_file() {
    return Ok(false);
  }
  let Some(expected) = expected_sha256 else {
    return Ok(true);
  };

  let path = archive.to_path_buf();
  let actual = tokio::task::spawn_blocking(move || hash_file(&path)).await??;
  if actual.eq_ignore_ascii_case(expected) {
    return Ok(true);
  }

  warn!(
    path = %archive.display(),
    expected = %expected,
    actual = %actual,
    "cached archive hash mismatch, downloading again"
  );
  tokio::fs::remove_file(archive).await?;
  Ok(false)
}

/// Extract a `.tar.gz` so that its top-level directory ends up at `dest`.
///
/// Extraction is two-staged: the gzip layer is decompressed to
/// `intermediate`, the tar is unpacked into a staging directory next to
/// `dest`, and the expected directory is then moved into place. The
/// intermediate tar and the staging directory are removed whether or not
/// extraction succeeds, so a failed extraction leaves no `dest` behind.
pub fn extract_archive(archive: &Path, intermediate: &Path, dest: &Path) -> Result<(), FetchError> {
  let (Some(parent), Some(expected)) = (dest.parent(), dest.file_name()) else {
    return Err(FetchError::UnexpectedLayout {
      archive: archive.to_path_buf(),
      expected: dest.display().to_string(),
    });
  };
  let expected = expected.to_string_lossy().into_owned();
  let staging = parent.join(format!(".extract-{}", expected));

  info!(archive = %archive.display(), dest = %dest.display(), "extracting archive");

  if staging.exists() {
    fs::remove_dir_all(&staging)?;
  }

  let unpacked = decompress(archive, intermediate).and_then(|()| unpack(intermediate, &staging));

  if intermediate.exists() {
    debug!(path = %intermediate.display(), "removing intermediate tar");
    fs::remove_file(intermediate)?;
  }

  let result = unpacked
    .map_err(|source| FetchError::Extract {
      archive: archive.to_path_buf(),
      source,
    })
    .and_then(|()| {
      let top = staging.join(&expected);
      if !top.is_dir() {
        return Err(FetchError::UnexpectedLayout {
          archive: archive.to_path_buf(),
          expected: expected.clone(),
        });
      }
      fs::rename(&top, dest)?;
      Ok(())
    });

  if staging.exists() {
    fs::remove_dir_all(&staging)?;
  }

  result
}

fn decompress(archive: &Path, intermediate: &Path) -> io::Result<()> {
  let mut decoder = GzDecoder::new(BufReader::new(File::open(archive)?));
  let mut out = BufWriter::new(File::create(intermediate)?);
  let bytes = io::copy(&mut decoder, &mut out)?;
  debug!(path = %intermediate.display(), bytes, "decompressed archive");
  Ok(())
}

fn unpack(tar_path: &Path, into: &Path) -> io::Result<()> {
  fs::create_dir_all(into)?;
  tar::Archive::new(BufReader::new(File::open(tar_path)?)).unpack(into)
}
