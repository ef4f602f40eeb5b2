//! Workspace directory layout.
//!
//! Every path is a pure function of the configuration, so re-running with the
//! same configuration finds the results of earlier runs in the same places.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::Config;
use crate::execute::url_to_filename;

/// Suffixes stripped from the archive file name to get its top-level directory.
const ARCHIVE_SUFFIXES: &[&str] = &[".tar.gz", ".tgz"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Layout {
  pub root: PathBuf,
  /// Downloaded OpenSSL release archive.
  pub archive: PathBuf,
  /// Intermediate uncompressed archive, present only during extraction.
  pub archive_tar: PathBuf,
  /// Extracted OpenSSL source tree.
  pub openssl_src: PathBuf,
  /// Install prefix OpenSSL's headers and libraries are written to.
  pub openssl_prefix: PathBuf,
  /// SQLCipher checkout.
  pub sqlcipher_src: PathBuf,
  /// Output directory for the final artifacts, per architecture like the prefix.
  pub bin: PathBuf,
}

impl Layout {
  pub fn new(config: &Config) -> Self {
    let root = config.root.clone();
    let archive_name = url_to_filename(&config.openssl.archive_url());
    let stem = archive_stem(&archive_name);

    Self {
      archive: root.join(&archive_name),
      archive_tar: root.join(format!("{}.tar", stem)),
      openssl_src: root.join(stem),
      openssl_prefix: root.join("install").join(config.arch.as_str()),
      sqlcipher_src: root.join("sqlcipher"),
      bin: root.join("bin").join(config.arch.as_str()),
      root,
    }
  }
}

/// Whether `name` is an archive format the source fetcher can extract.
pub fn is_supported_archive(name: &str) -> bool {
  ARCHIVE_SUFFIXES
    .iter()
    .any(|suffix| name.len() > suffix.len() && name.ends_with(suffix))
}

fn archive_stem(name: &str) -> &str {
  ARCHIVE_SUFFIXES
    .iter()
    .find_map(|suffix| name.strip_suffix(suffix))
    .unwrap_or(name)
}
