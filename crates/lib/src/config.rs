//! Build configuration.
//!
//! Configuration is read from an optional TOML file, then the
//! `CIPHERBUILD_ROOT` environment variable, then explicit overrides (the CLI
//! flags). Every field has a default, so an empty or absent file describes a
//! complete build. Once loaded the configuration is never mutated.
//!
//! ```toml
//! root = "build"
//! arch = "x64"
//!
//! [openssl]
//! version = "3.3.2"
//!
//! [sqlcipher]
//! rev = "v4.6.1"
//!
//! [[requires]]
//! tool = "perl"
//! package = "strawberryperl"
//! hints = ['C:\Strawberry\perl\bin']
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::{
  CONFIG_FILE_NAME, DEFAULT_LOCATOR, DEFAULT_OPENSSL_URL, DEFAULT_OPENSSL_VERSION, DEFAULT_SQLCIPHER_MAKEFILE,
  DEFAULT_SQLCIPHER_REV, DEFAULT_SQLCIPHER_URL, DEFAULT_VERSION_RANGE, ROOT_ENV_VAR,
};
use crate::execute::url_to_filename;
use crate::platform::Arch;
use crate::workspace::is_supported_archive;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid config file '{path}': {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("invalid config: {0}")]
  Invalid(String),

  #[error("failed to resolve workspace root '{path}': {source}")]
  Root {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Complete, immutable description of one build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  /// Workspace root all sources and outputs are placed under.
  pub root: PathBuf,
  pub arch: Arch,
  pub openssl: OpensslConfig,
  pub sqlcipher: SqlcipherConfig,
  pub toolchain: ToolchainConfig,
  pub tools: ToolsConfig,
  /// Command-line tools that must be available before building.
  pub requires: Vec<Requirement>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      root: PathBuf::from("build"),
      arch: Arch::default(),
      openssl: OpensslConfig::default(),
      sqlcipher: SqlcipherConfig::default(),
      toolchain: ToolchainConfig::default(),
      tools: ToolsConfig::default(),
      requires: default_requirements(),
    }
  }
}

/// The cryptography dependency, fetched as a release archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpensslConfig {
  pub version: String,
  /// Download URL; `{version}` is replaced with [`OpensslConfig::version`].
  pub url: String,
  /// Expected SHA256 of the archive. Unchecked when absent.
  pub sha256: Option<String>,
  /// Extra arguments passed to `Configure` after the target and prefix.
  pub configure_options: Vec<String>,
}

impl Default for OpensslConfig {
  fn default() -> Self {
    Self {
      version: DEFAULT_OPENSSL_VERSION.to_string(),
      url: DEFAULT_OPENSSL_URL.to_string(),
      sha256: None,
      configure_options: vec!["no-shared".to_string()],
    }
  }
}

impl OpensslConfig {
  pub fn archive_url(&self) -> String {
    self.url.replace("{version}", &self.version)
  }
}

/// The target library, fetched from git.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SqlcipherConfig {
  pub url: String,
  /// Branch or tag to check out.
  pub rev: String,
  /// Makefile inside the source tree, relative to it.
  pub makefile: String,
  /// Make targets; empty builds the makefile's default target.
  pub targets: Vec<String>,
  /// Value of the compiler-flag variable (`CL`) during the build.
  pub cflags: String,
}

impl Default for SqlcipherConfig {
  fn default() -> Self {
    Self {
      url: DEFAULT_SQLCIPHER_URL.to_string(),
      rev: DEFAULT_SQLCIPHER_REV.to_string(),
      makefile: DEFAULT_SQLCIPHER_MAKEFILE.to_string(),
      targets: Vec::new(),
      cflags: "/MP".to_string(),
    }
  }
}

/// How the compiler environment is located.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainConfig {
  /// When false the ambient environment is assumed to be initialised already.
  pub enabled: bool,
  /// Installation locator executable (`vswhere`).
  pub locator: PathBuf,
  /// Accepted toolchain version range, in the locator's syntax.
  pub version_range: String,
}

impl Default for ToolchainConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      locator: PathBuf::from(DEFAULT_LOCATOR),
      version_range: DEFAULT_VERSION_RANGE.to_string(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
  pub perl: String,
  pub make: String,
  pub package_manager: PackageManager,
}

impl Default for ToolsConfig {
  fn default() -> Self {
    Self {
      perl: "perl".to_string(),
      make: "nmake".to_string(),
      package_manager: PackageManager::default(),
    }
  }
}

/// Package manager used to install missing tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageManager {
  pub program: String,
  /// Arguments; `{package}` is replaced with the package name.
  pub args: Vec<String>,
}

impl Default for PackageManager {
  fn default() -> Self {
    Self {
      program: "choco".to_string(),
      args: ["install", "{package}", "-y", "--no-progress"]
        .into_iter()
        .map(String::from)
        .collect(),
    }
  }
}

impl PackageManager {
  pub fn install_args(&self, package: &str) -> Vec<String> {
    self.args.iter().map(|a| a.replace("{package}", package)).collect()
  }
}

/// A tool that must resolve on `PATH`, and the package providing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Requirement {
  pub tool: String,
  pub package: String,
  /// Directories the package installs into, searched after installation.
  #[serde(default)]
  pub hints: Vec<PathBuf>,
}

fn default_requirements() -> Vec<Requirement> {
  vec![
    Requirement {
      tool: "perl".to_string(),
      package: "strawberryperl".to_string(),
      hints: vec![PathBuf::from(r"C:\Strawberry\perl\bin")],
    },
    Requirement {
      tool: "nasm".to_string(),
      package: "nasm".to_string(),
      hints: vec![PathBuf::from(r"C:\Program Files\NASM")],
    },
  ]
}

/// Values supplied on the command line; `None` keeps the configured value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
  pub root: Option<PathBuf>,
  pub arch: Option<Arch>,
  pub openssl_version: Option<String>,
  pub sqlcipher_rev: Option<String>,
}

impl Config {
  pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
    toml::from_str(content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Load the configuration.
  ///
  /// With `path` the file must exist. Without it `cipherbuild.toml` in the
  /// current directory is used when present, defaults otherwise. The
  /// workspace root is made absolute against the current directory.
  pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
    let mut config = match path {
      Some(path) => Self::read(path)?,
      None if Path::new(CONFIG_FILE_NAME).is_file() => Self::read(Path::new(CONFIG_FILE_NAME))?,
      None => {
        debug!("no config file, using defaults");
        Self::default()
      }
    };

    if let Some(root) = std::env::var_os(ROOT_ENV_VAR).filter(|v| !v.is_empty()) {
      config.root = PathBuf::from(root);
    }
    config.apply(overrides);
    config.validate()?;

    config.root = std::path::absolute(&config.root).map_err(|source| ConfigError::Root {
      path: config.root.clone(),
      source,
    })?;

    Ok(config)
  }

  fn read(path: &Path) -> Result<Self, ConfigError> {
    debug!(path = %path.display(), "reading config file");
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_toml_str(&content, path)
  }

  pub fn apply(&mut self, overrides: &Overrides) {
    if let Some(root) = &overrides.root {
      self.root = root.clone();
    }
    if let Some(arch) = overrides.arch {
      self.arch = arch;
    }
    if let Some(version) = &overrides.openssl_version {
      self.openssl.version = version.clone();
    }
    if let Some(rev) = &overrides.sqlcipher_rev {
      self.sqlcipher.rev = rev.clone();
    }
  }

  /// Reject values that would only fail much later, after tools have run.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.root.as_os_str().is_empty() {
      return Err(ConfigError::Invalid("root must not be empty".to_string()));
    }
    if self.openssl.version.trim().is_empty() {
      return Err(ConfigError::Invalid("openssl.version must not be empty".to_string()));
    }
    if self.sqlcipher.rev.trim().is_empty() {
      return Err(ConfigError::Invalid("sqlcipher.rev must not be empty".to_string()));
    }
    if self.openssl.version.contains(['/', '\\']) {
      return Err(ConfigError::Invalid(format!(
        "openssl.version '{}' must not contain path separators",
        self.openssl.version
      )));
    }
    let archive = url_to_filename(&self.openssl.archive_url());
    if !is_supported_archive(&archive) {
      return Err(ConfigError::Invalid(format!(
        "openssl.url must point to a .tar.gz or .tgz archive, got '{}'",
        archive
      )));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;
  use tempfile::TempDir;

  #[test]
  fn empty_file_yields_defaults() {
    let config = Config::from_toml_str("", Path::new("cipherbuild.toml")).unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.arch, Arch::X64);
    assert_eq!(config.requires.len(), 2);
  }

  #[test]
  fn partial_sections_keep_other_defaults() {
    let config = Config::from_toml_str(
      r#"
        arch = "x86"
        [openssl]
        version = "3.0.15"
        [tools]
        make = "jom"
      "#,
      Path::new("cipherbuild.toml"),
    )
    .unwrap();

    assert_eq!(config.arch, Arch::X86);
    assert_eq!(config.openssl.version, "3.0.15");
    assert_eq!(config.openssl.url, DEFAULT_OPENSSL_URL);
    assert_eq!(config.tools.make, "jom");
    assert_eq!(config.tools.perl, "perl");
  }

  #[test]
  fn unknown_arch_is_rejected_at_parse_time() {
    let err = Config::from_toml_str("arch = \"arm64\"", Path::new("c.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("arm64"));
  }

  #[test]
  fn unknown_keys_are_rejected() {
    let err = Config::from_toml_str("[openssl]\nverison = \"1\"", Path::new("c.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
  }

  #[test]
  fn archive_url_substitutes_version() {
    let openssl = OpensslConfig {
      version: "3.1.0".to_string(),
      ..Default::default()
    };
    assert_eq!(
      openssl.archive_url(),
      "https://www.openssl.org/source/openssl-3.1.0.tar.gz"
    );
  }

  #[test]
  fn install_args_substitute_package() {
    let pm = PackageManager::default();
    assert_eq!(pm.install_args("nasm"), vec!["install", "nasm", "-y", "--no-progress"]);
  }

  #[test]
  fn overrides_win_over_file_values() {
    let mut config = Config::default();
    config.apply(&Overrides {
      root: Some(PathBuf::from("/ws")),
      arch: Some(Arch::X86),
      openssl_version: Some("3.0.0".to_string()),
      sqlcipher_rev: Some("v4.5.0".to_string()),
    });

    assert_eq!(config.root, PathBuf::from("/ws"));
    assert_eq!(config.arch, Arch::X86);
    assert_eq!(config.openssl.version, "3.0.0");
    assert_eq!(config.sqlcipher.rev, "v4.5.0");
  }

  #[test]
  fn validate_rejects_empty_revision() {
    let mut config = Config::default();
    config.sqlcipher.rev = " ".to_string();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
  }

  #[test]
  fn validate_rejects_unsupported_archive_format() {
    let mut config = Config::default();
    config.openssl.url = "https://example.com/openssl-{version}.zip".to_string();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(ref m)) if m.contains(".zip")));
  }

  #[test]
  #[serial]
  fn load_reads_explicit_file_and_env_root() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("custom.toml");
    std::fs::write(&path, "[sqlcipher]\nrev = \"v4.5.7\"\n").unwrap();
    let root = temp.path().join("ws");

    temp_env::with_var(ROOT_ENV_VAR, Some(root.to_str().unwrap()), || {
      let config = Config::load(Some(&path), &Overrides::default()).unwrap();
      assert_eq!(config.sqlcipher.rev, "v4.5.7");
      assert_eq!(config.root, root);
    });
  }

  #[test]
  #[serial]
  fn load_cli_root_beats_env_root() {
    let temp = TempDir::new().unwrap();
    let cli_root = temp.path().join("cli");

    temp_env::with_var(ROOT_ENV_VAR, Some("/from/env"), || {
      let overrides = Overrides {
        root: Some(cli_root.clone()),
        ..Default::default()
      };
      let config = Config::load(None, &overrides).unwrap();
      assert_eq!(config.root, cli_root);
    });
  }

  #[test]
  #[serial]
  fn load_missing_explicit_file_is_error() {
    let result = Config::load(Some(Path::new("/nonexistent/cipherbuild.toml")), &Overrides::default());
    assert!(matches!(result, Err(ConfigError::Read { .. })));
  }
}
