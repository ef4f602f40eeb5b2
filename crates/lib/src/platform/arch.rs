use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Target CPU architectures a build can be produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Arch {
  #[default]
  X64,
  X86,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported architecture '{0}' (expected one of: x64, x86)")]
pub struct UnknownArch(pub String);

impl Arch {
  pub const ALL: [Arch; 2] = [Arch::X64, Arch::X86];

  /// Returns the token used on the command line and in config files
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X64 => "x64",
      Self::X86 => "x86",
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Arch {
  type Err = UnknownArch;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "x64" => Ok(Self::X64),
      "x86" => Ok(Self::X86),
      other => Err(UnknownArch(other.to_string())),
    }
  }
}

impl TryFrom<String> for Arch {
  type Error = UnknownArch;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<Arch> for String {
  fn from(arch: Arch) -> Self {
    arch.as_str().to_string()
  }
}
