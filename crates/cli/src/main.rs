use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cipherbuild_lib::config::{Config, Overrides};
use cipherbuild_lib::platform::Arch;

mod cmd;
mod output;

use output::{OutputFormat, print_error};

/// cipherbuild - build SQLCipher against a freshly built OpenSSL
#[derive(Parser)]
#[command(name = "cipherbuild")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Fetch, build and install both libraries
  Build {
    #[command(flatten)]
    config: ConfigArgs,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Show the resolved configuration and workspace layout
  Info {
    #[command(flatten)]
    config: ConfigArgs,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },
}

/// Configuration file and the values that override it.
#[derive(Args, Debug)]
pub struct ConfigArgs {
  /// Path to the configuration file (default: ./cipherbuild.toml if present)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Workspace root directory
  #[arg(long)]
  root: Option<PathBuf>,

  /// Target architecture (x64 or x86)
  #[arg(long)]
  arch: Option<Arch>,

  /// OpenSSL release to build
  #[arg(long)]
  openssl_version: Option<String>,

  /// SQLCipher branch or tag to build
  #[arg(long)]
  sqlcipher_rev: Option<String>,
}

impl ConfigArgs {
  pub fn load(&self) -> anyhow::Result<Config> {
    let overrides = Overrides {
      root: self.root.clone(),
      arch: self.arch,
      openssl_version: self.openssl_version.clone(),
      sqlcipher_rev: self.sqlcipher_rev.clone(),
    };
    Ok(Config::load(self.config.as_deref(), &overrides)?)
  }
}

fn main() {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Build { config, output } => cmd::cmd_build(&config, output),
    Commands::Info { config, output } => cmd::cmd_info(&config, output),
  };

  if let Err(err) = result {
    print_error(&format!("error: {}", err));
    std::process::exit(1);
  }
}
