use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use cipherbuild_lib::build::configure_target;
use cipherbuild_lib::config::Config;
use cipherbuild_lib::workspace::Layout;

use crate::ConfigArgs;
use crate::output::{OutputFormat, print_info, print_json, print_stat};

#[derive(Serialize)]
struct InfoOutput<'a> {
  version: &'static str,
  config: &'a Config,
  layout: &'a Layout,
}

/// Print the resolved configuration and where everything will be placed.
///
/// Runs no external tools.
pub fn cmd_info(args: &ConfigArgs, output: OutputFormat) -> Result<()> {
  let config = args.load()?;
  let layout = Layout::new(&config);
  debug!(root = %layout.root.display(), bin = %layout.bin.display(), "resolved layout");

  if output.is_json() {
    return print_json(&InfoOutput {
      version: env!("CARGO_PKG_VERSION"),
      config: &config,
      layout: &layout,
    });
  }

  print_info(&format!("cipherbuild v{}", env!("CARGO_PKG_VERSION")));
  println!();
  print_stat("Architecture", config.arch.as_str());
  print_stat("Configure target", configure_target(config.arch));
  print_stat("OpenSSL", &config.openssl.version);
  print_stat("OpenSSL archive", &config.openssl.archive_url());
  print_stat("SQLCipher", &format!("{} @ {}", config.sqlcipher.url, config.sqlcipher.rev));
  println!();
  print_stat("Root", &layout.root.display().to_string());
  print_stat("Archive", &layout.archive.display().to_string());
  print_stat("OpenSSL source", &layout.openssl_src.display().to_string());
  print_stat("OpenSSL prefix", &layout.openssl_prefix.display().to_string());
  print_stat("SQLCipher source", &layout.sqlcipher_src.display().to_string());
  print_stat("Output", &layout.bin.display().to_string());

  if !config.requires.is_empty() {
    println!();
    println!("Required tools:");
    for requirement in &config.requires {
      print_stat(&requirement.tool, &requirement.package);
    }
  }

  Ok(())
}
