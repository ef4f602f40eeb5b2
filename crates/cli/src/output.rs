//! Terminal output for the build summary and `info`.
//!
//! Status lines carry a symbol whose colour depends on the outcome. Problems
//! go to stderr, everything else to stdout.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
  Success,
  Error,
  Warning,
  Info,
}

impl Status {
  fn symbol(self) -> &'static str {
    match self {
      Status::Success => "✓",
      Status::Error => "✗",
      Status::Warning => "⚠",
      Status::Info => "•",
    }
  }

  /// Problems go to stderr and colour the whole message, not only the symbol.
  fn is_problem(self) -> bool {
    matches!(self, Status::Error | Status::Warning)
  }

  fn stream(self) -> Stream {
    if self.is_problem() { Stream::Stderr } else { Stream::Stdout }
  }
}

fn status_line(status: Status, message: &str) -> String {
  let stream = status.stream();
  let paint = |s: &str| -> String {
    match status {
      Status::Success => s.if_supports_color(stream, |s| s.green()).to_string(),
      Status::Error => s.if_supports_color(stream, |s| s.red()).to_string(),
      Status::Warning => s.if_supports_color(stream, |s| s.yellow()).to_string(),
      Status::Info => s.if_supports_color(stream, |s| s.blue()).to_string(),
    }
  };
  let message = if status.is_problem() {
    paint(message)
  } else {
    message.to_string()
  };
  format!("{} {}", paint(status.symbol()), message)
}

fn print_status(status: Status, message: &str) {
  let line = status_line(status, message);
  if status.is_problem() {
    eprintln!("{}", line);
  } else {
    println!("{}", line);
  }
}

pub fn print_success(message: &str) {
  print_status(Status::Success, message);
}

pub fn print_error(message: &str) {
  print_status(Status::Error, message);
}

pub fn print_warning(message: &str) {
  print_status(Status::Warning, message);
}

pub fn print_info(message: &str) {
  print_status(Status::Info, message);
}

/// An indented `label: value` line under a status line.
pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

/// Artifact size in binary units, one decimal above bytes.
pub fn format_bytes(bytes: u64) -> String {
  const UNITS: [&str; 3] = ["KB", "MB", "GB"];

  if bytes < 1024 {
    return format!("{} B", bytes);
  }
  let mut size = bytes as f64 / 1024.0;
  let mut unit = UNITS[0];
  for &next in &UNITS[1..] {
    if size < 1024.0 {
      break;
    }
    size /= 1024.0;
    unit = next;
  }
  format!("{:.1} {}", size, unit)
}

/// Elapsed time at millisecond precision, e.g. `2m 5s 120ms`.
pub fn format_elapsed(duration: Duration) -> String {
  let millis = Duration::from_millis(duration.as_millis() as u64);
  if millis.is_zero() {
    return "0ms".to_string();
  }
  humantime::format_duration(millis).to_string()
}
