//! External process and download execution.
//!
//! Everything that leaves the process goes through here: spawning tools with
//! an explicit environment and downloading files over HTTPS.

pub mod cmd;
pub mod fetch;
pub mod types;

pub use cmd::{execute_cmd, execute_command};
pub use fetch::{download, url_to_filename};
pub use types::ExecuteError;
