//! CLI integration tests.
//!
//! External tools are replaced by `/bin/sh` scripts, so these only run on Unix.

#![cfg(unix)]

mod build_tests;
mod common;
