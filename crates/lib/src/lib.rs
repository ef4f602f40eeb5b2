//! cipherbuild-lib: build orchestration for SQLCipher against OpenSSL
//!
//! This crate provides the stages of the build and the pipeline running them:
//! - `toolchain`: locate the compiler suite and capture its environment
//! - `install`: make sure required command-line tools are available
//! - `source`: download and extract OpenSSL, clone SQLCipher
//! - `build`: build OpenSSL into a prefix, then SQLCipher against it
//! - `report`: list the produced artifacts
//! - `pipeline`: run all of the above in order
//!
//! Every stage takes the environment for external tools as an explicit
//! [`env::Env`] value; the process environment is only read once.

pub mod build;
pub mod config;
pub mod consts;
pub mod env;
pub mod execute;
pub mod install;
pub mod pipeline;
pub mod platform;
pub mod report;
pub mod source;
pub mod toolchain;
pub mod util;
pub mod workspace;
