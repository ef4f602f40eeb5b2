pub mod arch;
pub mod shell;

pub use arch::{Arch, UnknownArch};
