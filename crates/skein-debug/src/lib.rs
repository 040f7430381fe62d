//! `skein-debug` - the `debug` command for skein interpreters.
//!
//! Every sub-command is a thin layer over `skein-runtime`: argument and
//! option parsing happen here, state changes go through the interpreter and
//! its debugger.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod command;
mod handlers;
mod options;

pub use command::{DebugCommand, SUBCOMMANDS};
