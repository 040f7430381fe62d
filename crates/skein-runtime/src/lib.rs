//! `skein-runtime` - execution control core of the skein scripting runtime.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Interpreter configuration.
pub mod config;
/// Breakpoints, watchpoints and the debugger state machine.
pub mod debug;
/// Runtime errors.
pub mod error;
/// The evaluator seam.
pub mod eval;
/// Typed flag set parsing and formatting.
pub mod flags;
/// Call frames and the call-frame stack.
pub mod frame;
/// Word-oriented evaluator for tests and embedding experiments.
pub mod harness;
/// Interactive host notifications.
pub mod host;
/// Interpreter handle.
pub mod interp;
/// Evaluation outcomes.
pub mod outcome;
/// Interpreter tree.
pub mod registry;
/// Scoped-release guards.
pub mod scope;
/// Secure evaluation in a child interpreter.
pub mod secure;
/// Variables and watchpoint flags.
pub mod var;

pub use config::{DebuggerConfig, InterpConfig};
pub use error::RuntimeError;
pub use interp::{EngineFlags, Interp, InterpId};
pub use outcome::{Outcome, ReturnCode};
pub use registry::InterpRegistry;
