//! Breakpoints, watchpoints and the debugger state machine.

#![allow(missing_docs)]

mod breakpoints;
mod control;
mod hook;
mod types;

pub use breakpoints::BreakpointRegistry;
pub use control::{Debugger, DebuggerStatus};
pub use hook::{DebugHook, InteractiveLoop, NoopDebugHook, ParkingLoop, Trigger};
pub use types::{
    BreakContext, BreakpointKind, EntityId, EntityKind, HeaderFlags, RunState, ScriptLocation,
};
