//! Debug hook trait and interactive loop capability.

#![allow(missing_docs)]

use smol_str::SmolStr;

use crate::interp::Interp;
use crate::outcome::{Outcome, ReturnCode};

use super::{BreakContext, EntityId, ScriptLocation};

/// A point where evaluation may be intercepted.
#[derive(Debug, Clone, Copy)]
pub enum Trigger<'a> {
    /// An entity is about to run.
    Execute {
        entity: &'a EntityId,
        arguments: &'a [SmolStr],
    },
    Return {
        name: &'a str,
    },
    Error {
        name: &'a str,
    },
    Exit,
    Test {
        name: &'a str,
    },
    Cancel,
    Token {
        location: &'a ScriptLocation,
    },
    /// One evaluated unit, consulted for single stepping.
    Step {
        name: &'a str,
    },
}

/// Hooks called by the evaluator at its trigger points.
///
/// Each call receives the code that is current at the trigger point and
/// returns the code evaluation should continue with.
pub trait DebugHook {
    fn on_trigger(&mut self, trigger: Trigger<'_>, previous: ReturnCode) -> ReturnCode;

    fn on_execute(
        &mut self,
        entity: &EntityId,
        arguments: &[SmolStr],
        previous: ReturnCode,
    ) -> ReturnCode {
        self.on_trigger(Trigger::Execute { entity, arguments }, previous)
    }

    fn on_return(&mut self, name: &str, previous: ReturnCode) -> ReturnCode {
        self.on_trigger(Trigger::Return { name }, previous)
    }

    fn on_error(&mut self, name: &str, previous: ReturnCode) -> ReturnCode {
        self.on_trigger(Trigger::Error { name }, previous)
    }

    fn on_exit(&mut self, previous: ReturnCode) -> ReturnCode {
        self.on_trigger(Trigger::Exit, previous)
    }

    fn on_test(&mut self, name: &str, previous: ReturnCode) -> ReturnCode {
        self.on_trigger(Trigger::Test { name }, previous)
    }

    fn on_cancel(&mut self, previous: ReturnCode) -> ReturnCode {
        self.on_trigger(Trigger::Cancel, previous)
    }

    fn on_token(&mut self, location: &ScriptLocation, previous: ReturnCode) -> ReturnCode {
        self.on_trigger(Trigger::Token { location }, previous)
    }

    fn on_step(&mut self, name: &str, previous: ReturnCode) -> ReturnCode {
        self.on_trigger(Trigger::Step { name }, previous)
    }
}

/// No-op debug hook.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDebugHook;

impl DebugHook for NoopDebugHook {
    fn on_trigger(&mut self, _trigger: Trigger<'_>, previous: ReturnCode) -> ReturnCode {
        previous
    }
}

/// The nested interactive loop entered when a breakpoint fires.
///
/// Runs synchronously on the triggering thread and returns when the user (or
/// another thread) lets evaluation continue.
pub trait InteractiveLoop: Send + Sync {
    fn run(&self, interp: &Interp, context: &BreakContext) -> Outcome;
}

/// Interactive loop that evaluates queued commands and otherwise parks the
/// calling thread until the break ends.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParkingLoop;

impl InteractiveLoop for ParkingLoop {
    fn run(&self, interp: &Interp, _context: &BreakContext) -> Outcome {
        let Some(debugger) = interp.debugger() else {
            return Outcome::empty();
        };
        while let Some(command) = debugger.wait_for_command() {
            let outcome = interp.eval_script(&command);
            debugger.set_command(Some(command));
            debugger.set_result(Some(SmolStr::new(&outcome.result)));
        }
        // Results of queued commands are only visible through `debug iresult`.
        Outcome::empty()
    }
}
