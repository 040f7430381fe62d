//! Secure evaluation in a child interpreter.

#![allow(missing_docs)]

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::RuntimeError;
use crate::frame::{CallFrame, FrameFlags};
use crate::interp::{EngineFlags, Interp};
use crate::outcome::Outcome;
use crate::registry::InterpRegistry;
use crate::scope::Cleanup;

/// What to evaluate in the child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecureSource {
    Script(String),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecureEval {
    /// Child path, relative to the calling interpreter.
    pub path: String,
    pub source: SecureSource,
    /// Treat a safe child as trusted for this evaluation.
    pub trusted: bool,
    /// Leave the child's event processing enabled.
    pub allow_events: bool,
}

/// Evaluate `request.source` in the child named by `request.path`.
///
/// The child's evaluation lock is only try-locked. Event processing, trust
/// and the thread's hidden-command override are each restored by their own
/// guard, in reverse order, whatever the evaluation returns. A failing
/// restore is complained about and the remaining steps still run.
pub fn secure_eval(caller: &Interp, registry: &InterpRegistry, request: &SecureEval) -> Outcome {
    let path = request.path.as_str();
    let child = match registry.resolve_child(caller, path) {
        Ok(child) => child,
        Err(err) => return err.into(),
    };

    let _frame = caller.push_frame(CallFrame::tracking(
        "secureeval",
        FrameFlags::EVALUATE | FrameFlags::DEBUGGER | FrameFlags::RESTRICTED,
    ));

    let Some(lock) = child.try_eval_lock() else {
        return RuntimeError::LockUnavailable.into();
    };

    let events = if request.allow_events {
        Cleanup::noop(caller, "restore events")
    } else {
        let previous = child.set_events_enabled(false);
        Cleanup::new(caller, "restore events", {
            let child = &child;
            move || {
                child.set_events_enabled(previous);
                Ok(())
            }
        })
    };

    let trusted = request.trusted && child.is_safe();
    if request.trusted && !trusted {
        warn!(child = %child.name(), "trusted evaluation requested for an unsafe interpreter");
    }
    let trust = if trusted {
        let previous = child.set_trusted(true);
        Cleanup::new(caller, "restore trust", {
            let child = &child;
            move || {
                child.set_trusted(previous);
                Ok(())
            }
        })
    } else {
        Cleanup::noop(caller, "restore trust")
    };

    let hidden = if trusted {
        let previous = child.thread_flags();
        child.set_thread_flags(previous | EngineFlags::IGNORE_HIDDEN);
        Cleanup::new(caller, "restore engine flags", {
            let child = &child;
            move || {
                child.set_thread_flags(previous);
                Ok(())
            }
        })
    } else {
        Cleanup::noop(caller, "restore engine flags")
    };

    debug!(child = %child.name(), trusted, allow_events = request.allow_events, "secure eval");
    let mut outcome = match &request.source {
        SecureSource::Script(script) => child.eval_script(script),
        SecureSource::File(file) => child.eval_file(file),
    };

    drop(hidden);
    drop(trust);
    drop(events);
    drop(lock);

    if outcome.is_error() {
        let line = outcome.line();
        outcome.add_error_trace(format!(
            "(in debug secureeval \"{path}\" script line {line})"
        ));
    }
    outcome
}
