//! Scoped-release guards.
//!
//! Every transient frame push and every temporary state change is undone by
//! a guard's `Drop`, so error returns and unwinding panics restore the same
//! shape as a normal return. Undo failures are reported through the
//! interpreter's complaint channel and never replace the guarded outcome.

#![allow(missing_docs)]

use crate::error::RuntimeError;
use crate::frame::{CallFrame, FrameId};
use crate::interp::Interp;

/// Keeps a pushed frame on the stack until dropped.
#[must_use = "the frame is popped as soon as the scope is dropped"]
pub struct FrameScope<'a> {
    interp: &'a Interp,
    frame: FrameId,
}

impl<'a> FrameScope<'a> {
    pub fn push(interp: &'a Interp, frame: CallFrame) -> Self {
        let frame = interp.with_stack(|stack| stack.push(frame));
        Self { interp, frame }
    }

    #[must_use]
    pub fn frame(&self) -> FrameId {
        self.frame
    }
}

impl Drop for FrameScope<'_> {
    fn drop(&mut self) {
        let frame = self.frame;
        if let Err(err) = self.interp.with_stack(|stack| stack.pop_through(frame)) {
            self.interp.complain("pop frame", &err);
        }
    }
}

type Undo<'a> = Box<dyn FnOnce() -> Result<(), RuntimeError> + 'a>;

/// Runs one undo step when dropped.
#[must_use = "the undo step runs as soon as the guard is dropped"]
pub struct Cleanup<'a> {
    interp: &'a Interp,
    step: &'static str,
    undo: Option<Undo<'a>>,
}

impl<'a> Cleanup<'a> {
    pub fn new(
        interp: &'a Interp,
        step: &'static str,
        undo: impl FnOnce() -> Result<(), RuntimeError> + 'a,
    ) -> Self {
        Self {
            interp,
            step,
            undo: Some(Box::new(undo)),
        }
    }

    /// A guard that does nothing; keeps drop order uniform for skipped steps.
    #[must_use]
    pub fn noop(interp: &'a Interp, step: &'static str) -> Self {
        Self {
            interp,
            step,
            undo: None,
        }
    }
}

impl Drop for Cleanup<'_> {
    fn drop(&mut self) {
        if let Some(undo) = self.undo.take() {
            if let Err(err) = undo() {
                self.interp.complain(self.step, &err);
            }
        }
    }
}
