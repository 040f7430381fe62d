//! The evaluator seam.
//!
//! Parsing and general command dispatch live outside this crate; the core
//! reaches them only through [`Evaluator`].

#![allow(missing_docs)]

use std::path::Path;

use bitflags::bitflags;
use smol_str::SmolStr;

use crate::error::RuntimeError;
use crate::interp::Interp;
use crate::outcome::Outcome;

bitflags! {
    /// Substitutions performed by [`Evaluator::substitute`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SubstFlags: u8 {
        const BACKSLASHES = 1;
        const COMMANDS = 1 << 1;
        const VARIABLES = 1 << 2;
    }
}

impl Default for SubstFlags {
    fn default() -> Self {
        Self::all()
    }
}

pub trait Evaluator: Send + Sync {
    /// Evaluate `script` in the current frame of `interp`.
    fn eval_script(&self, interp: &Interp, script: &str) -> Outcome;

    /// Invoke one already split command.
    fn invoke(&self, interp: &Interp, words: &[SmolStr]) -> Outcome;

    /// Perform the substitutions selected by `flags` on `text`.
    fn substitute(&self, interp: &Interp, text: &str, flags: SubstFlags) -> Outcome;

    fn eval_file(&self, interp: &Interp, path: &Path) -> Outcome {
        match std::fs::read_to_string(path) {
            Ok(script) => self.eval_script(interp, &script),
            Err(err) => RuntimeError::ReadFile {
                path: SmolStr::new(path.display().to_string()),
                reason: SmolStr::new(err.to_string()),
            }
            .into(),
        }
    }
}
