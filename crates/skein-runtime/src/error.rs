//! Runtime errors.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

/// Errors raised by the execution control core.
///
/// The `Display` text of every variant is the user-facing result string a
/// command reports, so messages follow the scripting language's conventions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Wrong argument count; carries the usage text.
    #[error("wrong # args: should be \"{0}\"")]
    WrongArgs(SmolStr),

    /// Unknown option.
    #[error("bad option \"{option}\": must be {expected}")]
    BadOption { option: SmolStr, expected: SmolStr },

    /// Option given without its required value.
    #[error("value for \"{0}\" missing")]
    MissingOptionValue(SmolStr),

    #[error("expected boolean value but got \"{0}\"")]
    InvalidBoolean(SmolStr),

    #[error("expected integer but got \"{0}\"")]
    InvalidInteger(SmolStr),

    /// A flag name that is not part of the closed flag set.
    #[error("unknown {kind} flag \"{name}\"")]
    UnknownFlag { kind: &'static str, name: SmolStr },

    #[error("debugger not available")]
    DebuggerUnavailable,

    #[error("debugger not enabled")]
    DebuggerDisabled,

    #[error("debugger is already suspended")]
    AlreadySuspended,

    #[error("debugger is not suspended")]
    NotSuspended,

    /// Stepping requested outside of interactive mode.
    #[error("{0}")]
    NotInteractive(SmolStr),

    #[error("could not lock interpreter")]
    LockUnavailable,

    #[error("could not find interpreter \"{0}\"")]
    InterpreterNotFound(SmolStr),

    #[error("bad level \"{0}\"")]
    InvalidFrame(SmolStr),

    #[error("can't read \"{0}\": no such variable")]
    NoSuchVariable(SmolStr),

    #[error("{kind} \"{name}\" not found")]
    EntityNotFound { kind: &'static str, name: SmolStr },

    #[error("invalid pattern \"{0}\"")]
    InvalidPattern(SmolStr),

    /// Malformed script text.
    #[error("{0}")]
    Syntax(SmolStr),

    #[error("invalid command name \"{0}\"")]
    InvalidCommand(SmolStr),

    /// Pop attempted with only the global frame left.
    #[error("call frame stack underflow")]
    StackUnderflow,

    #[error("call frame {0} is not on the stack")]
    FrameNotOnStack(u32),

    /// Mark/unmark imbalance on a call frame.
    #[error("call frame {frame} mark mismatch: {reason}")]
    MarkMismatch { frame: u32, reason: &'static str },

    #[error("variable link cycle detected at \"{0}\"")]
    LinkCycle(SmolStr),

    #[error("could not read file \"{path}\": {reason}")]
    ReadFile { path: SmolStr, reason: SmolStr },

    #[error("invalid configuration: {0}")]
    InvalidConfig(SmolStr),
}

impl RuntimeError {
    /// Build a usage error from the usage text.
    pub fn usage(text: impl Into<SmolStr>) -> Self {
        Self::WrongArgs(text.into())
    }

    /// Returns true for errors that indicate corrupted interpreter state.
    #[must_use]
    pub fn is_consistency(&self) -> bool {
        matches!(
            self,
            Self::StackUnderflow
                | Self::FrameNotOnStack(_)
                | Self::MarkMismatch { .. }
                | Self::LinkCycle(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_message_matches_convention() {
        let err = RuntimeError::usage("debug step ?enabled?");
        assert_eq!(
            err.to_string(),
            "wrong # args: should be \"debug step ?enabled?\""
        );
    }

    #[test]
    fn consistency_errors_are_classified() {
        assert!(RuntimeError::StackUnderflow.is_consistency());
        assert!(!RuntimeError::LockUnavailable.is_consistency());
    }
}
