//! The `debug` command and its sub-command dispatch.

use std::sync::Arc;

use smol_str::SmolStr;
use tracing::trace;

use skein_runtime::{Interp, InterpRegistry, Outcome, RuntimeError};

use crate::options::choice_list;

/// Sub-command names, in the order they are listed in errors.
pub const SUBCOMMANDS: [&str; 34] = [
    "break",
    "breakpoints",
    "callback",
    "complaint",
    "enable",
    "eval",
    "execute",
    "function",
    "icommand",
    "interactive",
    "invoke",
    "iqueue",
    "iresult",
    "oncancel",
    "onerror",
    "onexecute",
    "onexit",
    "onreturn",
    "ontest",
    "ontoken",
    "operator",
    "procedure",
    "resume",
    "run",
    "secureeval",
    "status",
    "step",
    "steps",
    "subst",
    "suspend",
    "test",
    "token",
    "types",
    "watch",
];

/// The `debug` command.
///
/// Holds the interpreter registry so that `secureeval` and `break
/// -interpreter` can find child interpreters of the caller.
#[derive(Clone)]
pub struct DebugCommand {
    pub(crate) registry: Arc<InterpRegistry>,
}

impl DebugCommand {
    /// Create the command for interpreters managed by `registry`.
    #[must_use]
    pub fn new(registry: Arc<InterpRegistry>) -> Self {
        Self { registry }
    }

    /// Run `debug option ?arg ...?`; `words[0]` is the command name.
    pub fn execute(&self, interp: &Interp, words: &[SmolStr]) -> Outcome {
        let Some(option) = words.get(1) else {
            return RuntimeError::usage("debug option ?arg ...?").into();
        };
        let args = &words[2..];
        trace!(interp = %interp.name(), option = %option, args = args.len(), "debug command");
        self.dispatch(interp, option, args, words).into()
    }

    fn dispatch(
        &self,
        interp: &Interp,
        option: &SmolStr,
        args: &[SmolStr],
        words: &[SmolStr],
    ) -> Result<Outcome, RuntimeError> {
        match option.as_str() {
            "break" => self.handle_break(interp, args, words),
            "breakpoints" => self.handle_breakpoints(interp, args),
            "callback" => self.handle_callback(interp, args),
            "complaint" => self.handle_complaint(interp, args),
            "enable" => self.handle_enable(interp, args),
            "eval" => self.handle_eval(interp, args),
            "execute" | "function" | "operator" | "procedure" => {
                self.handle_entity(interp, option, args)
            }
            "icommand" => self.handle_icommand(interp, args),
            "interactive" => self.handle_interactive(interp, args),
            "invoke" => self.handle_invoke(interp, args),
            "iqueue" => self.handle_iqueue(interp, args),
            "iresult" => self.handle_iresult(interp, args),
            "oncancel" | "onerror" | "onexecute" | "onexit" | "onreturn" | "ontest"
            | "ontoken" => self.handle_break_on(interp, option, args),
            "resume" => self.handle_resume(interp, args),
            "run" => self.handle_run(interp, args),
            "secureeval" => self.handle_secureeval(interp, args),
            "status" => self.handle_status(interp, args),
            "step" => self.handle_step(interp, args),
            "steps" => self.handle_steps(interp, args),
            "subst" => self.handle_subst(interp, args),
            "suspend" => self.handle_suspend(interp, args),
            "test" => self.handle_test(interp, args),
            "token" => self.handle_token(interp, args),
            "types" => self.handle_types(interp, args),
            "watch" => self.handle_watch(interp, args),
            _ => Err(RuntimeError::BadOption {
                option: option.clone(),
                expected: SmolStr::new(choice_list(&SUBCOMMANDS)),
            }),
        }
    }
}
